#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Client-side behaviour of the Cinedaily movie discovery app.
//!
//! Layout:
//! - `backend.rs`: the [`MovieBackend`] seam every state machine talks through
//! - `http.rs`: reqwest implementation of the backend API
//! - `config.rs`: API origin resolution, timeouts and auth navigation targets
//! - `session.rs`: one-shot session resolution and the shared session context
//! - `guard.rs`: gate for views that need a signed-in user
//! - `watchlist.rs`: per-movie watchlist toggle
//! - `search.rs`: validated, debounced search
//! - `collection.rs`: daily selection, movie detail and watchlist loading

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod search;
pub mod session;
pub mod watchlist;

#[cfg(test)]
mod test_support;

pub use backend::MovieBackend;
pub use collection::{LoadState, load_daily, load_movie, load_watchlist};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use guard::{GuardDecision, GuardPhase, RouteGuard};
pub use http::HttpBackend;
pub use search::{DebouncedSearch, QueryChange, SearchMachine, SearchState, SearchTerm};
pub use session::{Identity, Session, SessionProvider, SessionState};
pub use watchlist::{Membership, ToggleOutcome, ToggleRejection, WatchlistEntry, WatchlistToggle};
