//! Backend contract consumed by the client state machines.

use async_trait::async_trait;
use cinedaily_api_models::{ActiveIdentity, Movie, UserRecord};

use crate::error::ClientResult;
use crate::search::SearchTerm;
use crate::session::Identity;

/// Request/response exchanges the client issues against the movie backend.
///
/// [`crate::http::HttpBackend`] implements this over HTTP; tests substitute an
/// in-memory double.
#[async_trait]
pub trait MovieBackend: Send + Sync {
    /// Identity currently attached to the caller's backend session.
    async fn active_identity(&self) -> ClientResult<ActiveIdentity>;

    /// Persist the resolved identity as a user record.
    async fn save_identity(&self, identity: &Identity) -> ClientResult<()>;

    /// Today's movie selection.
    async fn daily_movies(&self) -> ClientResult<Vec<Movie>>;

    /// Catalog search for a validated term.
    async fn search_movies(&self, term: &SearchTerm) -> ClientResult<Vec<Movie>>;

    /// Single movie lookup.
    async fn movie_by_slug(&self, slug: &str) -> ClientResult<Movie>;

    /// Whether `slug` is in the user's watchlist.
    async fn watchlist_status(&self, user: &Identity, slug: &str) -> ClientResult<bool>;

    /// Add `slug` to the user's watchlist.
    async fn add_to_watchlist(&self, user: &Identity, slug: &str) -> ClientResult<()>;

    /// Remove `slug` from the user's watchlist.
    async fn remove_from_watchlist(&self, user: &Identity, slug: &str) -> ClientResult<()>;

    /// Stored user record, including watchlist favorites.
    async fn user_record(&self, user: &Identity) -> ClientResult<UserRecord>;
}
