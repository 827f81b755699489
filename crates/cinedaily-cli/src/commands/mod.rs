//! Command handlers grouped by concern.

pub(crate) mod movies;
pub(crate) mod search;
pub(crate) mod session;
pub(crate) mod watchlist;
