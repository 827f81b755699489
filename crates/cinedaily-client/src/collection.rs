//! Movie lists shown by the daily and watchlist views.

use cinedaily_api_models::Movie;
use futures_util::future::try_join_all;
use tracing::{debug, warn};

use crate::backend::MovieBackend;
use crate::session::Identity;

/// Message shown when the watchlist cannot be assembled.
pub const WATCHLIST_FAILED_MESSAGE: &str = "Failed to load watchlist.";

/// Outcome of loading data for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Request outstanding.
    Loading,
    /// Data available.
    Ready(T),
    /// Loading failed; the message is user-facing.
    Failed(String),
}

impl<T> LoadState<T> {
    /// Loaded value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    /// Failure message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            Self::Loading | Self::Ready(_) => None,
        }
    }
}

/// Load today's selection.
pub async fn load_daily<B>(backend: &B) -> LoadState<Vec<Movie>>
where
    B: MovieBackend + ?Sized,
{
    match backend.daily_movies().await {
        Ok(movies) => {
            debug!(count = movies.len(), "daily selection loaded");
            LoadState::Ready(movies)
        }
        Err(err) => {
            warn!(error = %err.describe(), "daily selection unavailable");
            LoadState::Failed(format!("Error loading movies: {}", err.describe()))
        }
    }
}

/// Load a single movie for the detail view.
pub async fn load_movie<B>(backend: &B, slug: &str) -> LoadState<Movie>
where
    B: MovieBackend + ?Sized,
{
    match backend.movie_by_slug(slug).await {
        Ok(movie) => LoadState::Ready(movie),
        Err(err) => {
            warn!(slug, error = %err.describe(), "movie lookup failed");
            LoadState::Failed(format!("Error loading movie: {}", err.describe()))
        }
    }
}

/// Load every movie in the user's watchlist, in watchlist order.
///
/// All per-movie lookups run concurrently and the result is all-or-nothing:
/// one failed lookup fails the whole view.
pub async fn load_watchlist<B>(backend: &B, user: &Identity) -> LoadState<Vec<Movie>>
where
    B: MovieBackend + ?Sized,
{
    let record = match backend.user_record(user).await {
        Ok(record) => record,
        Err(err) => {
            warn!(user = %user, error = %err.describe(), "user record unavailable");
            return LoadState::Failed(WATCHLIST_FAILED_MESSAGE.to_string());
        }
    };

    if record.favorites.is_empty() {
        debug!(user = %user, "watchlist is empty");
        return LoadState::Ready(Vec::new());
    }

    let lookups = record
        .favorites
        .iter()
        .map(|slug| backend.movie_by_slug(slug));
    match try_join_all(lookups).await {
        Ok(movies) => {
            debug!(user = %user, count = movies.len(), "watchlist loaded");
            LoadState::Ready(movies)
        }
        Err(err) => {
            warn!(user = %user, error = %err.describe(), "watchlist lookup failed");
            LoadState::Failed(WATCHLIST_FAILED_MESSAGE.to_string())
        }
    }
}
