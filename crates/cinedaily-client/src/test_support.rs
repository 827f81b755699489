//! In-memory backend double used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cinedaily_api_models::{ActiveIdentity, Movie, UserRecord};
use url::Url;

use crate::backend::MovieBackend;
use crate::error::{ClientError, ClientResult};
use crate::search::SearchTerm;
use crate::session::Identity;

pub(crate) fn url(input: &str) -> Url {
    input.parse().expect("valid URL")
}

pub(crate) fn movie(slug: &str) -> Movie {
    Movie {
        id: 1,
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        year: "1999".to_string(),
        overview: String::new(),
        director: String::new(),
        stars: String::new(),
        poster_url: format!("https://img.example/{slug}.jpg"),
        source_image_url: None,
        source_thumbnail_url: None,
        source_queries: Vec::new(),
        fetched_dates: None,
    }
}

/// Let spawned tasks run to completion on the current-thread runtime.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn failure(operation: &'static str, status: u16) -> ClientError {
    ClientError::Status {
        operation,
        status,
        detail: None,
    }
}

#[derive(Default)]
struct Calls {
    identity_lookups: usize,
    saved: Vec<String>,
    searches: Vec<String>,
    status_checks: usize,
    watchlist_changes: Vec<String>,
    movie_lookups: Vec<String>,
}

#[derive(Default)]
pub(crate) struct StubBackend {
    identity: Option<String>,
    identity_fails: bool,
    identity_delay: Option<Duration>,
    save_fails: bool,
    daily: Vec<Movie>,
    daily_fails: bool,
    catalog: HashMap<String, Movie>,
    search_results: HashMap<String, Vec<Movie>>,
    search_delays: HashMap<String, Duration>,
    search_fails: bool,
    watchlist: Mutex<HashSet<String>>,
    status_fails: bool,
    status_delay: Option<Duration>,
    toggle_fails: bool,
    toggle_delay: Option<Duration>,
    favorites: Vec<String>,
    user_record_fails: bool,
    calls: Mutex<Calls>,
}

impl StubBackend {
    pub(crate) fn with_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    pub(crate) const fn failing_identity(mut self) -> Self {
        self.identity_fails = true;
        self
    }

    pub(crate) const fn with_identity_delay(mut self, delay: Duration) -> Self {
        self.identity_delay = Some(delay);
        self
    }

    pub(crate) const fn failing_save(mut self) -> Self {
        self.save_fails = true;
        self
    }

    pub(crate) fn with_daily(mut self, movies: Vec<Movie>) -> Self {
        self.daily = movies;
        self
    }

    pub(crate) const fn failing_daily(mut self) -> Self {
        self.daily_fails = true;
        self
    }

    pub(crate) fn with_catalog(mut self, movies: impl IntoIterator<Item = Movie>) -> Self {
        self.catalog
            .extend(movies.into_iter().map(|movie| (movie.slug.clone(), movie)));
        self
    }

    pub(crate) fn with_search(mut self, term: &str, movies: Vec<Movie>) -> Self {
        self.search_results.insert(term.to_string(), movies);
        self
    }

    pub(crate) fn with_search_delay(mut self, term: &str, delay: Duration) -> Self {
        self.search_delays.insert(term.to_string(), delay);
        self
    }

    pub(crate) const fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    pub(crate) fn with_watchlist<'a>(self, slugs: impl IntoIterator<Item = &'a str>) -> Self {
        self.lock_watchlist()
            .extend(slugs.into_iter().map(str::to_string));
        self
    }

    pub(crate) const fn failing_status(mut self) -> Self {
        self.status_fails = true;
        self
    }

    pub(crate) const fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) const fn with_toggle_delay(mut self, delay: Duration) -> Self {
        self.toggle_delay = Some(delay);
        self
    }

    pub(crate) const fn failing_toggle(mut self) -> Self {
        self.toggle_fails = true;
        self
    }

    pub(crate) fn with_favorites<'a>(mut self, slugs: impl IntoIterator<Item = &'a str>) -> Self {
        self.favorites = slugs.into_iter().map(str::to_string).collect();
        self
    }

    pub(crate) const fn failing_user_record(mut self) -> Self {
        self.user_record_fails = true;
        self
    }

    pub(crate) fn identity_lookups(&self) -> usize {
        self.lock_calls().identity_lookups
    }

    pub(crate) fn saved_identities(&self) -> Vec<String> {
        self.lock_calls().saved.clone()
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        self.lock_calls().searches.clone()
    }

    pub(crate) fn status_checks(&self) -> usize {
        self.lock_calls().status_checks
    }

    pub(crate) fn watchlist_changes(&self) -> Vec<String> {
        self.lock_calls().watchlist_changes.clone()
    }

    pub(crate) fn movie_lookups(&self) -> Vec<String> {
        self.lock_calls().movie_lookups.clone()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_watchlist(&self) -> MutexGuard<'_, HashSet<String>> {
        self.watchlist.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn pause(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => tokio::task::yield_now().await,
    }
}

#[async_trait]
impl MovieBackend for StubBackend {
    async fn active_identity(&self) -> ClientResult<ActiveIdentity> {
        self.lock_calls().identity_lookups += 1;
        pause(self.identity_delay).await;
        if self.identity_fails {
            return Err(failure("active_identity", 500));
        }
        Ok(self
            .identity
            .clone()
            .map_or(ActiveIdentity::Anonymous, ActiveIdentity::Authenticated))
    }

    async fn save_identity(&self, identity: &Identity) -> ClientResult<()> {
        tokio::task::yield_now().await;
        if self.save_fails {
            return Err(failure("save_identity", 404));
        }
        self.lock_calls().saved.push(identity.to_string());
        Ok(())
    }

    async fn daily_movies(&self) -> ClientResult<Vec<Movie>> {
        tokio::task::yield_now().await;
        if self.daily_fails {
            return Err(failure("daily_movies", 500));
        }
        Ok(self.daily.clone())
    }

    async fn search_movies(&self, term: &SearchTerm) -> ClientResult<Vec<Movie>> {
        self.lock_calls().searches.push(term.as_str().to_string());
        match self.search_delays.get(term.as_str()) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }
        if self.search_fails {
            return Err(failure("search_movies", 429));
        }
        Ok(self
            .search_results
            .get(term.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn movie_by_slug(&self, slug: &str) -> ClientResult<Movie> {
        self.lock_calls().movie_lookups.push(slug.to_string());
        tokio::task::yield_now().await;
        self.catalog
            .get(slug)
            .cloned()
            .ok_or_else(|| failure("movie_by_slug", 404))
    }

    async fn watchlist_status(&self, _user: &Identity, slug: &str) -> ClientResult<bool> {
        self.lock_calls().status_checks += 1;
        // Answer reflects the watchlist when the request arrived.
        let member = self.lock_watchlist().contains(slug);
        pause(self.status_delay).await;
        if self.status_fails {
            return Err(failure("watchlist_status", 500));
        }
        Ok(member)
    }

    async fn add_to_watchlist(&self, _user: &Identity, slug: &str) -> ClientResult<()> {
        self.lock_calls()
            .watchlist_changes
            .push(format!("add:{slug}"));
        pause(self.toggle_delay).await;
        if self.toggle_fails {
            return Err(failure("add_to_watchlist", 500));
        }
        self.lock_watchlist().insert(slug.to_string());
        Ok(())
    }

    async fn remove_from_watchlist(&self, _user: &Identity, slug: &str) -> ClientResult<()> {
        self.lock_calls()
            .watchlist_changes
            .push(format!("remove:{slug}"));
        pause(self.toggle_delay).await;
        if self.toggle_fails {
            return Err(failure("remove_from_watchlist", 500));
        }
        self.lock_watchlist().remove(slug);
        Ok(())
    }

    async fn user_record(&self, user: &Identity) -> ClientResult<UserRecord> {
        tokio::task::yield_now().await;
        if self.user_record_fails {
            return Err(failure("user_record", 404));
        }
        Ok(UserRecord {
            id: None,
            github_id: user.to_string(),
            username: None,
            favorites: self.favorites.clone(),
        })
    }
}
