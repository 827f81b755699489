//! Per-movie watchlist membership state machine.
//!
//! # Design
//! - Membership starts `Unknown` and only becomes known through a status fetch
//!   or a confirmed toggle; toggling is refused until it is known.
//! - The state flips only after the backend confirms a change. There is no
//!   speculative flip and therefore nothing to roll back.
//! - A toggle issued while another one is still in flight is rejected instead
//!   of racing it. Cancelling a toggle releases the control again.
//! - A failed status fetch settles on `NonMember` so the control becomes usable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::backend::MovieBackend;
use crate::session::Identity;

/// Confirmation shown after a successful add.
pub const ADDED_MESSAGE: &str = "Movie added to watchlist.";
/// Confirmation shown after a successful remove.
pub const REMOVED_MESSAGE: &str = "Movie removed from watchlist.";
/// Message shown when the backend rejects a toggle.
pub const FAILED_MESSAGE: &str = "Failed to update watchlist.";

/// Whether a movie is in the user's watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Membership {
    /// Not yet confirmed by the backend.
    #[default]
    Unknown,
    /// In the watchlist.
    Member,
    /// Not in the watchlist.
    NonMember,
}

impl Membership {
    /// Map the backend's membership flag.
    #[must_use]
    pub const fn from_flag(in_watchlist: bool) -> Self {
        if in_watchlist {
            Self::Member
        } else {
            Self::NonMember
        }
    }
}

/// Snapshot of one movie's watchlist state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchlistEntry {
    /// Confirmed membership.
    pub membership: Membership,
    /// A toggle request is awaiting the backend.
    pub in_flight: bool,
    /// Last user-facing message, if any.
    pub message: Option<String>,
}

/// Why a toggle was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleRejection {
    /// No user is signed in.
    NoUser,
    /// Membership has not been confirmed yet.
    StatusUnknown,
    /// Another toggle is awaiting the backend.
    InFlight,
}

/// Result of a toggle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The movie was added.
    Added,
    /// The movie was removed.
    Removed,
    /// The backend rejected the change; membership is unchanged.
    Failed,
    /// No request was issued.
    Ignored(ToggleRejection),
}

#[derive(Debug, Default)]
struct Control {
    entry: WatchlistEntry,
    // Bumped on every confirmed toggle; status responses older than the last
    // confirmation are dropped.
    confirmed: u64,
}

fn lock_control(control: &Mutex<Control>) -> MutexGuard<'_, Control> {
    control.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `in_flight` if a toggle is dropped before the backend answers.
struct InFlightGuard<'a> {
    control: &'a Mutex<Control>,
    armed: bool,
}

impl InFlightGuard<'_> {
    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock_control(self.control).entry.in_flight = false;
            debug!("watchlist toggle cancelled before completion");
        }
    }
}

/// Watchlist control for one movie and (optionally) one user.
///
/// Clones share state, so several callers can drive the same control.
pub struct WatchlistToggle<B: ?Sized> {
    backend: Arc<B>,
    user: Option<Identity>,
    slug: String,
    control: Arc<Mutex<Control>>,
}

impl<B: ?Sized> Clone for WatchlistToggle<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            user: self.user.clone(),
            slug: self.slug.clone(),
            control: Arc::clone(&self.control),
        }
    }
}

impl<B> WatchlistToggle<B>
where
    B: MovieBackend + ?Sized,
{
    /// Create a control in the `Unknown` state.
    #[must_use]
    pub fn new(backend: Arc<B>, user: Option<Identity>, slug: impl Into<String>) -> Self {
        Self {
            backend,
            user,
            slug: slug.into(),
            control: Arc::new(Mutex::new(Control::default())),
        }
    }

    /// Slug of the movie this control manages.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WatchlistEntry {
        self.lock().entry.clone()
    }

    /// Confirmed membership.
    #[must_use]
    pub fn membership(&self) -> Membership {
        self.lock().entry.membership
    }

    /// Whether a toggle would currently be attempted.
    #[must_use]
    pub fn can_toggle(&self) -> bool {
        let control = self.lock();
        self.user.is_some()
            && control.entry.membership != Membership::Unknown
            && !control.entry.in_flight
    }

    /// Fetch membership from the backend.
    ///
    /// Without a user no request is made and the state stays `Unknown`. A failed
    /// request settles on `NonMember`. A response that arrives while a toggle
    /// is in flight, or after one was confirmed, leaves the toggle's result in
    /// place.
    pub async fn fetch_status(&self) -> Membership {
        let Some(user) = &self.user else {
            debug!(slug = %self.slug, "no user; skipping watchlist status");
            return self.membership();
        };

        let asked_at = self.lock().confirmed;
        let membership = match self.backend.watchlist_status(user, &self.slug).await {
            Ok(in_watchlist) => Membership::from_flag(in_watchlist),
            Err(err) => {
                warn!(
                    slug = %self.slug,
                    error = %err.describe(),
                    "watchlist status unavailable; assuming not in watchlist"
                );
                Membership::NonMember
            }
        };

        let mut control = self.lock();
        if control.entry.in_flight || control.confirmed != asked_at {
            debug!(slug = %self.slug, "stale watchlist status ignored");
            return control.entry.membership;
        }
        control.entry.membership = membership;
        debug!(slug = %self.slug, ?membership, "watchlist status resolved");
        membership
    }

    /// Add or remove the movie depending on the confirmed membership.
    ///
    /// Dropping the returned future before it completes releases the control
    /// without changing membership.
    pub async fn toggle(&self) -> ToggleOutcome {
        let Some(user) = &self.user else {
            debug!(slug = %self.slug, "toggle ignored: no user");
            return ToggleOutcome::Ignored(ToggleRejection::NoUser);
        };

        let adding = {
            let mut control = self.lock();
            if control.entry.in_flight {
                debug!(slug = %self.slug, "toggle ignored: request in flight");
                return ToggleOutcome::Ignored(ToggleRejection::InFlight);
            }
            let adding = match control.entry.membership {
                Membership::Unknown => {
                    debug!(slug = %self.slug, "toggle ignored: status unknown");
                    return ToggleOutcome::Ignored(ToggleRejection::StatusUnknown);
                }
                Membership::Member => false,
                Membership::NonMember => true,
            };
            control.entry.in_flight = true;
            adding
        };
        let mut guard = InFlightGuard {
            control: &self.control,
            armed: true,
        };

        let result = if adding {
            self.backend.add_to_watchlist(user, &self.slug).await
        } else {
            self.backend.remove_from_watchlist(user, &self.slug).await
        };

        let mut control = self.lock();
        guard.disarm();
        control.entry.in_flight = false;
        match result {
            Ok(()) => {
                control.confirmed += 1;
                let entry = &mut control.entry;
                if adding {
                    entry.membership = Membership::Member;
                    entry.message = Some(ADDED_MESSAGE.to_string());
                    debug!(slug = %self.slug, "added to watchlist");
                    ToggleOutcome::Added
                } else {
                    entry.membership = Membership::NonMember;
                    entry.message = Some(REMOVED_MESSAGE.to_string());
                    debug!(slug = %self.slug, "removed from watchlist");
                    ToggleOutcome::Removed
                }
            }
            Err(err) => {
                warn!(slug = %self.slug, error = %err.describe(), "watchlist update failed");
                control.entry.message = Some(FAILED_MESSAGE.to_string());
                ToggleOutcome::Failed
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Control> {
        lock_control(&self.control)
    }
}
