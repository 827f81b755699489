//! Session resolution and the shared session context.
//!
//! # Design
//! - The anonymous sentinel is decoded once at the backend boundary; from here
//!   on a session is either `Authenticated(identity)` or `Anonymous`.
//! - [`SessionProvider`] is passed explicitly to whoever needs it. Readers use
//!   `current`/`subscribe`; only `resolve` and `logout` write.
//! - Identity persistence runs in the background; [`SessionProvider::drain`]
//!   waits for it before the process exits.
//! - Resolution happens once per provider. After that the state only ever moves
//!   to `Resolved(Anonymous)` on logout and never back to `Unresolved`.

use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cinedaily_api_models::ActiveIdentity;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::MovieBackend;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Opaque identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wrap a backend-issued identity; blank values are not identities.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the raw identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Who the backend believes the caller is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// A signed-in user.
    Authenticated(Identity),
    /// Nobody is signed in.
    Anonymous,
}

impl Session {
    /// Identity of the signed-in user, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl From<ActiveIdentity> for Session {
    fn from(value: ActiveIdentity) -> Self {
        match value {
            ActiveIdentity::Authenticated(raw) => {
                Identity::new(raw).map_or(Self::Anonymous, Self::Authenticated)
            }
            ActiveIdentity::Anonymous => Self::Anonymous,
        }
    }
}

/// Lifecycle of the session held by a [`SessionProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Resolution has not completed yet.
    #[default]
    Unresolved,
    /// Resolution completed (or the user logged out).
    Resolved(Session),
}

impl SessionState {
    /// Whether resolution has completed.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Resolved session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Resolved(session) => Some(session),
            Self::Unresolved => None,
        }
    }
}

/// Shared, explicitly passed session context.
#[derive(Debug, Clone)]
pub struct SessionProvider {
    state: Arc<watch::Sender<SessionState>>,
    started: Arc<AtomicBool>,
    persisting: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider {
    /// Create a provider in the `Unresolved` state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self {
            state: Arc::new(state),
            started: Arc::new(AtomicBool::new(false)),
            persisting: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Identity of the signed-in user, if resolved and authenticated.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state
            .borrow()
            .session()
            .and_then(Session::identity)
            .cloned()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the session against the backend.
    ///
    /// Only the first call issues the identity request; later (or concurrent)
    /// calls wait for that resolution and return its outcome. A failed request
    /// resolves to [`Session::Anonymous`]. When a user is signed in, the
    /// identity is persisted in a background task whose outcome is only logged.
    pub async fn resolve<B>(&self, backend: Arc<B>) -> Session
    where
        B: MovieBackend + ?Sized + 'static,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.resolved().await;
        }

        let session = match backend.active_identity().await {
            Ok(active) => Session::from(active),
            Err(err) => {
                warn!(error = %err.describe(), "session lookup failed; continuing anonymously");
                Session::Anonymous
            }
        };

        let written = self.state.send_if_modified(|state| {
            if state.is_resolved() {
                false
            } else {
                *state = SessionState::Resolved(session.clone());
                true
            }
        });

        match &session {
            _ if !written => debug!("session changed during lookup; keeping current state"),
            Session::Authenticated(identity) => {
                info!(identity = %identity, "session resolved");
                let task = spawn_persist_identity(backend, identity.clone());
                self.lock_persisting().push(task);
            }
            Session::Anonymous => debug!("session resolved as anonymous"),
        }

        self.current().session().cloned().unwrap_or(Session::Anonymous)
    }

    /// Wait until the session has been resolved and return it.
    pub async fn resolved(&self) -> Session {
        let mut receiver = self.state.subscribe();
        if receiver.wait_for(SessionState::is_resolved).await.is_err() {
            return Session::Anonymous;
        }
        self.current().session().cloned().unwrap_or(Session::Anonymous)
    }

    /// Clear the local identity and return the logout navigation target.
    ///
    /// No request is awaited; the caller navigates to the returned URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the logout URL cannot be built from `config`.
    pub fn logout(&self, config: &ClientConfig) -> ClientResult<Url> {
        let target = config.logout_url()?;
        self.started.store(true, Ordering::SeqCst);
        self.state
            .send_replace(SessionState::Resolved(Session::Anonymous));
        info!("session cleared locally");
        Ok(target)
    }

    /// Wait up to `grace` for background identity persistence to finish.
    ///
    /// Returns `false` when tasks were still running at the deadline; they are
    /// left detached and their outcome is not reported.
    pub async fn drain(&self, grace: Duration) -> bool {
        let tasks = std::mem::take(&mut *self.lock_persisting());
        if tasks.is_empty() {
            return true;
        }
        let Ok(outcomes) = tokio::time::timeout(grace, join_all(tasks)).await else {
            warn!(?grace, "identity persistence still pending at shutdown");
            return false;
        };
        for outcome in outcomes {
            if let Err(err) = outcome {
                warn!(error = %err, "identity persistence task aborted");
            }
        }
        true
    }

    fn lock_persisting(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.persisting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Best-effort persistence of a freshly resolved identity.
fn spawn_persist_identity<B>(backend: Arc<B>, identity: Identity) -> JoinHandle<()>
where
    B: MovieBackend + ?Sized + 'static,
{
    tokio::spawn(async move {
        match backend.save_identity(&identity).await {
            Ok(()) => debug!(identity = %identity, "identity persisted"),
            Err(err) => warn!(
                identity = %identity,
                error = %err.describe(),
                "failed to persist identity"
            ),
        }
    })
}
