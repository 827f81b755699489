//! Gate for views that require a signed-in user.
//!
//! Unresolved sessions render a loading state rather than redirecting, so a
//! signed-in user never sees a redirect flash while the session is resolving.

use crate::session::{Identity, Session, SessionProvider, SessionState};

/// Path anonymous users are sent to.
pub const REDIRECT_TARGET: &str = "/";

/// Guard state derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// Session not resolved yet.
    Loading,
    /// Resolved without a signed-in user.
    Denied,
    /// Resolved with a signed-in user.
    Allowed,
}

/// What a protected view should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show a loading indicator; resolution is still in progress.
    Pending,
    /// Navigate away to the given path.
    Redirect(&'static str),
    /// Render the protected view for this user.
    Render(Identity),
}

impl GuardDecision {
    /// Decision for the given session state.
    #[must_use]
    pub fn for_state(state: &SessionState) -> Self {
        match state {
            SessionState::Unresolved => Self::Pending,
            SessionState::Resolved(Session::Anonymous) => Self::Redirect(REDIRECT_TARGET),
            SessionState::Resolved(Session::Authenticated(identity)) => {
                Self::Render(identity.clone())
            }
        }
    }

    /// Phase this decision belongs to.
    #[must_use]
    pub const fn phase(&self) -> GuardPhase {
        match self {
            Self::Pending => GuardPhase::Loading,
            Self::Redirect(_) => GuardPhase::Denied,
            Self::Render(_) => GuardPhase::Allowed,
        }
    }
}

/// Route guard bound to a session provider.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionProvider,
}

impl RouteGuard {
    /// Bind a guard to the shared session.
    #[must_use]
    pub const fn new(session: SessionProvider) -> Self {
        Self { session }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> GuardPhase {
        self.decide().phase()
    }

    /// Decision for the current session state; never blocks.
    #[must_use]
    pub fn decide(&self) -> GuardDecision {
        GuardDecision::for_state(&self.session.current())
    }

    /// Wait for session resolution, then decide. Never returns
    /// [`GuardDecision::Pending`].
    pub async fn wait(&self) -> GuardDecision {
        match self.session.resolved().await {
            Session::Authenticated(identity) => GuardDecision::Render(identity),
            Session::Anonymous => GuardDecision::Redirect(REDIRECT_TARGET),
        }
    }
}
