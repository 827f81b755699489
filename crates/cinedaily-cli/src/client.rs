//! Shared backend context and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cinedaily_client::{
    ClientConfig, ClientError, GuardDecision, HttpBackend, Identity, RouteGuard, Session,
    SessionProvider,
};
use tracing::debug;

/// How long an exiting command waits for background identity persistence.
const PERSIST_GRACE: Duration = Duration::from_secs(2);

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Classify a backend error into a CLI error.
///
/// Rejections of the request itself (400/409/422) are validation failures;
/// everything else is operational.
pub(crate) fn classify_client_error(err: &ClientError) -> CliError {
    match err {
        ClientError::Status {
            status: 400 | 409 | 422,
            detail: Some(detail),
            ..
        } => CliError::validation(detail.clone()),
        ClientError::InvalidUrl { .. } => CliError::validation(err.describe()),
        _ => CliError::failure(anyhow!(err.describe())),
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) backend: Arc<HttpBackend>,
    pub(crate) config: ClientConfig,
    pub(crate) session: SessionProvider,
}

impl AppContext {
    /// Build the HTTP backend for `config`, tagging every request with `trace_id`.
    pub(crate) fn new(config: ClientConfig, trace_id: &str) -> CliResult<Self> {
        let backend = HttpBackend::new(config.clone(), trace_id)
            .map_err(|err| classify_client_error(&err))?;
        Ok(Self {
            backend: Arc::new(backend),
            config,
            session: SessionProvider::new(),
        })
    }

    /// Resolve the session once for this invocation.
    pub(crate) async fn resolve_session(&self) -> Session {
        self.session.resolve(Arc::clone(&self.backend)).await
    }

    /// Run the route guard and return the signed-in identity.
    pub(crate) async fn require_user(&self) -> CliResult<Identity> {
        self.resolve_session().await;
        match RouteGuard::new(self.session.clone()).wait().await {
            GuardDecision::Render(identity) => Ok(identity),
            GuardDecision::Redirect(target) => {
                debug!(redirect = target, "guard denied access");
                Err(self.login_required())
            }
            GuardDecision::Pending => Err(self.login_required()),
        }
    }

    /// Let background work started by this invocation finish before exit.
    pub(crate) async fn finish(&self) {
        if !self.session.drain(PERSIST_GRACE).await {
            debug!("exiting with identity persistence still pending");
        }
    }

    fn login_required(&self) -> CliError {
        let hint = self.config.login_url().map_or_else(
            |_| "sign in through the web app".to_string(),
            |url| format!("sign in at {url}"),
        );
        CliError::validation(format!(
            "login required: {hint}, then pass the session cookie with --session-cookie"
        ))
    }
}
