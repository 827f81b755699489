//! Client configuration and backend origin resolution.
//!
//! # Design
//! - The backend is same-origin in deployment; the local dev front-end
//!   (`localhost:5173`) talks to the dev API on `localhost:8080`.
//! - Endpoints are assembled from path segments so identities and slugs are
//!   percent-encoded rather than spliced into strings.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Host (with port) the local development front-end is served from.
pub const DEV_FRONTEND_HOST: &str = "localhost:5173";
/// API origin used when the front-end runs on [`DEV_FRONTEND_HOST`].
pub const DEV_API_ORIGIN: &str = "http://localhost:8080";
/// Transport timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Quiet period before a search keystroke turns into a request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(700);

const LOGIN_PATH: [&str; 3] = ["oauth2", "authorization", "github"];
const LOGOUT_PATH: [&str; 3] = ["api", "users", "logout"];

/// Resolve the API origin for a page served from `page_origin`.
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] when `page_origin` has no host.
pub fn resolve_api_origin(page_origin: &Url) -> ClientResult<Url> {
    let host = page_origin.host_str().ok_or_else(|| ClientError::InvalidUrl {
        value: page_origin.to_string(),
        detail: "origin has no host".to_string(),
    })?;
    let host_with_port = page_origin
        .port()
        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));

    let origin = if host_with_port == DEV_FRONTEND_HOST {
        DEV_API_ORIGIN.to_string()
    } else {
        page_origin.origin().ascii_serialization()
    };

    parse_url(&origin)
}

/// Parse a URL, mapping failures onto [`ClientError::InvalidUrl`].
///
/// # Errors
///
/// Returns [`ClientError::InvalidUrl`] when the input is not an absolute URL.
pub fn parse_url(input: &str) -> ClientResult<Url> {
    input.parse::<Url>().map_err(|err| ClientError::InvalidUrl {
        value: input.to_string(),
        detail: err.to_string(),
    })
}

/// Settings shared by every component of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin all API paths are resolved against.
    pub api_origin: Url,
    /// Transport timeout for each request.
    pub timeout: Duration,
    /// Search debounce interval.
    pub debounce: Duration,
    /// Session cookie forwarded with every request (`NAME=value`).
    pub session_cookie: Option<String>,
}

impl ClientConfig {
    /// Build a configuration for the front-end/API origin `origin` with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the origin has no host.
    pub fn new(origin: &Url) -> ClientResult<Self> {
        Ok(Self {
            api_origin: resolve_api_origin(origin)?,
            timeout: DEFAULT_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
            session_cookie: None,
        })
    }

    /// Override the transport timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the search debounce interval.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Attach a session cookie; blank values are ignored.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: Option<String>) -> Self {
        self.session_cookie = cookie
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Absolute URL for the given path segments below the API origin.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the origin cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.api_origin.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                value: self.api_origin.to_string(),
                detail: "origin cannot be a base URL".to_string(),
            })?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// Full-page navigation target that starts the OAuth login.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the origin cannot carry a path.
    pub fn login_url(&self) -> ClientResult<Url> {
        self.endpoint(&LOGIN_PATH)
    }

    /// Full-page navigation target that terminates the backend session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the origin cannot carry a path.
    pub fn logout_url(&self) -> ClientResult<Url> {
        self.endpoint(&LOGOUT_PATH)
    }
}
