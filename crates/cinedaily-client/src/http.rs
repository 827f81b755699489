//! `reqwest` implementation of [`MovieBackend`].

use async_trait::async_trait;
use cinedaily_api_models::{ActiveIdentity, ErrorBody, Movie, UserRecord, WatchlistStatus};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::backend::MovieBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::search::SearchTerm;
use crate::session::Identity;

/// Header carrying the per-process trace identifier.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Build a client honouring the configured timeout and session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpClient`] when a header value is invalid or the
    /// underlying client cannot be constructed.
    pub fn new(config: ClientConfig, request_id: &str) -> ClientResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(request_id).map_err(|_| ClientError::HttpClient {
            detail: "trace identifier contains invalid characters".to_string(),
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        if let Some(cookie) = &config.session_cookie {
            let mut value = HeaderValue::from_str(cookie).map_err(|_| ClientError::HttpClient {
                detail: "session cookie contains invalid characters".to_string(),
            })?;
            value.set_sensitive(true);
            default_headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| ClientError::HttpClient {
                detail: err.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// Wrap an already configured client.
    #[must_use]
    pub const fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Configuration the backend was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "backend responded");
        if status.is_success() {
            Ok(response)
        } else {
            Err(classify_failure(operation, response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> ClientResult<T> {
        let response = self.send(operation, self.client.get(url)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode {
            operation,
            detail: err.to_string(),
        })
    }

    fn watchlist_url(&self, user: &Identity, slug: &str) -> ClientResult<Url> {
        self.config
            .endpoint(&["api", "users", "watchlist", user.as_str(), slug])
    }
}

/// Turn a non-success response into a [`ClientError::Status`].
async fn classify_failure(operation: &'static str, response: Response) -> ClientError {
    let status = response.status().as_u16();
    let bytes = response.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorBody>(&bytes)
        .ok()
        .and_then(|body| body.detail().map(str::to_string))
        .or_else(|| {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            (!text.is_empty()).then_some(text)
        });
    ClientError::Status {
        operation,
        status,
        detail,
    }
}

#[async_trait]
impl MovieBackend for HttpBackend {
    async fn active_identity(&self) -> ClientResult<ActiveIdentity> {
        const OPERATION: &str = "active_identity";
        let url = self.config.endpoint(&["api", "users", "active"])?;
        let response = self.send(OPERATION, self.client.get(url)).await?;
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                operation: OPERATION,
                source,
            })?;
        Ok(ActiveIdentity::from_body(&body))
    }

    async fn save_identity(&self, identity: &Identity) -> ClientResult<()> {
        let url = self
            .config
            .endpoint(&["api", "users", "save", identity.as_str()])?;
        self.send("save_identity", self.client.post(url)).await?;
        Ok(())
    }

    async fn daily_movies(&self) -> ClientResult<Vec<Movie>> {
        let url = self.config.endpoint(&["api", "movies", "daily"])?;
        self.get_json("daily_movies", url).await
    }

    async fn search_movies(&self, term: &SearchTerm) -> ClientResult<Vec<Movie>> {
        let mut url = self.config.endpoint(&["api", "movies", "search"])?;
        url.query_pairs_mut().append_pair("query", term.as_str());
        self.get_json("search_movies", url).await
    }

    async fn movie_by_slug(&self, slug: &str) -> ClientResult<Movie> {
        let url = self.config.endpoint(&["api", "movies", slug])?;
        self.get_json("movie_by_slug", url).await
    }

    async fn watchlist_status(&self, user: &Identity, slug: &str) -> ClientResult<bool> {
        let url = self.watchlist_url(user, slug)?;
        let status: WatchlistStatus = self.get_json("watchlist_status", url).await?;
        Ok(status.in_watchlist)
    }

    async fn add_to_watchlist(&self, user: &Identity, slug: &str) -> ClientResult<()> {
        let url = self.watchlist_url(user, slug)?;
        self.send("add_to_watchlist", self.client.post(url)).await?;
        Ok(())
    }

    async fn remove_from_watchlist(&self, user: &Identity, slug: &str) -> ClientResult<()> {
        let url = self.watchlist_url(user, slug)?;
        self.send("remove_from_watchlist", self.client.delete(url))
            .await?;
        Ok(())
    }

    async fn user_record(&self, user: &Identity) -> ClientResult<UserRecord> {
        let url = self
            .config
            .endpoint(&["api", "users", "active", user.as_str()])?;
        self.get_json("user_record", url).await
    }
}
