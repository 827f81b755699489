#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Cinedaily backend API.
//!
//! The backend speaks camelCase JSON with a few legacy field names
//! (`netzkinoId`, `regisseur`, `imgImdb`). These types keep the wire names in
//! one place and expose Rust-friendly field names to the client and CLI.
use serde::{Deserialize, Deserializer, Serialize};

/// Body values the backend returns from `GET /api/users/active` when no user
/// is signed in.
pub const ANONYMOUS_SENTINELS: [&str; 2] = ["Unauthorized", "anonymousUser"];

/// Read a field the backend may send as JSON `null`, falling back to the
/// type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Movie as served by `/api/movies/*`. Immutable from the client's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Catalog identifier assigned by the upstream movie source.
    #[serde(rename = "netzkinoId", default, deserialize_with = "null_as_default")]
    pub id: i64,
    /// URL-safe key used by every per-movie endpoint.
    pub slug: String,
    /// Display title.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Release year as reported upstream (free text).
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: String,
    /// Plot summary.
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    /// Director credit.
    #[serde(rename = "regisseur", default, deserialize_with = "null_as_default")]
    pub director: String,
    /// Comma-separated cast list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub stars: String,
    /// Poster image URL.
    #[serde(rename = "imgImdb", default, deserialize_with = "null_as_default")]
    pub poster_url: String,
    /// Full-size artwork from the upstream source.
    #[serde(rename = "imgNetzkino", default, skip_serializing_if = "Option::is_none")]
    pub source_image_url: Option<String>,
    /// Thumbnail artwork from the upstream source.
    #[serde(
        rename = "imgNetzkinoSmall",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_thumbnail_url: Option<String>,
    /// Search queries that surfaced this movie in the catalog.
    #[serde(rename = "queries", default, deserialize_with = "null_as_default")]
    pub source_queries: Vec<String>,
    /// Days on which this movie was part of the daily selection.
    #[serde(rename = "dateFetched", default, skip_serializing_if = "Option::is_none")]
    pub fetched_dates: Option<Vec<String>>,
}

/// Persisted user record returned by `GET /api/users/active/{user}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Storage identifier, absent for records that were never saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identity issued by the OAuth provider.
    pub github_id: String,
    /// Display login.
    #[serde(default)]
    pub username: Option<String>,
    /// Slugs of every movie in the user's watchlist, in insertion order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorites: Vec<String>,
}

/// Membership response for `GET /api/users/watchlist/{user}/{slug}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistStatus {
    /// Whether the movie is currently in the user's watchlist.
    pub in_watchlist: bool,
}

/// Error document the backend attaches to failed requests.
///
/// Depending on the handler the message lives under `error` or `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Validation failure text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Lookup/auth failure text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// First populated message, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Decoded body of `GET /api/users/active`.
///
/// The endpoint answers with plain text: the identity, or a sentinel when the
/// caller is anonymous. Decoding happens once here so no caller compares
/// against sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveIdentity {
    /// A signed-in user with the given identity.
    Authenticated(String),
    /// No user is signed in.
    Anonymous,
}

impl ActiveIdentity {
    /// Decode the raw response body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim().trim_matches('"');
        if trimmed.is_empty() || ANONYMOUS_SENTINELS.contains(&trimmed) {
            Self::Anonymous
        } else {
            Self::Authenticated(trimmed.to_string())
        }
    }
}
