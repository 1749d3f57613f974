use thiserror::Error;

/// How much of an upstream response body is kept in errors and logs.
const EXCERPT_LEN: usize = 240;

/// Top-level error type for the `plexgrant-api` crate.
///
/// Covers every failure mode across all API surfaces: authentication,
/// transport, the legacy XML endpoint, and the JSON endpoints.
/// `plexgrant-core` maps these into user-facing diagnostics; callers of this
/// crate never need to inspect `reqwest` errors directly.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credential rejected by plex.tv (bad or expired token).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(reqwest::Error),

    /// Request exceeded the per-call timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Upstream responses ──────────────────────────────────────────
    /// Non-success HTTP status with whatever body plex.tv attached.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The legacy endpoint returned a body that is not parseable XML.
    #[error("Malformed XML response: {message}")]
    XmlParse { message: String, excerpt: String },

    /// JSON deserialization failed, with a body excerpt for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, excerpt: String },
}

impl Error {
    /// Map a `reqwest` send error, distinguishing timeouts so callers get a
    /// `Timeout` variant instead of a generic transport failure.
    pub(crate) fn from_send(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Transport(err)
        }
    }

    /// Returns `true` if this error indicates a rejected credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the remote service was unreachable (as opposed to
    /// reachable but answering badly).
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Truncate a response body for inclusion in errors and log lines.
pub(crate) fn excerpt(body: &str) -> String {
    if body.len() <= EXCERPT_LEN {
        body.to_owned()
    } else {
        let mut cut = EXCERPT_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    }
}
