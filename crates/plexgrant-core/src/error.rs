// ── Core error types ──
//
// User-facing errors from plexgrant-core. These are NOT transport-specific --
// consumers never see reqwest errors or raw status codes directly. The
// `From<plexgrant_api::Error>` impl translates transport-layer errors into
// domain-appropriate variants at exactly one place; step-specific wrappers
// (`LibraryUpdateFailed`, `ShareRecreationFailed`) are applied at the
// reconciler's call sites because only it knows which step failed.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Credential / upstream errors ─────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Collection owner unreachable: {reason}")]
    Unavailable { reason: String },

    #[error("Remote call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Malformed upstream response: {message}")]
    MalformedResponse { message: String, excerpt: String },

    #[error("Upstream API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Client errors ────────────────────────────────────────────────
    #[error("Unknown library identifier: {identifier}")]
    UnknownLibrary { identifier: String },

    #[error("User {user} has no share on server {owner}")]
    UserNotShared { user: String, owner: String },

    /// A precondition the remote state cannot satisfy; nothing was changed.
    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    // ── Reconciliation step failures ─────────────────────────────────
    /// The library-set update failed. No destructive step was taken:
    /// libraries and permissions are both unchanged.
    #[error("Library update failed for user {user} on server {owner}: {message}")]
    LibraryUpdateFailed {
        user: String,
        owner: String,
        message: String,
    },

    /// The share was deleted but not recreated. The user is left unshared;
    /// this needs operator attention and must never be downgraded to a
    /// generic failure.
    #[error(
        "Share recreation failed for user {user} on server {owner}: \
         share was deleted but not recreated ({message})"
    )]
    ShareRecreationFailed {
        user: String,
        owner: String,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the caller may retry this error. Reconciliation-step failures
    /// are excluded even when transient in origin: blind retries of
    /// delete/recreate are not idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<plexgrant_api::Error> for CoreError {
    fn from(err: plexgrant_api::Error) -> Self {
        match err {
            plexgrant_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            plexgrant_api::Error::Transport(ref e) if e.is_connect() => CoreError::Unavailable {
                reason: e.to_string(),
            },
            plexgrant_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            plexgrant_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            plexgrant_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            plexgrant_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            plexgrant_api::Error::XmlParse { message, excerpt } => CoreError::MalformedResponse {
                message: format!("XML parse failure: {message}"),
                excerpt,
            },
            plexgrant_api::Error::Deserialization { message, excerpt } => {
                CoreError::MalformedResponse {
                    message: format!("JSON parse failure: {message}"),
                    excerpt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_a_retryable_variant() {
        let core = CoreError::from(plexgrant_api::Error::Timeout { timeout_secs: 15 });
        assert!(matches!(core, CoreError::Timeout { timeout_secs: 15 }));
        assert!(core.is_retryable());
    }

    #[test]
    fn step_failures_are_never_retryable() {
        let err = CoreError::ShareRecreationFailed {
            user: "friend@example.com".into(),
            owner: "abc123".into(),
            message: "upstream 502".into(),
        };
        assert!(!err.is_retryable());
    }
}
