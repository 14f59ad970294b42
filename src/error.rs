use thiserror::Error;

/// Errors callers are expected to branch on.
///
/// Everything else travels as a plain `anyhow::Error`; these variants are
/// recovered with `downcast_ref::<FioriError>()`.
#[derive(Debug, Error)]
pub enum FioriError {
    /// A filter, action or field lookup missed. `alternatives` lists what
    /// would have matched so the caller can correct itself.
    #[error("{kind} '{query}' not found. Available: {}", format_alternatives(.alternatives))]
    NotFound {
        kind: String,
        query: String,
        alternatives: Vec<String>,
    },

    #[error("timed out after {timeout_ms}ms waiting for {predicate}")]
    Timeout { predicate: String, timeout_ms: u64 },

    #[error("metadata not found at {path}, run extraction first")]
    MetadataMissing { path: String },

    #[error("browser session is no longer valid: {0}")]
    SessionInvalid(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("no browser session, run start first")]
    NoSession,
}

impl FioriError {
    pub fn not_found(
        kind: impl Into<String>,
        query: impl Into<String>,
        alternatives: Vec<String>,
    ) -> Self {
        FioriError::NotFound {
            kind: kind.into(),
            query: query.into(),
            alternatives,
        }
    }

    pub fn timeout(predicate: impl Into<String>, timeout_ms: u64) -> Self {
        FioriError::Timeout {
            predicate: predicate.into(),
            timeout_ms,
        }
    }

    /// Stable tag used in structured payloads
    pub fn kind(&self) -> &'static str {
        match self {
            FioriError::NotFound { .. } => "not_found",
            FioriError::Timeout { .. } => "timeout",
            FioriError::MetadataMissing { .. } => "metadata_missing",
            FioriError::SessionInvalid(_) => "session_invalid",
            FioriError::Script(_) => "script",
            FioriError::NoSession => "no_session",
        }
    }

    /// Expected conditions are reported as payloads, never as traces
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            FioriError::NotFound { .. }
                | FioriError::Timeout { .. }
                | FioriError::MetadataMissing { .. }
                | FioriError::NoSession
        )
    }
}

fn format_alternatives(alternatives: &[String]) -> String {
    if alternatives.is_empty() {
        "(none)".to_string()
    } else {
        alternatives.join(", ")
    }
}

/// Whether an error chain means the page or browser went away
pub fn is_session_invalid(err: &anyhow::Error) -> bool {
    if let Some(FioriError::SessionInvalid(_)) = err.downcast_ref::<FioriError>() {
        return true;
    }
    looks_like_closed_target(&format!("{:#}", err))
}

/// Message fragments Playwright and Chromium emit once a target is gone
pub fn looks_like_closed_target(message: &str) -> bool {
    const MARKERS: [&str; 6] = [
        "Target closed",
        "has been closed",
        "Browser closed",
        "Connection closed",
        "browser has disconnected",
        "Target page, context or browser",
    ];
    MARKERS.iter().any(|m| message.contains(m))
}
