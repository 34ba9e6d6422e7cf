//! Huginn error types

/// Huginn error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum HuginnError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// The request was cancelled on purpose. Never surfaced as a failure.
    #[error("request aborted")]
    Aborted,

    // Cache errors
    #[error("cache read error: {0}")]
    CacheRead(String),

    #[error("cache write error: {0}")]
    CacheWrite(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Whether this error is a transport failure (network fault or a
    /// non-success response). Transport failures consume a retry attempt.
    pub fn is_transport(&self) -> bool {
        matches!(self, HuginnError::Http(_) | HuginnError::Status { .. })
    }

    /// Whether this error is a deliberate cancellation.
    pub fn is_abort(&self) -> bool {
        matches!(self, HuginnError::Aborted)
    }

    /// HTTP status code for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            HuginnError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Every variant carries only strings, so comparing the rendered message is
// enough for state snapshots.
impl PartialEq for HuginnError {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.to_string() == other.to_string()
    }
}

impl From<serde_json::Error> for HuginnError {
    fn from(err: serde_json::Error) -> Self {
        HuginnError::Json(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => HuginnError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => HuginnError::Http(err.to_string()),
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
