use thiserror::Error;

/// Why a fetch produced no payload
///
/// Errors are cached alongside successes, so every variant is `Clone` and
/// carries only owned strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Response {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Response is not JSON: {0}")]
    Json(String),

    #[error("Response is not well-formed XML: {0}")]
    Xml(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Status code of a rejected response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type FetchResult<T = super::Payload> = std::result::Result<T, FetchError>;
