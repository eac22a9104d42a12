//! Error types for the lookup client.

/// Errors that can occur when querying the lookup provider.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be built, sent, or decoded.
    #[error("Request failed")]
    RequestFailed,
    /// The provider did not answer within the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// The provider returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
}

impl Error {
    /// Whether retrying the same lookup later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::RequestFailed => false,
        }
    }
}
