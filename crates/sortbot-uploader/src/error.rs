use thiserror::Error;

/// Network failure taxonomy for one upload attempt. Every kind is
/// retryable up to the configured attempt count; after that the cycle
/// fails and the watermark stays where it was.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("cannot parse server response: {0}")]
    ResponseParse(#[source] reqwest::Error),

    #[error("server rejected upload: {0}")]
    Rejected(String),
}

impl UploadError {
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Timeout(err)
        } else {
            UploadError::Connect(err)
        }
    }
}
