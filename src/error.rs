use thiserror::Error;

/// Generic banner text used when a failure carries no usable message.
pub const GENERIC_REQUEST_FAILURE: &str = "Request failed. Check your network or try again.";

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; `message` is the best-effort extracted text.
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("render error: {0}")]
    Render(#[from] askama::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Human-readable text for the error banner.
    pub fn message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            GENERIC_REQUEST_FAILURE.to_string()
        } else {
            text
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
