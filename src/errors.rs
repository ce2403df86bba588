/// Domain-specific error types for the options desk.
/// Nothing here is fatal to a simulation instance. The desk must:
/// - Reject bad requests before any state is touched
/// - Recover commentary failures locally with a fallback string
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("commentary service error: {0}")]
    Commentary(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl From<reqwest::Error> for DeskError {
    fn from(e: reqwest::Error) -> Self {
        DeskError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Parse(e.to_string())
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
