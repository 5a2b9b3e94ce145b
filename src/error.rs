use thiserror::Error;

/// Errors surfaced to callers of the public API, plus the internal variants
/// the node loop logs and absorbs without ever returning them to a caller.
#[derive(Debug, Error, Clone)]
pub enum GossipError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("send error: {0}")]
    Send(String),

    #[error("receive error: {0}")]
    Receive(String),

    #[error("endpoint closed")]
    Closed,

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GossipError {
    fn from(e: std::io::Error) -> Self {
        GossipError::Io(e.to_string())
    }
}
