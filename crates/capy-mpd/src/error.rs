//! Error types for capy-mpd

/// MPD client errors
#[derive(Debug, thiserror::Error)]
pub enum MpdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected greeting: {0:?}")]
    Greeting(String),

    #[error("server error: {0}")]
    Ack(String),

    #[error("malformed response line: {0:?}")]
    Malformed(String),

    #[error("connection closed before response was complete")]
    Disconnected,

    #[error("could not resolve {0}")]
    Resolve(String),
}
