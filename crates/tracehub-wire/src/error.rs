use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    /// The payload is not a decodable trace message. Per-message: the
    /// offending message is discarded and the connection keeps serving.
    #[error("malformed trace message: {0}")]
    Malformed(String),

    /// A frame length prefix exceeds the configured bound. Unrecoverable
    /// for the connection that sent it.
    #[error("frame of {got} bytes exceeds limit of {limit}")]
    FrameTooLarge { got: usize, limit: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
