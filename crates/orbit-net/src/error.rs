//! Error types for network operations.

use orbit_cluster::RingError;

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The client was shut down; no connection was attempted.
    #[error("transport is shutdown")]
    Shutdown,

    /// Failed to connect to a remote host.
    #[error("connection error: {0}")]
    Connect(String),

    /// A socket read or write failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection at a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// Serialization or deserialization failed, or a frame was too large.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A dial or call did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The remote node answered with a failure.
    #[error("remote error: {0}")]
    Remote(String),

    /// The request cannot be encoded; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The remote node answered with the wrong message type.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<NetError> for RingError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::Remote(message) => RingError::Unavailable(message),
            other => RingError::Unavailable(other.to_string()),
        }
    }
}
