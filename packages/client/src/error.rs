//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The server answered the join request with something other than ACK.
    #[error("join request rejected by server: {0:?}")]
    JoinRejected(String),

    /// The server closed the connection.
    #[error("server closed the connection")]
    ConnectionClosed,

    /// No ACK arrived for the quit request in time.
    #[error("timed out waiting for the quit acknowledgement")]
    AckTimeout,

    /// Connection error
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}
