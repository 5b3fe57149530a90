//! Error types for the relay server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be set up.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// I/O error outside any single connection's handler.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
