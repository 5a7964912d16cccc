//! Error types for the chat server
//!
//! Defines connection-level errors. Uses thiserror for ergonomic
//! error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Everything here is fatal for the connection it occurred on; session
/// pumps handle these locally by tearing the connection down rather than
/// surfacing them to a caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Room intake closed (fatal - the room loop is gone)
    #[error("Channel send error")]
    ChannelSend,
}
