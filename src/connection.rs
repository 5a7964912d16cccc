//! Transport seam between sessions and their connections
//!
//! Sessions speak to the outside world through two capability traits,
//! one per pump: `MessageStream` (read) and `MessageSink` (write/close).
//! Any transport delivering one opaque text message per call is
//! substitutable, which is what lets the session tests run over in-memory
//! fakes instead of sockets.
//!
//! The production implementation adapts the two halves of a split
//! tokio-tungstenite WebSocket stream.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use crate::error::AppError;

/// Receive half of a connection
///
/// `Ok(None)` means the peer closed cleanly; any `Err` means the peer is
/// gone. Both end the inbound pump.
#[async_trait]
pub trait MessageStream: Send {
    /// Read the next message from the connection
    async fn read(&mut self) -> Result<Option<String>, AppError>;
}

/// Send half of a connection
#[async_trait]
pub trait MessageSink: Send {
    /// Write one message to the connection
    async fn write(&mut self, payload: String) -> Result<(), AppError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), AppError>;
}

/// WebSocket receive half
pub struct WsReceiver {
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

impl WsReceiver {
    pub fn new(stream: SplitStream<WebSocketStream<TcpStream>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl MessageStream for WsReceiver {
    /// Read the next text message
    ///
    /// Control frames and binary frames are skipped; a close frame or the
    /// end of the stream reads as `Ok(None)`.
    async fn read(&mut self) -> Result<Option<String>, AppError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Close(_) => {
                    debug!("Peer sent close frame");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Pong is handled automatically by tungstenite
                }
                _ => {
                    // Binary or other message types - ignore
                }
            }
        }
        Ok(None)
    }
}

/// WebSocket send half
pub struct WsSender {
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
}

impl WsSender {
    pub fn new(sink: SplitSink<WebSocketStream<TcpStream>, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl MessageSink for WsSender {
    async fn write(&mut self, payload: String) -> Result<(), AppError> {
        self.sink.send(Message::Text(payload)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.sink.close().await?;
        Ok(())
    }
}
