//! WebSocket connection handler
//!
//! Accept-side glue: performs the WebSocket handshake on a fresh TCP
//! connection, splits it into its two halves, and hands them to a
//! session bound to the room.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::connection::{WsReceiver, WsSender};
use crate::error::AppError;
use crate::room::RoomHandle;
use crate::session::{run_session, DEFAULT_OUTBOX_CAPACITY};

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake and runs the session until its
/// connection closes. The returned error covers the handshake and
/// registration only; pump failures are handled inside the session.
pub async fn handle_connection(stream: TcpStream, room: RoomHandle) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (ws_sender, ws_receiver) = ws_stream.split();

    info!("WebSocket connection established with {}", peer_addr);

    run_session(
        room,
        WsReceiver::new(ws_receiver),
        WsSender::new(ws_sender),
        DEFAULT_OUTBOX_CAPACITY,
    )
    .await?;

    info!("Connection from {} closed", peer_addr);
    Ok(())
}
