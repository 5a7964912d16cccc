//! Listening server
//!
//! Owns the TCP listener and the room handle; spawns the room's control
//! loop at bind time and one handler task per accepted connection.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::AppError;
use crate::handler::handle_connection;
use crate::room::{Room, RoomHandle};

/// The accept-loop server for a single room
pub struct Server {
    listener: TcpListener,
    room: RoomHandle,
}

impl Server {
    /// Bind the listener and start the room's control loop
    pub async fn bind(addr: &str) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await?;
        let (room, room_loop) = Room::channel();
        tokio::spawn(room_loop.run());
        Ok(Self { listener, room })
    }

    /// The address the server is listening on
    ///
    /// Useful when bound to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the room, for injecting broadcasts from outside any
    /// session
    pub fn room(&self) -> RoomHandle {
        self.room.clone()
    }

    /// Run the accept loop indefinitely
    pub async fn run(self) {
        info!(
            "Listening on {}",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let room = self.room.clone();

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, room).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
