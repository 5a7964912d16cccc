//! Single-room WebSocket fan-out chat server library
//!
//! A chat server built with tokio-tungstenite using the Actor pattern
//! for state management: every message a client sends is broadcast to
//! the other clients in the room.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Room` is the central actor owning membership and fan-out
//! - Each connection runs a session with two pumps: a read loop feeding
//!   the room and a write loop draining the session's bounded outbox
//! - No locks needed - all state access goes through message passing
//!
//! Delivery is best-effort: enqueueing onto a member's outbox never
//! blocks, and a member whose outbox is full is evicted from the room
//! rather than allowed to stall delivery to everyone else.
//!
//! # Example
//! ```ignore
//! use roomcast::Server;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind("127.0.0.1:8080").await.unwrap();
//!     server.run().await;
//! }
//! ```

pub mod connection;
pub mod error;
pub mod handler;
pub mod room;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use connection::{MessageSink, MessageStream, WsReceiver, WsSender};
pub use error::AppError;
pub use handler::handle_connection;
pub use room::{Room, RoomEvent, RoomHandle};
pub use server::Server;
pub use session::{run_session, DEFAULT_OUTBOX_CAPACITY};
pub use types::SessionId;
