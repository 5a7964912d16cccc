//! Room actor implementation
//!
//! The single source of truth for room membership and message fan-out.
//! Uses the Actor pattern with an mpsc channel for message passing: all
//! joins, leaves and broadcasts are serialized through one control loop,
//! so the member map is only ever touched by one task and needs no locks.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::error::AppError;
use crate::types::SessionId;

/// Intake capacity of the room's event channel.
///
/// Submission suspends briefly if the intake is momentarily full; the loop
/// drains promptly because fan-out itself never blocks.
pub const ROOM_INTAKE_CAPACITY: usize = 256;

/// Events sent from sessions (and external callers) to the room actor
#[derive(Debug)]
pub enum RoomEvent {
    /// A session joined; the room takes ownership of its outbox producer
    Join {
        id: SessionId,
        outbox: mpsc::Sender<String>,
    },
    /// A session left (or its connection died)
    Leave { id: SessionId },
    /// A payload to fan out to current members
    Broadcast {
        /// Originating session, excluded from delivery. `None` means the
        /// payload was injected through the handle and reaches everyone.
        from: Option<SessionId>,
        payload: String,
    },
}

/// Cloneable submission side of the room's event intake
///
/// The only way external code drives the broker. All three operations
/// enqueue onto the same serialized event channel.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    events: mpsc::Sender<RoomEvent>,
}

impl RoomHandle {
    /// Register a session's outbox with the room
    pub async fn join(&self, id: SessionId, outbox: mpsc::Sender<String>) -> Result<(), AppError> {
        self.events
            .send(RoomEvent::Join { id, outbox })
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    /// Remove a session from the room; safe to call repeatedly
    pub async fn leave(&self, id: SessionId) -> Result<(), AppError> {
        self.events
            .send(RoomEvent::Leave { id })
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    /// Submit a payload for fan-out to current members
    ///
    /// `from` is the originating session, excluded from delivery; pass
    /// `None` to deliver to every member.
    pub async fn submit_for_broadcast(
        &self,
        from: Option<SessionId>,
        payload: String,
    ) -> Result<(), AppError> {
        self.events
            .send(RoomEvent::Broadcast { from, payload })
            .await
            .map_err(|_| AppError::ChannelSend)
    }
}

/// The room actor
///
/// Owns the member map and processes one event at a time. Run it with
/// [`Room::run`] on its own task; it stops once every [`RoomHandle`] has
/// been dropped.
pub struct Room {
    /// Current members: SessionId -> outbox producer
    ///
    /// The room holds the only producer handle for each member's outbox;
    /// removing an entry drops the producer, which closes the outbox and
    /// tells that session's outbound pump to finish.
    members: HashMap<SessionId, mpsc::Sender<String>>,
    /// Event receiver channel
    events: mpsc::Receiver<RoomEvent>,
}

impl Room {
    /// Create a room together with a handle to its intake
    pub fn channel() -> (RoomHandle, Room) {
        let (tx, rx) = mpsc::channel(ROOM_INTAKE_CAPACITY);
        (RoomHandle { events: tx }, Room::new(rx))
    }

    /// Create a room reading events from the given receiver
    pub fn new(events: mpsc::Receiver<RoomEvent>) -> Self {
        Self {
            members: HashMap::new(),
            events,
        }
    }

    /// Run the room event loop
    ///
    /// Continuously receives and processes events until all handles are
    /// dropped.
    pub async fn run(mut self) {
        info!("Room started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }

        info!("Room shutting down");
    }

    /// Process a single event
    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Join { id, outbox } => self.join(id, outbox),
            RoomEvent::Leave { id } => self.leave(id),
            RoomEvent::Broadcast { from, payload } => self.broadcast(from, payload),
        }
    }

    /// Handle a session joining
    fn join(&mut self, id: SessionId, outbox: mpsc::Sender<String>) {
        info!("Session {} joined", id);
        self.members.insert(id, outbox);
        debug!("Total members: {}", self.members.len());
    }

    /// Handle a session leaving
    ///
    /// No-op if the session is not a member. Dropping the stored outbox
    /// producer closes the outbox, so no further enqueue is possible.
    fn leave(&mut self, id: SessionId) {
        if self.members.remove(&id).is_some() {
            info!("Session {} left", id);
            debug!("Total members: {}", self.members.len());
        }
    }

    /// Fan a payload out to every current member except the originator
    ///
    /// Enqueueing is strictly non-blocking: a member whose outbox is full
    /// (consumer too slow) or closed is evicted exactly as if it had left,
    /// so one stalled session never delays delivery to the others.
    fn broadcast(&mut self, from: Option<SessionId>, payload: String) {
        let mut evicted = Vec::new();

        for (&id, outbox) in &self.members {
            if from == Some(id) {
                continue;
            }
            match outbox.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    info!("Evicting session {} (outbox full)", id);
                    evicted.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    info!("Evicting session {} (outbox closed)", id);
                    evicted.push(id);
                }
            }
        }

        for id in evicted {
            self.leave(id);
        }
    }

    /// Current number of members
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
