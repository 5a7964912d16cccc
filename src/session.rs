//! Per-connection session
//!
//! A session bridges one connection to the room: an inbound pump reads
//! the connection and submits each message for broadcast, while an
//! outbound pump drains the session's bounded outbox back onto the
//! connection. The pumps run concurrently and are independent; closing
//! the underlying connection is the only cancellation primitive, and a
//! stalled read blocks the inbound pump until the peer or network layer
//! intervenes.

use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::{MessageSink, MessageStream};
use crate::error::AppError;
use crate::room::RoomHandle;
use crate::types::SessionId;

/// Outbox capacity used for real connections
///
/// How many undelivered payloads a session may accumulate before the
/// room gives up on it as a slow consumer.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Run one session to completion
///
/// Joins the room, spawns the outbound pump, then runs the inbound pump
/// on the current task; the inbound pump terminating is the signal that
/// the session is finished. The leave notification sits on the single
/// exit path after the inbound pump, so the room learns of departure
/// exactly once no matter how the pump ended.
pub async fn run_session<R, W>(
    room: RoomHandle,
    reader: R,
    writer: W,
    outbox_capacity: usize,
) -> Result<(), AppError>
where
    R: MessageStream,
    W: MessageSink + 'static,
{
    let id = SessionId::new();
    let (outbox_tx, outbox_rx) = mpsc::channel(outbox_capacity);

    // The room takes the only producer handle; from here on, outbox
    // closure is the room's decision.
    room.join(id, outbox_tx).await?;

    let write_task = tokio::spawn(outbound_pump(writer, outbox_rx));

    inbound_pump(reader, &room, id).await;

    let _ = room.leave(id).await;

    // Leaving closed the outbox, so the outbound pump drains what is
    // left and shuts the connection.
    let _ = write_task.await;

    debug!("Session {} finished", id);
    Ok(())
}

/// Read loop: connection -> room
///
/// Any read failure and a clean peer close end the loop the same way;
/// the distinction only matters for logging.
async fn inbound_pump<R: MessageStream>(mut reader: R, room: &RoomHandle, id: SessionId) {
    loop {
        match reader.read().await {
            Ok(Some(payload)) => {
                if room
                    .submit_for_broadcast(Some(id), payload)
                    .await
                    .is_err()
                {
                    debug!("Room closed, ending inbound pump for {}", id);
                    break;
                }
            }
            Ok(None) => {
                debug!("Peer closed connection, ending inbound pump for {}", id);
                break;
            }
            Err(e) => {
                debug!("Read error for {}: {}", id, e);
                break;
            }
        }
    }
}

/// Write loop: outbox -> connection
///
/// Ends when the outbox is closed and drained (the room dropped this
/// session) or a write fails (the peer is gone; the inbound pump will
/// observe the same on its next read). Either way the connection is
/// closed here, on the half this pump owns.
async fn outbound_pump<W: MessageSink>(mut writer: W, mut outbox: mpsc::Receiver<String>) {
    while let Some(payload) = outbox.recv().await {
        if let Err(e) = writer.write(payload).await {
            debug!("Write failed, ending outbound pump: {}", e);
            break;
        }
    }
    let _ = writer.close().await;
    debug!("Outbound pump ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;

    use crate::room::Room;

    /// Scripted receive half: yields whatever the test feeds it and
    /// blocks in between, like a socket read would.
    struct FakeReader {
        frames: mpsc::UnboundedReceiver<Result<Option<String>, AppError>>,
    }

    fn fake_reader() -> (
        FakeReader,
        mpsc::UnboundedSender<Result<Option<String>, AppError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FakeReader { frames: rx }, tx)
    }

    #[async_trait]
    impl MessageStream for FakeReader {
        async fn read(&mut self) -> Result<Option<String>, AppError> {
            match self.frames.recv().await {
                Some(frame) => frame,
                // Script sender dropped: the connection was closed
                // under the blocked read.
                None => Ok(None),
            }
        }
    }

    /// Recording send half; optionally fails every write.
    #[derive(Debug, PartialEq)]
    enum SinkEvent {
        Payload(String),
        Closed,
    }

    struct FakeWriter {
        events: mpsc::UnboundedSender<SinkEvent>,
        fail_writes: bool,
    }

    fn fake_writer(fail_writes: bool) -> (FakeWriter, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            FakeWriter {
                events: tx,
                fail_writes,
            },
            rx,
        )
    }

    #[async_trait]
    impl MessageSink for FakeWriter {
        async fn write(&mut self, payload: String) -> Result<(), AppError> {
            if self.fail_writes {
                return Err(AppError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            let _ = self.events.send(SinkEvent::Payload(payload));
            Ok(())
        }

        async fn close(&mut self) -> Result<(), AppError> {
            let _ = self.events.send(SinkEvent::Closed);
            Ok(())
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SinkEvent>) -> SinkEvent {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for sink event")
            .expect("sink event channel closed")
    }

    #[tokio::test]
    async fn test_outbound_pump_drains_in_order_then_closes() {
        let (writer, mut events) = fake_writer(false);
        let (tx, rx) = mpsc::channel(8);

        let pump = tokio::spawn(outbound_pump(writer, rx));

        tx.send("one".to_string()).await.unwrap();
        tx.send("two".to_string()).await.unwrap();
        drop(tx);

        assert_eq!(next_event(&mut events).await, SinkEvent::Payload("one".into()));
        assert_eq!(next_event(&mut events).await, SinkEvent::Payload("two".into()));
        assert_eq!(next_event(&mut events).await, SinkEvent::Closed);

        pump.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_pump_stops_and_closes_on_write_failure() {
        let (writer, mut events) = fake_writer(true);
        let (tx, rx) = mpsc::channel(8);

        let pump = tokio::spawn(outbound_pump(writer, rx));

        // Outbox is still open, but the first failed write ends the pump.
        tx.send("lost".to_string()).await.unwrap();

        assert_eq!(next_event(&mut events).await, SinkEvent::Closed);
        pump.await.unwrap();
    }

    #[tokio::test]
    async fn test_inbound_reaches_other_member_but_not_sender() {
        let (handle, room) = Room::channel();
        let room_task = tokio::spawn(room.run());

        // An observer member registered directly with the room.
        let observer = SessionId::new();
        let (obs_tx, mut obs_rx) = mpsc::channel(8);
        handle.join(observer, obs_tx).await.unwrap();

        let (reader, script) = fake_reader();
        let (writer, mut sink_events) = fake_writer(false);
        let session = tokio::spawn(run_session(handle.clone(), reader, writer, 8));

        script.send(Ok(Some("hello".to_string()))).unwrap();

        let got = timeout(Duration::from_secs(1), obs_rx.recv())
            .await
            .expect("timed out waiting for fan-out")
            .expect("observer outbox closed early");
        assert_eq!(got, "hello");

        // A handle-injected payload reaches the session's own outbox.
        handle
            .submit_for_broadcast(None, "notice".to_string())
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut sink_events).await,
            SinkEvent::Payload("notice".into())
        );

        // End the session: the peer closes under the blocked read.
        drop(script);
        timeout(Duration::from_secs(1), session)
            .await
            .expect("session did not finish")
            .unwrap()
            .unwrap();

        // The session never received its own "hello".
        assert_eq!(next_event(&mut sink_events).await, SinkEvent::Closed);

        drop(handle);
        room_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_external_close_produces_leave_and_closes_outbox() {
        let (handle, room) = Room::channel();
        let room_task = tokio::spawn(room.run());

        let observer = SessionId::new();
        let (obs_tx, mut obs_rx) = mpsc::channel(8);
        handle.join(observer, obs_tx).await.unwrap();

        let (reader, script) = fake_reader();
        let (writer, mut sink_events) = fake_writer(false);
        let session = tokio::spawn(run_session(handle.clone(), reader, writer, 8));

        // Connection dies while the inbound pump is blocked on read.
        script
            .send(Err(AppError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            ))))
            .unwrap();

        timeout(Duration::from_secs(1), session)
            .await
            .expect("session did not finish after read error")
            .unwrap()
            .unwrap();

        // Outbox was closed by the leave, so the outbound pump shut the
        // connection.
        assert_eq!(next_event(&mut sink_events).await, SinkEvent::Closed);

        // The room no longer delivers to the departed session; only the
        // observer sees this broadcast.
        handle
            .submit_for_broadcast(None, "after".to_string())
            .await
            .unwrap();
        let got = timeout(Duration::from_secs(1), obs_rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("observer outbox closed early");
        assert_eq!(got, "after");
        assert!(sink_events.try_recv().is_err());

        drop(handle);
        room_task.await.unwrap();
    }
}
