//! Admitted connection: registration, read pump, write pump and teardown.
//!
//! ```text
//!            ┌──────────── read pump (this task) ────────────┐
//! socket ──► │ frame ─► Envelope ─► DispatchTable ─► hub.broadcast
//!            └───────────────────────────────────────────────┘
//!            ┌──────────── write pump (spawned) ─────────────┐
//! socket ◄── │ outbound queue │ ping timer │ shutdown signal  │
//!            └───────────────────────────────────────────────┘
//! ```
//!
//! The read pump owns teardown. When it exits it signals the write pump,
//! unregisters from the hub, persists the inactive flag and announces the
//! departure to the rest of the room.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, timeout, timeout_at, Instant};

use super::handler::RoomChannel;
use super::hub::{Subscriber, SubscriberId};
use super::{broadcast_envelope, close_frame, log_rejection, text_frame};
use crate::application::dispatch::{EventContext, EventRejection, HandlerOutcome};
use crate::domain::foundation::{DomainError, RoomId, RoomUser};
use crate::domain::room::{CloseCode, Envelope, Payload, Room, INIT, MEMBER_JOINED, MEMBER_LEFT};
use crate::ports::RoomDirectory;

/// Why the read pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadExit {
    /// A handler asked for the connection to close with this code.
    Forced(CloseCode),
    /// Peer closed the socket or the transport failed.
    Disconnected,
    /// No keepalive acknowledgement within the idle timeout.
    IdleTimeout,
}

/// Per-connection identity shared by both pumps.
struct Session {
    channel: RoomChannel,
    room_id: RoomId,
    user: RoomUser,
    subscriber_id: SubscriberId,
}

/// Persists the membership, registers with the hub and runs both pumps
/// until the connection ends.
pub async fn admit(mut socket: WebSocket, channel: RoomChannel, user: RoomUser, room: Room) {
    let (init, joined) = match prepare(&channel, &user, &room).await {
        Ok(frames) => frames,
        Err(err) => {
            tracing::error!(
                room_id = %room.id,
                user_id = %user.id,
                error = %err,
                "Admission failed after screening"
            );
            release_membership(channel.directory(), &room.id, &user).await;
            let _ = socket.send(close_frame(CloseCode::InternalError)).await;
            return;
        }
    };

    let (queue_tx, queue_rx) = mpsc::channel(channel.hub_config().outbound_capacity);
    let subscriber = Subscriber::new(room.id.clone(), user.id.clone(), queue_tx);
    let subscriber_id = subscriber.id();

    if !channel.hub().register(subscriber, Some(init)) {
        release_membership(channel.directory(), &room.id, &user).await;
        let _ = socket.send(close_frame(CloseCode::GoingAway)).await;
        return;
    }
    channel.hub().broadcast(&room.id, joined);

    tracing::info!(
        kind = %channel.kind(),
        room_id = %room.id,
        user_id = %user.id,
        subscriber_id = %subscriber_id,
        "Member joined room"
    );

    let session = Session {
        channel,
        room_id: room.id,
        user,
        subscriber_id,
    };

    let (sink, stream) = socket.split();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let writer = tokio::spawn(write_pump(
        sink,
        queue_rx,
        shutdown_rx,
        WriteTiming::from_channel(&session.channel),
        session.room_id.clone(),
        subscriber_id,
    ));

    let exit = session.read_pump(stream).await;
    session.teardown(exit, shutdown_tx).await;

    if let Err(err) = writer.await {
        tracing::error!(subscriber_id = %subscriber_id, error = %err, "Write pump panicked");
    }
}

/// Marks the user active and builds the `init` and `member_joined` frames.
async fn prepare(
    channel: &RoomChannel,
    user: &RoomUser,
    room: &Room,
) -> Result<(Payload, Payload), DomainError> {
    let directory = channel.directory();
    directory.set_membership_active(&room.id, user, true).await?;

    let state = channel.state().state_view(&room.id).await?;
    let members = directory.members(&room.id).await?;

    let init = Envelope::with_json(
        INIT,
        &json!({
            "room": room,
            "state": state,
            "members": members,
        }),
    )?
    .from_user(&user.id);
    let joined = Envelope::with_json(MEMBER_JOINED, &members)?.from_user(&user.id);

    Ok((init.encode()?, joined.encode()?))
}

/// Persists the membership as inactive. Returns false (after logging) when
/// the collaborator refuses, in which case the user stays marked active.
async fn release_membership(directory: &dyn RoomDirectory, room_id: &RoomId, user: &RoomUser) -> bool {
    match directory.set_membership_active(room_id, user, false).await {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(
                room_id = %room_id,
                user_id = %user.id,
                error = %err,
                "Failed to persist inactive membership"
            );
            false
        }
    }
}

impl Session {
    async fn read_pump(&self, mut stream: SplitStream<WebSocket>) -> ReadExit {
        let idle = self.channel.hub_config().idle_timeout();
        let mut deadline = Instant::now() + idle;

        loop {
            let message = match timeout_at(deadline, stream.next()).await {
                Err(_) => return ReadExit::IdleTimeout,
                Ok(None) => return ReadExit::Disconnected,
                Ok(Some(Err(err))) => {
                    tracing::debug!(
                        subscriber_id = %self.subscriber_id,
                        error = %err,
                        "Read failed"
                    );
                    return ReadExit::Disconnected;
                }
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => {
                    if let Some(code) = self.handle_text(text.as_str()).await {
                        return ReadExit::Forced(code);
                    }
                }
                Message::Binary(_) => {
                    self.reject(&EventRejection::Malformed("binary frame".to_string()));
                }
                Message::Pong(_) => deadline = Instant::now() + idle,
                Message::Ping(_) => {}
                Message::Close(_) => return ReadExit::Disconnected,
            }
        }
    }

    /// Dispatches one text frame; returns a close code when the handler
    /// forces the connection closed.
    async fn handle_text(&self, text: &str) -> Option<CloseCode> {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                self.reject(&EventRejection::Malformed(err.to_string()));
                return None;
            }
        };

        let ctx = EventContext::new(self.room_id.clone(), self.user.id.clone(), envelope.value);
        let outcome = self
            .channel
            .table()
            .dispatch(self.channel.directory(), &envelope.event_type, ctx)
            .await;

        match outcome {
            Ok(HandlerOutcome::Broadcast(reply)) => {
                broadcast_envelope(self.channel.hub(), &self.room_id, &reply);
                None
            }
            Ok(HandlerOutcome::ForceClose(code)) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    user_id = %self.user.id,
                    event_type = %envelope.event_type,
                    close_code = code.code(),
                    "Handler closed connection"
                );
                Some(code)
            }
            Err(rejection) => {
                self.reject(&rejection);
                None
            }
        }
    }

    fn reject(&self, rejection: &EventRejection) {
        log_rejection(rejection, &self.room_id, &self.user.id);
    }

    async fn teardown(self, exit: ReadExit, shutdown: oneshot::Sender<Option<CloseCode>>) {
        let forced = match exit {
            ReadExit::Forced(code) => Some(code),
            ReadExit::Disconnected | ReadExit::IdleTimeout => None,
        };
        let _ = shutdown.send(forced);

        let hub = self.channel.hub();
        hub.unregister(&self.room_id, self.subscriber_id);

        let directory = self.channel.directory();
        if forced != Some(CloseCode::Abandoned) {
            release_membership(directory, &self.room_id, &self.user).await;
        }

        match directory.members(&self.room_id).await {
            Ok(members) => match Envelope::with_json(MEMBER_LEFT, &members) {
                Ok(left) => broadcast_envelope(hub, &self.room_id, &left.from_user(&self.user.id)),
                Err(err) => tracing::error!(error = %err, "Failed to encode member list"),
            },
            Err(err) => tracing::error!(
                room_id = %self.room_id,
                error = %err,
                "Failed to load members after departure"
            ),
        }

        tracing::info!(
            room_id = %self.room_id,
            user_id = %self.user.id,
            subscriber_id = %self.subscriber_id,
            reason = ?exit,
            "Member left room"
        );
    }
}

#[derive(Debug, Clone, Copy)]
struct WriteTiming {
    write_timeout: Duration,
    ping_period: Duration,
}

impl WriteTiming {
    fn from_channel(channel: &RoomChannel) -> Self {
        let config = channel.hub_config();
        Self {
            write_timeout: config.write_timeout(),
            ping_period: config.ping_period(),
        }
    }
}

/// Drains the outbound queue into the socket and sends keepalive pings.
///
/// Exits on a shutdown signal (writing the forced close code if any), on
/// queue closure (writing a normal close frame) or on any write failure.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Payload>,
    mut shutdown: oneshot::Receiver<Option<CloseCode>>,
    timing: WriteTiming,
    room_id: RoomId,
    subscriber_id: SubscriberId,
) {
    let mut ping = interval_at(Instant::now() + timing.ping_period, timing.ping_period);

    loop {
        let message = tokio::select! {
            biased;
            signal = &mut shutdown => {
                if let Ok(Some(code)) = signal {
                    let _ = timeout(timing.write_timeout, sink.send(close_frame(code))).await;
                }
                break;
            }
            next = queue.recv() => match next {
                Some(payload) => text_frame(&payload),
                None => {
                    tracing::debug!(
                        room_id = %room_id,
                        subscriber_id = %subscriber_id,
                        "Outbound queue closed"
                    );
                    let _ = timeout(timing.write_timeout, sink.send(close_frame(CloseCode::Normal))).await;
                    break;
                }
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match timeout(timing.write_timeout, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(subscriber_id = %subscriber_id, error = %err, "Write failed");
                break;
            }
            Err(_) => {
                tracing::warn!(subscriber_id = %subscriber_id, "Write timed out");
                break;
            }
        }
    }

    let _ = timeout(timing.write_timeout, sink.close()).await;
}
