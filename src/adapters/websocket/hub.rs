//! Room hub: the single owner of room membership.
//!
//! Every membership change and every broadcast for one room kind is a
//! command processed, one at a time, by a dedicated task. Nothing else
//! touches the membership map.
//!
//! # Architecture
//!
//! ```text
//!  read pumps ─┐                     ┌─► queue(sub-a) ─► write pump a
//!  auth gate  ─┼─► HubCommand ─► Hub ┼─► queue(sub-b) ─► write pump b
//!  api bridge ─┘   (unbounded)       └─► queue(sub-c) ─► write pump c
//!
//! Room: retro-42         Room: retro-77
//! ├── sub-a              └── sub-c
//! └── sub-b
//! ```
//!
//! The hub holds the only sender of each outbound queue. Removing a
//! subscriber from the map drops that sender, which closes the queue
//! exactly once; the write pump then drains what is left and sends a close
//! frame.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::foundation::{RoomId, UserId};
use crate::domain::room::{Payload, RoomKind};

/// Unique identifier for one admitted connection.
///
/// A user may reconnect; each connection gets a fresh id so a late
/// unregister from the old connection never removes the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connection bound to a (room, user) pair, as registered with the hub.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    room_id: RoomId,
    user_id: UserId,
    queue: mpsc::Sender<Payload>,
}

impl Subscriber {
    /// Binds a new connection; `queue` is the sending half of its outbound queue.
    pub fn new(room_id: RoomId, user_id: UserId, queue: mpsc::Sender<Payload>) -> Self {
        Self {
            id: SubscriberId::new(),
            room_id,
            user_id,
            queue,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

struct Entry {
    user_id: UserId,
    queue: mpsc::Sender<Payload>,
}

/// Membership map plus the operations on it.
///
/// Owned by exactly one [`Hub`] task. Kept free of async so the ordering
/// and cleanup invariants can be checked without a runtime.
#[derive(Default)]
pub(crate) struct RoomRegistry {
    rooms: HashMap<RoomId, HashMap<SubscriberId, Entry>>,
}

impl RoomRegistry {
    /// Adds a subscriber, first enqueueing `greeting` ahead of any broadcast.
    ///
    /// Returns false when the greeting did not fit; the subscriber is then
    /// dropped, which closes its queue.
    pub(crate) fn register(&mut self, subscriber: Subscriber, greeting: Option<Payload>) -> bool {
        let Subscriber {
            id,
            room_id,
            user_id,
            queue,
        } = subscriber;

        if let Some(greeting) = greeting {
            if queue.try_send(greeting).is_err() {
                tracing::warn!(
                    room_id = %room_id,
                    user_id = %user_id,
                    subscriber_id = %id,
                    "Outbound queue rejected greeting, dropping subscriber"
                );
                return false;
            }
        }

        self.rooms
            .entry(room_id)
            .or_default()
            .insert(id, Entry { user_id, queue });
        true
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub(crate) fn unregister(&mut self, room_id: &RoomId, id: &SubscriberId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(id).is_some();
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Enqueues `payload` for every member of the room without waiting.
    ///
    /// Members whose queue is full or closed are evicted on the spot.
    /// Returns the number of queues the payload reached.
    pub(crate) fn broadcast(&mut self, room_id: &RoomId, payload: &Payload) -> usize {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return 0;
        };

        let mut delivered = 0;
        members.retain(|id, entry| match entry.queue.try_send(payload.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    room_id = %room_id,
                    user_id = %entry.user_id,
                    subscriber_id = %id,
                    "Outbound queue full, evicting slow subscriber"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    room_id = %room_id,
                    user_id = %entry.user_id,
                    subscriber_id = %id,
                    "Write pump gone, removing subscriber"
                );
                false
            }
        });

        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        delivered
    }

    pub(crate) fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, HashMap::len)
    }

    pub(crate) fn active_rooms(&self) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self.rooms.keys().cloned().collect();
        rooms.sort();
        rooms
    }
}

/// Requests processed by the hub task.
enum HubCommand {
    Register {
        subscriber: Subscriber,
        greeting: Option<Payload>,
    },
    Unregister {
        room_id: RoomId,
        subscriber_id: SubscriberId,
    },
    Broadcast {
        room_id: RoomId,
        payload: Payload,
    },
    MemberCount {
        room_id: RoomId,
        reply: oneshot::Sender<usize>,
    },
    ActiveRooms {
        reply: oneshot::Sender<Vec<RoomId>>,
    },
    Shutdown,
}

/// The hub task for one room kind.
pub struct Hub {
    kind: RoomKind,
    registry: RoomRegistry,
    commands: mpsc::UnboundedReceiver<HubCommand>,
}

impl Hub {
    /// Starts the hub task and returns a handle to it.
    ///
    /// The task ends on [`HubHandle::shutdown`] or when every handle is
    /// dropped; either way all outbound queues are closed.
    pub fn spawn(kind: RoomKind) -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let hub = Hub {
            kind,
            registry: RoomRegistry::default(),
            commands: rx,
        };
        tokio::spawn(hub.run());
        HubHandle { kind, commands: tx }
    }

    async fn run(mut self) {
        tracing::debug!(kind = %self.kind, "Room hub started");

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register {
                    subscriber,
                    greeting,
                } => {
                    let room_id = subscriber.room_id().clone();
                    let subscriber_id = subscriber.id();
                    if self.registry.register(subscriber, greeting) {
                        tracing::debug!(
                            kind = %self.kind,
                            room_id = %room_id,
                            subscriber_id = %subscriber_id,
                            members = self.registry.member_count(&room_id),
                            "Subscriber registered"
                        );
                    }
                }
                HubCommand::Unregister {
                    room_id,
                    subscriber_id,
                } => {
                    if self.registry.unregister(&room_id, &subscriber_id) {
                        tracing::debug!(
                            kind = %self.kind,
                            room_id = %room_id,
                            subscriber_id = %subscriber_id,
                            "Subscriber unregistered"
                        );
                    }
                }
                HubCommand::Broadcast { room_id, payload } => {
                    self.registry.broadcast(&room_id, &payload);
                }
                HubCommand::MemberCount { room_id, reply } => {
                    let _ = reply.send(self.registry.member_count(&room_id));
                }
                HubCommand::ActiveRooms { reply } => {
                    let _ = reply.send(self.registry.active_rooms());
                }
                HubCommand::Shutdown => break,
            }
        }

        let rooms = self.registry.active_rooms().len();
        tracing::info!(kind = %self.kind, rooms, "Room hub stopped, closing outbound queues");
    }
}

/// Cloneable entry point to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    kind: RoomKind,
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubHandle").field("kind", &self.kind).finish()
    }
}

impl HubHandle {
    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Registers a subscriber; `greeting` reaches its queue before any broadcast.
    ///
    /// Returns false when the hub has stopped.
    pub fn register(&self, subscriber: Subscriber, greeting: Option<Payload>) -> bool {
        self.send(HubCommand::Register {
            subscriber,
            greeting,
        })
    }

    /// Removes a subscriber. Safe to call more than once.
    pub fn unregister(&self, room_id: &RoomId, subscriber_id: SubscriberId) {
        self.send(HubCommand::Unregister {
            room_id: room_id.clone(),
            subscriber_id,
        });
    }

    /// Delivers `payload` to every current member of the room.
    pub fn broadcast(&self, room_id: &RoomId, payload: Payload) {
        self.send(HubCommand::Broadcast {
            room_id: room_id.clone(),
            payload,
        });
    }

    /// Number of registered subscribers in the room (0 if the hub stopped).
    pub async fn member_count(&self, room_id: &RoomId) -> usize {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::MemberCount {
            room_id: room_id.clone(),
            reply,
        });
        rx.await.unwrap_or(0)
    }

    /// Rooms with at least one subscriber, sorted.
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ActiveRooms { reply });
        rx.await.unwrap_or_default()
    }

    /// Stops the hub, closing every outbound queue.
    pub fn shutdown(&self) {
        self.send(HubCommand::Shutdown);
    }

    fn send(&self, command: HubCommand) -> bool {
        if self.commands.send(command).is_err() {
            tracing::debug!(kind = %self.kind, "Room hub is not running, command dropped");
            return false;
        }
        true
    }
}
