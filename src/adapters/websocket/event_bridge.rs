//! Event bridge for callers without an open connection.
//!
//! HTTP handlers (or any other in-process caller) inject an event into a
//! live room as if a member had sent it over its socket.
//!
//! # Event Flow
//!
//! ```text
//! inject_event(room, user, type, value)
//!          │
//!          ▼
//! ┌────────────────────┐
//! │  DispatchTable     │  same lookup, elevated check
//! │  dispatch          │  and handler as the read pump
//! └────────────────────┘
//!          │ Broadcast(envelope)
//!          ▼
//! ┌────────────────────┐
//! │  Hub broadcast     │  rooms without members drop it;
//! └────────────────────┘  the state change stays persisted
//! ```

use crate::application::dispatch::{EventContext, EventRejection, HandlerOutcome};
use crate::domain::foundation::{RoomId, UserId};

use super::handler::RoomChannel;
use super::{broadcast_envelope, log_rejection};

/// Injects events into one room kind's hub.
#[derive(Clone)]
pub struct ApiEventBridge {
    channel: RoomChannel,
}

impl ApiEventBridge {
    pub fn new(channel: RoomChannel) -> Self {
        Self { channel }
    }

    /// Dispatches an event on behalf of `user_id` and broadcasts the result
    /// to the room's current members.
    ///
    /// A forced close has no connection to close and is treated as success.
    ///
    /// # Errors
    ///
    /// Returns the same [`EventRejection`] the read pump would log.
    pub async fn inject_event(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        event_type: &str,
        value: impl Into<String>,
    ) -> Result<(), EventRejection> {
        let ctx = EventContext::new(room_id.clone(), user_id.clone(), value);
        let outcome = self
            .channel
            .table()
            .dispatch(self.channel.directory(), event_type, ctx)
            .await
            .inspect_err(|rejection| log_rejection(rejection, room_id, user_id))?;

        match outcome {
            HandlerOutcome::Broadcast(envelope) => {
                broadcast_envelope(self.channel.hub(), room_id, &envelope);
            }
            HandlerOutcome::ForceClose(code) => {
                tracing::debug!(
                    room_id = %room_id,
                    user_id = %user_id,
                    close_code = code.code(),
                    "Injected event requested close without a connection"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::InMemoryIdentityResolver;
    use crate::adapters::memory::InMemoryRoomStore;
    use crate::adapters::websocket::handler::ChannelPorts;
    use crate::adapters::websocket::hub::Subscriber;
    use crate::application::handlers::{poker, DomainPorts};
    use crate::config::AppConfig;
    use crate::domain::foundation::RoomUser;
    use crate::domain::poker::PokerGame;
    use crate::domain::room::{Envelope, Room};
    use crate::ports::{RoomDirectory, StateRepository};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn room_id() -> RoomId {
        RoomId::new("game-1").unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn poker_bridge() -> (Arc<InMemoryRoomStore<PokerGame>>, RoomChannel) {
        let store = Arc::new(InMemoryRoomStore::<PokerGame>::new());
        store
            .insert_room(Room::new(room_id(), "Sprint 12"), [user("lead")])
            .unwrap();
        for id in ["lead", "dev"] {
            let member = RoomUser::registered(user(id), id);
            store.set_membership_active(&room_id(), &member, true).await.unwrap();
        }
        let table = poker::dispatch_table(DomainPorts::new(store.clone(), store.clone())).unwrap();
        let config = AppConfig::default();
        let channel = RoomChannel::new(
            table,
            ChannelPorts {
                directory: store.clone(),
                state: store.clone(),
                identity: Arc::new(InMemoryIdentityResolver::new()),
            },
            config.hub,
            config.auth,
        );
        (store, channel)
    }

    #[tokio::test]
    async fn injected_event_reaches_room_members() {
        let (_store, channel) = poker_bridge().await;
        let (tx, mut rx) = mpsc::channel(8);
        channel.hub().register(Subscriber::new(room_id(), user("dev"), tx), None);

        channel
            .bridge()
            .inject_event(&room_id(), &user("lead"), "activate_story", r#"{"name":"Login"}"#)
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        let envelope = Envelope::parse(&frame).unwrap();
        assert_eq!(envelope.event_type, poker::STORY_ACTIVATED);
        assert_eq!(envelope.user_id, "lead");
    }

    #[tokio::test]
    async fn injected_event_without_members_still_applies() {
        let (store, channel) = poker_bridge().await;

        channel
            .bridge()
            .inject_event(&room_id(), &user("lead"), "activate_story", r#"{"name":"Login"}"#)
            .await
            .unwrap();

        assert!(store.load(&room_id()).await.unwrap().is_voting_open());
        assert!(channel.hub().active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn event_injected_into_empty_room_is_not_replayed_to_later_members() {
        let (_store, channel) = poker_bridge().await;
        let bridge = channel.bridge();
        bridge
            .inject_event(&room_id(), &user("lead"), "activate_story", r#"{"name":"Login"}"#)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        channel.hub().register(Subscriber::new(room_id(), user("dev"), tx), None);
        bridge
            .inject_event(&room_id(), &user("dev"), "vote", r#"{"points":"3"}"#)
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(Envelope::parse(&frame).unwrap().event_type, poker::VOTE_ACTIVITY);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn injected_event_runs_elevated_check() {
        let (_store, channel) = poker_bridge().await;

        let err = channel
            .bridge()
            .inject_event(&room_id(), &user("dev"), "end_voting", "")
            .await
            .unwrap_err();

        assert!(matches!(err, EventRejection::Unauthorized(_)));
    }

    #[tokio::test]
    async fn reserved_and_unknown_types_are_rejected() {
        let (_store, channel) = poker_bridge().await;
        let bridge = channel.bridge();

        for event_type in ["auth_poker", "launch_rocket"] {
            let err = bridge
                .inject_event(&room_id(), &user("lead"), event_type, "")
                .await
                .unwrap_err();
            assert!(matches!(err, EventRejection::UnknownEventType(_)));
        }
    }

    #[tokio::test]
    async fn injected_abandon_is_not_an_error() {
        let (store, channel) = poker_bridge().await;

        channel
            .bridge()
            .inject_event(&room_id(), &user("dev"), "abandon_game", "")
            .await
            .unwrap();

        let row = store.get_membership(&room_id(), &user("dev")).await.unwrap().unwrap();
        assert!(row.abandoned);
    }
}
