//! Storyboard event handlers.
//!
//! Every successful change broadcasts the full goal list, so clients can
//! replace their board wholesale.

use serde::Deserialize;
use serde_json::json;

use super::shared::{self, broadcast, decode, DomainPorts};
use crate::application::dispatch::{DispatchTable, EventContext, HandlerResult, TableError};
use crate::domain::foundation::ItemId;
use crate::domain::room::RoomKind;
use crate::domain::storyboard::{StoryUpdate, Storyboard};

pub const GOALS_UPDATED: &str = "goals_updated";

type Ports = DomainPorts<Storyboard>;

/// Builds the storyboard dispatch table.
pub fn dispatch_table(ports: Ports) -> Result<DispatchTable, TableError> {
    DispatchTable::builder(RoomKind::Storyboard, ports)
        .on_elevated("add_goal", add_goal)
        .on_elevated("delete_goal", delete_goal)
        .on("add_story", add_story)
        .on("update_story", update_story)
        .on("delete_story", delete_story)
        .on("facilitator_self", facilitator_self)
        .on("abandon_storyboard", abandon_storyboard)
        .build()
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalRef {
    goal_id: ItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewStory {
    goal_id: ItemId,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryRef {
    story_id: ItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditStory {
    story_id: ItemId,
    #[serde(flatten)]
    update: StoryUpdate,
}

fn goals(board: &Storyboard) -> serde_json::Value {
    json!({ "goals": board.goals() })
}

async fn add_goal(ports: Ports, ctx: EventContext) -> HandlerResult {
    let Named { name } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |board| {
            board.add_goal(&name)?;
            Ok(goals(board))
        })
        .await?;
    broadcast(GOALS_UPDATED, &ctx, &output)
}

async fn delete_goal(ports: Ports, ctx: EventContext) -> HandlerResult {
    let GoalRef { goal_id } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |board| {
            board.delete_goal(goal_id)?;
            Ok(goals(board))
        })
        .await?;
    broadcast(GOALS_UPDATED, &ctx, &output)
}

async fn add_story(ports: Ports, ctx: EventContext) -> HandlerResult {
    let NewStory { goal_id, name } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |board| {
            board.add_story(goal_id, &name)?;
            Ok(goals(board))
        })
        .await?;
    broadcast(GOALS_UPDATED, &ctx, &output)
}

async fn update_story(ports: Ports, ctx: EventContext) -> HandlerResult {
    let EditStory { story_id, update } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |board| {
            board.update_story(story_id, update)?;
            Ok(goals(board))
        })
        .await?;
    broadcast(GOALS_UPDATED, &ctx, &output)
}

async fn delete_story(ports: Ports, ctx: EventContext) -> HandlerResult {
    let StoryRef { story_id } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |board| {
            board.delete_story(story_id)?;
            Ok(goals(board))
        })
        .await?;
    broadcast(GOALS_UPDATED, &ctx, &output)
}

async fn facilitator_self(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::promote_self(ports.directory.as_ref(), &ctx).await
}

async fn abandon_storyboard(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::abandon(ports.directory.as_ref(), &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRoomStore;
    use crate::application::dispatch::{EventRejection, HandlerOutcome};
    use crate::domain::foundation::{RoomId, RoomUser, UserId};
    use crate::domain::room::Room;
    use crate::ports::{RoomDirectory, StateRepository};
    use std::sync::Arc;

    fn room_id() -> RoomId {
        RoomId::new("board-1").unwrap()
    }

    async fn setup() -> (Arc<InMemoryRoomStore<Storyboard>>, DispatchTable) {
        let store = Arc::new(InMemoryRoomStore::<Storyboard>::new());
        let owner = UserId::new("owner").unwrap();
        store
            .insert_room(Room::new(room_id(), "Q3 roadmap"), [owner])
            .unwrap();
        for id in ["owner", "dev"] {
            let member = RoomUser::registered(UserId::new(id).unwrap(), id);
            store.set_membership_active(&room_id(), &member, true).await.unwrap();
        }
        let table = dispatch_table(DomainPorts::new(store.clone(), store.clone())).unwrap();
        (store, table)
    }

    async fn send(
        store: &InMemoryRoomStore<Storyboard>,
        table: &DispatchTable,
        user: &str,
        event_type: &str,
        value: String,
    ) -> Result<HandlerOutcome, EventRejection> {
        let ctx = EventContext::new(room_id(), UserId::new(user).unwrap(), value);
        table.dispatch(store, event_type, ctx).await
    }

    #[tokio::test]
    async fn goals_are_facilitator_only() {
        let (store, table) = setup().await;
        let result = send(&store, &table, "dev", "add_goal", r#"{"name":"Onboarding"}"#.into()).await;
        assert!(matches!(result, Err(EventRejection::Unauthorized(_))));
    }

    #[tokio::test]
    async fn members_edit_stories_under_goals() {
        let (store, table) = setup().await;
        send(&store, &table, "owner", "add_goal", r#"{"name":"Onboarding"}"#.into())
            .await
            .unwrap();
        let goal_id = store.load(&room_id()).await.unwrap().goals()[0].id;

        send(
            &store,
            &table,
            "dev",
            "add_story",
            format!(r#"{{"goalId":"{goal_id}","name":"Sign up"}}"#),
        )
        .await
        .unwrap();
        let story_id = store.load(&room_id()).await.unwrap().goals()[0].stories[0].id;

        let outcome = send(
            &store,
            &table,
            "dev",
            "update_story",
            format!(r#"{{"storyId":"{story_id}","points":3}}"#),
        )
        .await
        .unwrap();

        match outcome {
            HandlerOutcome::Broadcast(env) => {
                assert_eq!(env.event_type, GOALS_UPDATED);
                let value: serde_json::Value = serde_json::from_str(&env.value).unwrap();
                assert_eq!(value["goals"][0]["stories"][0]["points"], 3);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        send(&store, &table, "dev", "delete_story", format!(r#"{{"storyId":"{story_id}"}}"#))
            .await
            .unwrap();
        assert!(store.load(&room_id()).await.unwrap().goals()[0].stories.is_empty());
    }

    #[tokio::test]
    async fn deleting_missing_goal_fails() {
        let (store, table) = setup().await;
        let value = format!(r#"{{"goalId":"{}"}}"#, ItemId::new());
        let result = send(&store, &table, "owner", "delete_goal", value).await;
        assert!(matches!(result, Err(EventRejection::HandlerFailed { .. })));
    }
}
