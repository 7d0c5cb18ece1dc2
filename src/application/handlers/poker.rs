//! Planning poker event handlers.
//!
//! | Event                 | Role        | Broadcast         |
//! |-----------------------|-------------|-------------------|
//! | `activate_story`      | facilitator | `story_activated` |
//! | `vote`                | member      | `vote_activity`   |
//! | `retract_vote`        | member      | `vote_retracted`  |
//! | `end_voting`          | facilitator | `voting_ended`    |
//! | `promote_leader`      | facilitator | `facilitators`    |
//! | `promote_leader_self` | member      | `facilitators`    |
//! | `abandon_game`        | member      | (closes 4002)     |

use serde::Deserialize;
use serde_json::json;

use super::shared::{self, broadcast, decode, DomainPorts};
use crate::application::dispatch::{DispatchTable, EventContext, HandlerResult, TableError};
use crate::domain::foundation::UserId;
use crate::domain::poker::PokerGame;
use crate::domain::room::RoomKind;

pub const STORY_ACTIVATED: &str = "story_activated";
pub const VOTE_ACTIVITY: &str = "vote_activity";
pub const VOTE_RETRACTED: &str = "vote_retracted";
pub const VOTING_ENDED: &str = "voting_ended";

type Ports = DomainPorts<PokerGame>;

/// Builds the poker dispatch table.
pub fn dispatch_table(ports: Ports) -> Result<DispatchTable, TableError> {
    DispatchTable::builder(RoomKind::Poker, ports)
        .on_elevated("activate_story", activate_story)
        .on("vote", vote)
        .on("retract_vote", retract_vote)
        .on_elevated("end_voting", end_voting)
        .on_elevated("promote_leader", promote_leader)
        .on("promote_leader_self", promote_leader_self)
        .on("abandon_game", abandon_game)
        .build()
}

#[derive(Deserialize)]
struct ActivateStory {
    name: String,
}

#[derive(Deserialize)]
struct Vote {
    points: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Promote {
    user_id: UserId,
}

async fn activate_story(ports: Ports, ctx: EventContext) -> HandlerResult {
    let ActivateStory { name } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |game| {
            let story = game.activate_story(&name)?;
            Ok(json!({ "activeStory": story }))
        })
        .await?;
    broadcast(STORY_ACTIVATED, &ctx, &output)
}

async fn vote(ports: Ports, ctx: EventContext) -> HandlerResult {
    let Vote { points } = decode(&ctx.value)?;
    let voter = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |game| {
            game.record_vote(&voter, &points)?;
            Ok(json!({ "voters": game.voters() }))
        })
        .await?;
    broadcast(VOTE_ACTIVITY, &ctx, &output)
}

async fn retract_vote(ports: Ports, ctx: EventContext) -> HandlerResult {
    let voter = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |game| {
            game.retract_vote(&voter)?;
            Ok(json!({ "voters": game.voters() }))
        })
        .await?;
    broadcast(VOTE_RETRACTED, &ctx, &output)
}

async fn end_voting(ports: Ports, ctx: EventContext) -> HandlerResult {
    let output = ports
        .modify(&ctx.room_id, |game| {
            let results = game.end_voting()?;
            Ok(json!({ "results": results }))
        })
        .await?;
    broadcast(VOTING_ENDED, &ctx, &output)
}

async fn promote_leader(ports: Ports, ctx: EventContext) -> HandlerResult {
    let Promote { user_id } = decode(&ctx.value)?;
    shared::promote(ports.directory.as_ref(), &ctx, &user_id).await
}

async fn promote_leader_self(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::promote_self(ports.directory.as_ref(), &ctx).await
}

async fn abandon_game(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::abandon(ports.directory.as_ref(), &ctx).await
}
