//! Team check-in event handlers.

use serde::Deserialize;
use serde_json::json;

use super::shared::{broadcast, decode, DomainPorts};
use crate::application::dispatch::{DispatchTable, EventContext, HandlerResult, TableError};
use crate::domain::checkin::{CheckinDraft, TeamCheckins};
use crate::domain::foundation::{ItemId, Timestamp};
use crate::domain::room::RoomKind;

pub const CHECKINS_UPDATED: &str = "checkins_updated";

type Ports = DomainPorts<TeamCheckins>;

/// Builds the check-in dispatch table.
pub fn dispatch_table(ports: Ports) -> Result<DispatchTable, TableError> {
    DispatchTable::builder(RoomKind::Checkin, ports)
        .on("checkin_create", checkin_create)
        .on("checkin_update", checkin_update)
        .on("checkin_delete", checkin_delete)
        .on("comment_create", comment_create)
        .build()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditCheckin {
    checkin_id: ItemId,
    #[serde(flatten)]
    draft: CheckinDraft,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckinRef {
    checkin_id: ItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewComment {
    checkin_id: ItemId,
    comment: String,
}

fn checkins(team: &TeamCheckins) -> serde_json::Value {
    json!({ "checkins": team.checkins() })
}

async fn checkin_create(ports: Ports, ctx: EventContext) -> HandlerResult {
    let draft: CheckinDraft = decode(&ctx.value)?;
    let author = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |team| {
            team.create(&author, draft, Timestamp::now())?;
            Ok(checkins(team))
        })
        .await?;
    broadcast(CHECKINS_UPDATED, &ctx, &output)
}

async fn checkin_update(ports: Ports, ctx: EventContext) -> HandlerResult {
    let EditCheckin { checkin_id, draft } = decode(&ctx.value)?;
    let requester = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |team| {
            team.update(checkin_id, &requester, draft)?;
            Ok(checkins(team))
        })
        .await?;
    broadcast(CHECKINS_UPDATED, &ctx, &output)
}

async fn checkin_delete(ports: Ports, ctx: EventContext) -> HandlerResult {
    let CheckinRef { checkin_id } = decode(&ctx.value)?;
    let is_facilitator = ports
        .directory
        .authorize_elevated(&ctx.room_id, &ctx.user_id)
        .await?;
    let requester = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |team| {
            team.delete(checkin_id, &requester, is_facilitator)?;
            Ok(checkins(team))
        })
        .await?;
    broadcast(CHECKINS_UPDATED, &ctx, &output)
}

async fn comment_create(ports: Ports, ctx: EventContext) -> HandlerResult {
    let NewComment {
        checkin_id,
        comment,
    } = decode(&ctx.value)?;
    let author = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |team| {
            team.add_comment(checkin_id, &author, &comment)?;
            Ok(checkins(team))
        })
        .await?;
    broadcast(CHECKINS_UPDATED, &ctx, &output)
}
