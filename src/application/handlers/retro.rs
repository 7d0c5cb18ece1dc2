//! Retrospective event handlers.

use serde::Deserialize;
use serde_json::json;

use super::shared::{self, broadcast, decode, DomainPorts};
use crate::application::dispatch::{DispatchTable, EventContext, HandlerResult, TableError};
use crate::domain::foundation::ItemId;
use crate::domain::retro::{ItemKind, Retrospective};
use crate::domain::room::RoomKind;

pub const ITEMS_UPDATED: &str = "items_updated";
pub const PHASE_UPDATED: &str = "phase_updated";
pub const ACTIONS_UPDATED: &str = "actions_updated";

type Ports = DomainPorts<Retrospective>;

/// Builds the retrospective dispatch table.
pub fn dispatch_table(ports: Ports) -> Result<DispatchTable, TableError> {
    DispatchTable::builder(RoomKind::Retro, ports)
        .on("create_item", create_item)
        .on("delete_item", delete_item)
        .on_elevated("advance_phase", advance_phase)
        .on_elevated("create_action", create_action)
        .on("self_facilitate", self_facilitate)
        .on("abandon_retro", abandon_retro)
        .build()
}

#[derive(Deserialize)]
struct CreateItem {
    kind: ItemKind,
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteItem {
    item_id: ItemId,
}

#[derive(Deserialize)]
struct CreateAction {
    content: String,
}

async fn create_item(ports: Ports, ctx: EventContext) -> HandlerResult {
    let CreateItem { kind, content } = decode(&ctx.value)?;
    let author = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |retro| {
            retro.add_item(&author, kind, &content)?;
            Ok(json!({ "items": retro.items() }))
        })
        .await?;
    broadcast(ITEMS_UPDATED, &ctx, &output)
}

async fn delete_item(ports: Ports, ctx: EventContext) -> HandlerResult {
    let DeleteItem { item_id } = decode(&ctx.value)?;
    let is_facilitator = ports
        .directory
        .authorize_elevated(&ctx.room_id, &ctx.user_id)
        .await?;
    let requester = ctx.user_id.clone();
    let output = ports
        .modify(&ctx.room_id, move |retro| {
            retro.delete_item(item_id, &requester, is_facilitator)?;
            Ok(json!({ "items": retro.items() }))
        })
        .await?;
    broadcast(ITEMS_UPDATED, &ctx, &output)
}

async fn advance_phase(ports: Ports, ctx: EventContext) -> HandlerResult {
    let output = ports
        .modify(&ctx.room_id, |retro| {
            let phase = retro.advance_phase()?;
            Ok(json!({ "phase": phase }))
        })
        .await?;
    broadcast(PHASE_UPDATED, &ctx, &output)
}

async fn create_action(ports: Ports, ctx: EventContext) -> HandlerResult {
    let CreateAction { content } = decode(&ctx.value)?;
    let output = ports
        .modify(&ctx.room_id, move |retro| {
            retro.add_action(&content)?;
            Ok(json!({ "actions": retro.actions() }))
        })
        .await?;
    broadcast(ACTIONS_UPDATED, &ctx, &output)
}

async fn self_facilitate(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::promote_self(ports.directory.as_ref(), &ctx).await
}

async fn abandon_retro(ports: Ports, ctx: EventContext) -> HandlerResult {
    shared::abandon(ports.directory.as_ref(), &ctx).await
}
