//! Pieces shared by every domain's handler set.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::application::dispatch::{EventContext, HandlerOutcome, HandlerResult};
use crate::domain::foundation::{DomainError, RoomId, UserId};
use crate::domain::room::{CloseCode, Envelope, RoomState};
use crate::ports::{RoomDirectory, StateChange, StateRepository};

/// Broadcast after a facilitator promotion, carrying the facilitator ids.
pub const FACILITATORS: &str = "facilitators";

/// Collaborators a domain's handlers are built over.
pub struct DomainPorts<S> {
    pub directory: Arc<dyn RoomDirectory>,
    pub state: Arc<dyn StateRepository<S>>,
}

impl<S> DomainPorts<S> {
    pub fn new(directory: Arc<dyn RoomDirectory>, state: Arc<dyn StateRepository<S>>) -> Self {
        Self { directory, state }
    }
}

impl<S> Clone for DomainPorts<S> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: RoomState> DomainPorts<S> {
    /// Applies a change to the room's state and returns its output.
    pub async fn modify<F>(&self, room_id: &RoomId, change: F) -> Result<Value, DomainError>
    where
        F: FnOnce(&mut S) -> Result<Value, DomainError> + Send + 'static,
    {
        let change: StateChange<S> = Box::new(change);
        self.state.modify(room_id, change).await
    }
}

/// Decodes an event's `value` field.
pub fn decode<T: DeserializeOwned>(value: &str) -> Result<T, DomainError> {
    Ok(serde_json::from_str(value)?)
}

/// Wraps a payload in an envelope tagged with the acting user.
pub fn broadcast<T: Serialize>(event_type: &str, ctx: &EventContext, payload: &T) -> HandlerResult {
    let envelope = Envelope::with_json(event_type, payload)?.from_user(&ctx.user_id);
    Ok(HandlerOutcome::Broadcast(envelope))
}

/// Marks the membership abandoned and asks for the connection to close.
pub async fn abandon(directory: &dyn RoomDirectory, ctx: &EventContext) -> HandlerResult {
    directory.abandon_membership(&ctx.room_id, &ctx.user_id).await?;
    Ok(HandlerOutcome::ForceClose(CloseCode::Abandoned))
}

/// Promotes the acting user when `ctx.value` matches the room's facilitator code.
pub async fn promote_self(directory: &dyn RoomDirectory, ctx: &EventContext) -> HandlerResult {
    let room = directory.get_room(&ctx.room_id).await?;
    if !room.facilitator_code_matches(ctx.value.trim()) {
        return Err(DomainError::forbidden("Incorrect facilitator code"));
    }
    promote(directory, ctx, &ctx.user_id).await
}

/// Promotes `target` and broadcasts the refreshed facilitator list.
pub async fn promote(directory: &dyn RoomDirectory, ctx: &EventContext, target: &UserId) -> HandlerResult {
    directory.promote_facilitator(&ctx.room_id, target).await?;
    let facilitators: Vec<UserId> = directory
        .members(&ctx.room_id)
        .await?
        .into_iter()
        .filter(|member| member.facilitator)
        .map(|member| member.id)
        .collect();
    broadcast(FACILITATORS, ctx, &facilitators)
}
