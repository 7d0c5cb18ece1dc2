//! Retrospective state: phased brainstorm items and action items.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{DomainError, ErrorCode, ItemId, Timestamp, UserId};
use crate::domain::room::RoomState;

/// Phases a retrospective moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetroPhase {
    #[default]
    Brainstorm,
    Group,
    Vote,
    ActionItems,
    Completed,
}

impl RetroPhase {
    /// Next phase, or `None` once completed.
    pub fn next(self) -> Option<RetroPhase> {
        match self {
            RetroPhase::Brainstorm => Some(RetroPhase::Group),
            RetroPhase::Group => Some(RetroPhase::Vote),
            RetroPhase::Vote => Some(RetroPhase::ActionItems),
            RetroPhase::ActionItems => Some(RetroPhase::Completed),
            RetroPhase::Completed => None,
        }
    }
}

/// Column a brainstorm item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Worked,
    Improve,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub content: String,
    pub author: UserId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: ItemId,
    pub content: String,
    pub completed: bool,
}

/// Retrospective for one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrospective {
    phase: RetroPhase,
    items: Vec<RetroItem>,
    actions: Vec<ActionItem>,
}

impl Retrospective {
    pub fn phase(&self) -> RetroPhase {
        self.phase
    }

    pub fn items(&self) -> &[RetroItem] {
        &self.items
    }

    pub fn actions(&self) -> &[ActionItem] {
        &self.actions
    }

    /// Adds a brainstorm item. Only allowed while brainstorming.
    pub fn add_item(
        &mut self,
        author: &UserId,
        kind: ItemKind,
        content: &str,
    ) -> Result<&RetroItem, DomainError> {
        if self.phase != RetroPhase::Brainstorm {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Items can only be added while brainstorming",
            ));
        }
        let content = non_empty(content, "Item content cannot be empty")?;
        self.items.push(RetroItem {
            id: ItemId::new(),
            kind,
            content,
            author: author.clone(),
            created_at: Timestamp::now(),
        });
        Ok(&self.items[self.items.len() - 1])
    }

    /// Deletes an item. Authors may delete their own; facilitators any.
    pub fn delete_item(
        &mut self,
        item_id: ItemId,
        requester: &UserId,
        is_facilitator: bool,
    ) -> Result<(), DomainError> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| DomainError::item_not_found(item_id))?;
        if !is_facilitator && &self.items[position].author != requester {
            return Err(DomainError::forbidden("Only the author or a facilitator can delete an item"));
        }
        self.items.remove(position);
        Ok(())
    }

    /// Moves to the next phase.
    pub fn advance_phase(&mut self) -> Result<RetroPhase, DomainError> {
        let next = self.phase.next().ok_or_else(|| {
            DomainError::new(ErrorCode::InvalidStateTransition, "Retrospective is already completed")
        })?;
        self.phase = next;
        Ok(next)
    }

    /// Records an action item. Only allowed in the action items phase.
    pub fn add_action(&mut self, content: &str) -> Result<&ActionItem, DomainError> {
        if self.phase != RetroPhase::ActionItems {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Action items can only be added in the action items phase",
            ));
        }
        let content = non_empty(content, "Action content cannot be empty")?;
        self.actions.push(ActionItem {
            id: ItemId::new(),
            content,
            completed: false,
        });
        Ok(&self.actions[self.actions.len() - 1])
    }
}

fn non_empty(value: &str, message: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::invalid_value(message));
    }
    Ok(value.to_string())
}

impl RoomState for Retrospective {
    fn view(&self) -> Value {
        json!({
            "phase": self.phase,
            "items": self.items,
            "actions": self.actions,
        })
    }
}
