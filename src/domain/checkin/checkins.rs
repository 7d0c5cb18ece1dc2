//! Daily stand-up check-ins with threaded comments.
//!
//! Each member posts at most one check-in per UTC day. Only the author may
//! edit a check-in; the author or a facilitator may delete it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{DomainError, ErrorCode, ItemId, Timestamp, UserId};
use crate::domain::room::RoomState;

/// Fields a member submits when creating or editing a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckinDraft {
    pub yesterday: String,
    pub today: String,
    pub blockers: String,
    pub discuss: String,
    pub goals_met: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: ItemId,
    pub user_id: UserId,
    pub comment: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: ItemId,
    pub user_id: UserId,
    pub yesterday: String,
    pub today: String,
    pub blockers: String,
    pub discuss: String,
    pub goals_met: bool,
    pub created_at: Timestamp,
    pub comments: Vec<Comment>,
}

/// Check-ins posted to one team room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamCheckins {
    checkins: Vec<Checkin>,
}

impl TeamCheckins {
    pub fn checkins(&self) -> &[Checkin] {
        &self.checkins
    }

    /// Posts a check-in for `author`, dated `now`.
    pub fn create(
        &mut self,
        author: &UserId,
        draft: CheckinDraft,
        now: Timestamp,
    ) -> Result<&Checkin, DomainError> {
        let already_posted = self
            .checkins
            .iter()
            .any(|checkin| &checkin.user_id == author && checkin.created_at.same_day(&now));
        if already_posted {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Already checked in today",
            ));
        }
        self.checkins.push(Checkin {
            id: ItemId::new(),
            user_id: author.clone(),
            yesterday: draft.yesterday,
            today: draft.today,
            blockers: draft.blockers,
            discuss: draft.discuss,
            goals_met: draft.goals_met,
            created_at: now,
            comments: Vec::new(),
        });
        Ok(&self.checkins[self.checkins.len() - 1])
    }

    pub fn update(
        &mut self,
        checkin_id: ItemId,
        requester: &UserId,
        draft: CheckinDraft,
    ) -> Result<&Checkin, DomainError> {
        let checkin = self.find_mut(checkin_id)?;
        if &checkin.user_id != requester {
            return Err(DomainError::forbidden("Only the author can edit a check-in"));
        }
        checkin.yesterday = draft.yesterday;
        checkin.today = draft.today;
        checkin.blockers = draft.blockers;
        checkin.discuss = draft.discuss;
        checkin.goals_met = draft.goals_met;
        Ok(&*checkin)
    }

    pub fn delete(
        &mut self,
        checkin_id: ItemId,
        requester: &UserId,
        is_facilitator: bool,
    ) -> Result<(), DomainError> {
        let position = self
            .checkins
            .iter()
            .position(|checkin| checkin.id == checkin_id)
            .ok_or_else(|| DomainError::item_not_found(checkin_id))?;
        if !is_facilitator && &self.checkins[position].user_id != requester {
            return Err(DomainError::forbidden(
                "Only the author or a facilitator can delete a check-in",
            ));
        }
        self.checkins.remove(position);
        Ok(())
    }

    pub fn add_comment(
        &mut self,
        checkin_id: ItemId,
        author: &UserId,
        comment: &str,
    ) -> Result<&Comment, DomainError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(DomainError::invalid_value("Comment cannot be empty"));
        }
        let checkin = self.find_mut(checkin_id)?;
        checkin.comments.push(Comment {
            id: ItemId::new(),
            user_id: author.clone(),
            comment: comment.to_string(),
            created_at: Timestamp::now(),
        });
        Ok(&checkin.comments[checkin.comments.len() - 1])
    }

    fn find_mut(&mut self, checkin_id: ItemId) -> Result<&mut Checkin, DomainError> {
        self.checkins
            .iter_mut()
            .find(|checkin| checkin.id == checkin_id)
            .ok_or_else(|| DomainError::item_not_found(checkin_id))
    }
}

impl RoomState for TeamCheckins {
    fn view(&self) -> Value {
        json!({ "checkins": self.checkins })
    }
}
