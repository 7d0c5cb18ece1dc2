//! Estimation game state.
//!
//! A facilitator activates a story, members vote with one of the allowed
//! point values, and ending the vote reveals every ballot at once. Until
//! then only the list of voters is visible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{DomainError, ErrorCode, ItemId, UserId};
use crate::domain::room::RoomState;

/// Point values offered when the game does not configure its own.
pub const DEFAULT_POINT_VALUES: [&str; 12] = [
    "0", "1/2", "1", "2", "3", "5", "8", "13", "20", "40", "100", "?",
];

/// Story currently being estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStory {
    pub id: ItemId,
    pub name: String,
}

/// A revealed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    pub user_id: UserId,
    pub points: String,
}

/// Planning poker game for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokerGame {
    point_values: Vec<String>,
    active_story: Option<ActiveStory>,
    voting_open: bool,
    votes: BTreeMap<UserId, String>,
}

impl Default for PokerGame {
    fn default() -> Self {
        Self::with_point_values(DEFAULT_POINT_VALUES.iter().map(|v| v.to_string()).collect())
    }
}

impl PokerGame {
    /// Creates a game restricted to the given point values.
    pub fn with_point_values(point_values: Vec<String>) -> Self {
        Self {
            point_values,
            active_story: None,
            voting_open: false,
            votes: BTreeMap::new(),
        }
    }

    pub fn active_story(&self) -> Option<&ActiveStory> {
        self.active_story.as_ref()
    }

    pub fn is_voting_open(&self) -> bool {
        self.voting_open
    }

    /// Starts estimation of a new story, discarding previous ballots.
    pub fn activate_story(&mut self, name: &str) -> Result<&ActiveStory, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_value("Story name cannot be empty"));
        }
        self.votes.clear();
        self.voting_open = true;
        Ok(&*self.active_story.insert(ActiveStory {
            id: ItemId::new(),
            name: name.to_string(),
        }))
    }

    /// Records or replaces a member's ballot.
    pub fn record_vote(&mut self, user_id: &UserId, points: &str) -> Result<(), DomainError> {
        self.ensure_voting_open()?;
        if !self.point_values.iter().any(|allowed| allowed == points) {
            return Err(DomainError::invalid_value("Point value not allowed")
                .with_detail("points", points));
        }
        self.votes.insert(user_id.clone(), points.to_string());
        Ok(())
    }

    /// Removes a member's ballot. Returns false when there was none.
    pub fn retract_vote(&mut self, user_id: &UserId) -> Result<bool, DomainError> {
        self.ensure_voting_open()?;
        Ok(self.votes.remove(user_id).is_some())
    }

    /// Closes voting and returns every ballot.
    pub fn end_voting(&mut self) -> Result<Vec<VoteResult>, DomainError> {
        self.ensure_voting_open()?;
        self.voting_open = false;
        Ok(self.results())
    }

    /// Members who have cast a ballot, without their points.
    pub fn voters(&self) -> Vec<UserId> {
        self.votes.keys().cloned().collect()
    }

    fn results(&self) -> Vec<VoteResult> {
        self.votes
            .iter()
            .map(|(user_id, points)| VoteResult {
                user_id: user_id.clone(),
                points: points.clone(),
            })
            .collect()
    }

    fn ensure_voting_open(&self) -> Result<(), DomainError> {
        if self.voting_open {
            Ok(())
        } else {
            Err(DomainError::new(ErrorCode::VotingClosed, "Voting is not open"))
        }
    }
}

impl RoomState for PokerGame {
    fn view(&self) -> Value {
        let results = if self.voting_open || self.active_story.is_none() {
            Vec::new()
        } else {
            self.results()
        };
        json!({
            "pointValues": self.point_values,
            "activeStory": self.active_story,
            "votingOpen": self.voting_open,
            "voters": self.voters(),
            "results": results,
        })
    }
}
