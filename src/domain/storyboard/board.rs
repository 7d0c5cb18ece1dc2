//! Story map: goals, each holding an ordered list of stories.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{DomainError, ItemId};
use crate::domain::room::RoomState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: ItemId,
    pub name: String,
    pub content: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: ItemId,
    pub name: String,
    pub stories: Vec<Story>,
}

/// Partial update of a story; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryUpdate {
    pub name: Option<String>,
    pub content: Option<String>,
    pub points: Option<u32>,
}

/// Storyboard for one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storyboard {
    goals: Vec<Goal>,
}

impl Storyboard {
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn add_goal(&mut self, name: &str) -> Result<ItemId, DomainError> {
        let name = required(name, "Goal name cannot be empty")?;
        let id = ItemId::new();
        self.goals.push(Goal {
            id,
            name,
            stories: Vec::new(),
        });
        Ok(id)
    }

    /// Removes a goal together with its stories.
    pub fn delete_goal(&mut self, goal_id: ItemId) -> Result<(), DomainError> {
        let before = self.goals.len();
        self.goals.retain(|goal| goal.id != goal_id);
        if self.goals.len() == before {
            return Err(DomainError::item_not_found(goal_id));
        }
        Ok(())
    }

    pub fn add_story(&mut self, goal_id: ItemId, name: &str) -> Result<ItemId, DomainError> {
        let name = required(name, "Story name cannot be empty")?;
        let goal = self
            .goals
            .iter_mut()
            .find(|goal| goal.id == goal_id)
            .ok_or_else(|| DomainError::item_not_found(goal_id))?;
        let id = ItemId::new();
        goal.stories.push(Story {
            id,
            name,
            content: String::new(),
            points: 0,
        });
        Ok(id)
    }

    pub fn update_story(&mut self, story_id: ItemId, update: StoryUpdate) -> Result<&Story, DomainError> {
        if let Some(name) = &update.name {
            required(name, "Story name cannot be empty")?;
        }
        let story = self.story_mut(story_id)?;
        if let Some(name) = update.name {
            story.name = name.trim().to_string();
        }
        if let Some(content) = update.content {
            story.content = content;
        }
        if let Some(points) = update.points {
            story.points = points;
        }
        Ok(&*story)
    }

    pub fn delete_story(&mut self, story_id: ItemId) -> Result<(), DomainError> {
        for goal in &mut self.goals {
            if let Some(position) = goal.stories.iter().position(|story| story.id == story_id) {
                goal.stories.remove(position);
                return Ok(());
            }
        }
        Err(DomainError::item_not_found(story_id))
    }

    fn story_mut(&mut self, story_id: ItemId) -> Result<&mut Story, DomainError> {
        self.goals
            .iter_mut()
            .flat_map(|goal| goal.stories.iter_mut())
            .find(|story| story.id == story_id)
            .ok_or_else(|| DomainError::item_not_found(story_id))
    }
}

fn required(value: &str, message: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::invalid_value(message));
    }
    Ok(value.to_string())
}

impl RoomState for Storyboard {
    fn view(&self) -> Value {
        json!({ "goals": self.goals })
    }
}
