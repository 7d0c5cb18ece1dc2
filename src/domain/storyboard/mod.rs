//! Storyboard (story mapping) domain.

mod board;

pub use board::{Goal, Story, StoryUpdate, Storyboard};
