//! Estimation game (planning poker) domain.

mod game;

pub use game::{ActiveStory, PokerGame, VoteResult, DEFAULT_POINT_VALUES};
