//! Asynchronous team check-in domain.

mod checkins;

pub use checkins::{Checkin, CheckinDraft, Comment, TeamCheckins};
