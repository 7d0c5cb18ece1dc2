//! Domain layer: identities, room primitives, and per-domain room state.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, errors, resolved users, timestamps)
//! - `room` - Envelope, close codes, room kinds, membership rows
//! - `poker` - Estimation game
//! - `retro` - Retrospective board
//! - `storyboard` - Story map of goals and stories
//! - `checkin` - Asynchronous team check-ins

pub mod checkin;
pub mod foundation;
pub mod poker;
pub mod retro;
pub mod room;
pub mod storyboard;
