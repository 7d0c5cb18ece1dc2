//! Retrospective domain.

mod retrospective;

pub use retrospective::{ActionItem, ItemKind, RetroItem, RetroPhase, Retrospective};
