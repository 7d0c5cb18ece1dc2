//! Application layer - event dispatch and domain handlers.
//!
//! Handlers translate a client event into a state change through the
//! ports, then describe what the caller should broadcast.

pub mod dispatch;
pub mod handlers;

pub use dispatch::{
    BoxedHandler, DispatchTable, DispatchTableBuilder, EventContext, EventRejection,
    HandlerOutcome, HandlerResult, TableError,
};
pub use handlers::DomainPorts;
