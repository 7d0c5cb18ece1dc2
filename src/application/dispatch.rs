//! Event dispatch table.
//!
//! Each room kind owns one closed table mapping inbound event types to
//! handlers. Tables are built once at startup; an event type missing from
//! the table is rejected explicitly rather than ignored.
//!
//! ```text
//! Envelope{type,value} ──► lookup ──► elevated? ──► authorize_elevated
//!                            │                          │
//!                            ▼                          ▼
//!                    UnknownEventType              Unauthorized
//!                                                       │ ok
//!                                                       ▼
//!                                   handler(ctx) ──► Broadcast(Envelope)
//!                                                │
//!                                                └─► ForceClose(code)
//! ```
//!
//! The websocket read pump and the API event bridge both go through
//! [`DispatchTable::dispatch`], so an injected event is authorized and
//! handled exactly like one received from a socket.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::domain::foundation::{DomainError, RoomId, UserId};
use crate::domain::room::{CloseCode, Envelope, RoomKind};
use crate::ports::RoomDirectory;

/// Inputs available to every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub room_id: RoomId,
    pub user_id: UserId,
    /// Raw `value` field of the envelope; its shape is handler-specific.
    pub value: String,
}

impl EventContext {
    pub fn new(room_id: RoomId, user_id: UserId, value: impl Into<String>) -> Self {
        Self {
            room_id,
            user_id,
            value: value.into(),
        }
    }
}

/// What a successful handler asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Send this envelope to every member of the room.
    Broadcast(Envelope),
    /// Close the acting connection with this code; nothing is broadcast.
    ForceClose(CloseCode),
}

pub type HandlerResult = Result<HandlerOutcome, DomainError>;

/// Type-erased handler stored in the table.
pub type BoxedHandler = Arc<dyn Fn(EventContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Why an inbound event produced no broadcast.
///
/// None of these close the connection.
#[derive(Debug, Clone, Error)]
pub enum EventRejection {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("Event '{0}' requires an elevated role")]
    Unauthorized(String),

    #[error("Handler for '{event_type}' failed: {source}")]
    HandlerFailed {
        event_type: String,
        #[source]
        source: DomainError,
    },
}

impl EventRejection {
    /// True for failures worth an error-level log: the client did nothing
    /// wrong and a collaborator or handler broke.
    pub fn is_internal(&self) -> bool {
        match self {
            EventRejection::HandlerFailed { source, .. } => source.code().is_infrastructure(),
            _ => false,
        }
    }
}

/// Errors detected while building a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Event type '{0}' is reserved for the join-code challenge")]
    Reserved(String),

    #[error("Event type '{0}' registered twice")]
    Duplicate(String),
}

struct Route {
    handler: BoxedHandler,
    elevated: bool,
}

/// Closed mapping from event type to handler for one room kind.
pub struct DispatchTable {
    kind: RoomKind,
    routes: HashMap<&'static str, Route>,
}

impl DispatchTable {
    /// Starts a table whose handlers all receive a clone of `state`.
    pub fn builder<S>(kind: RoomKind, state: S) -> DispatchTableBuilder<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        DispatchTableBuilder {
            kind,
            state,
            routes: HashMap::new(),
            error: None,
        }
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.routes.contains_key(event_type)
    }

    /// Whether the event type runs the elevated-role check first.
    pub fn requires_elevation(&self, event_type: &str) -> bool {
        self.routes.get(event_type).is_some_and(|route| route.elevated)
    }

    /// Registered event types, sorted.
    pub fn event_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.routes.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Runs the lookup, the elevated-role check and the handler.
    pub async fn dispatch(
        &self,
        directory: &dyn RoomDirectory,
        event_type: &str,
        ctx: EventContext,
    ) -> Result<HandlerOutcome, EventRejection> {
        let route = self
            .routes
            .get(event_type)
            .ok_or_else(|| EventRejection::UnknownEventType(event_type.to_string()))?;

        if route.elevated {
            let allowed = directory
                .authorize_elevated(&ctx.room_id, &ctx.user_id)
                .await
                .map_err(|source| EventRejection::HandlerFailed {
                    event_type: event_type.to_string(),
                    source,
                })?;
            if !allowed {
                return Err(EventRejection::Unauthorized(event_type.to_string()));
            }
        }

        (route.handler)(ctx)
            .await
            .map_err(|source| EventRejection::HandlerFailed {
                event_type: event_type.to_string(),
                source,
            })
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("kind", &self.kind)
            .field("event_types", &self.event_types())
            .finish()
    }
}

/// Builder returned by [`DispatchTable::builder`].
pub struct DispatchTableBuilder<S> {
    kind: RoomKind,
    state: S,
    routes: HashMap<&'static str, Route>,
    error: Option<TableError>,
}

impl<S> DispatchTableBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Registers a handler any member may trigger.
    pub fn on<F, Fut>(self, event_type: &'static str, handler: F) -> Self
    where
        F: Fn(S, EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(event_type, handler, false)
    }

    /// Registers a handler that requires an elevated role.
    pub fn on_elevated<F, Fut>(self, event_type: &'static str, handler: F) -> Self
    where
        F: Fn(S, EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(event_type, handler, true)
    }

    pub fn build(self) -> Result<DispatchTable, TableError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(DispatchTable {
            kind: self.kind,
            routes: self.routes,
        })
    }

    fn route<F, Fut>(mut self, event_type: &'static str, handler: F, elevated: bool) -> Self
    where
        F: Fn(S, EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        if event_type == self.kind.auth_event_type() {
            self.error = Some(TableError::Reserved(event_type.to_string()));
            return self;
        }
        if self.routes.contains_key(event_type) {
            self.error = Some(TableError::Duplicate(event_type.to_string()));
            return self;
        }

        let state = self.state.clone();
        let boxed: BoxedHandler = Arc::new(move |ctx| handler(state.clone(), ctx).boxed());
        self.routes.insert(
            event_type,
            Route {
                handler: boxed,
                elevated,
            },
        );
        self
    }
}
