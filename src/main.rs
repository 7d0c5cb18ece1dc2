//! Development server for the room hub.
//!
//! Serves every room kind from in-memory collaborators seeded with one demo
//! room each. Connect with a `session=demo-alice` or `session=demo-bob`
//! cookie, or any `guest=<token>` cookie when anonymous guests are enabled.

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use roomhub::adapters::{room_router, ChannelPorts, InMemoryIdentityResolver, InMemoryRoomStore, RoomChannel};
use roomhub::application::dispatch::DispatchTable;
use roomhub::application::handlers::{checkin, poker, retro, storyboard, DomainPorts};
use roomhub::config::{AppConfig, LogFormat};
use roomhub::domain::foundation::{RoomId, RoomUser, UserId};
use roomhub::domain::room::{Room, RoomState};
use roomhub::ports::IdentityResolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    tracing::info!("Roomhub v{} starting", env!("CARGO_PKG_VERSION"));

    let identity: Arc<dyn IdentityResolver> = Arc::new(
        InMemoryIdentityResolver::new()
            .with_session("demo-alice", RoomUser::registered(UserId::new("alice")?, "Alice"))
            .with_session("demo-bob", RoomUser::registered(UserId::new("bob")?, "Bob"))
            .with_anonymous_guests(config.auth.allow_anonymous_guests),
    );

    let channels = vec![
        demo_channel(&config, &identity, "demo-poker", poker::dispatch_table)?,
        demo_channel(&config, &identity, "demo-retro", retro::dispatch_table)?,
        demo_channel(&config, &identity, "demo-storyboard", storyboard::dispatch_table)?,
        demo_channel(&config, &identity, "demo-checkin", checkin::dispatch_table)?,
    ];

    let app = room_router(&channels).layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    let hubs: Vec<_> = channels.iter().map(|channel| channel.hub().clone()).collect();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, closing rooms");
            for hub in &hubs {
                hub.shutdown();
            }
        })
        .await?;

    tracing::info!("Roomhub stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    match config.log_format() {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().with_env_filter(filter).init(),
    }
}

/// Builds one room kind over a fresh in-memory store holding a demo room.
///
/// The demo room asks first-time joiners for the code `JOIN` and lets
/// anyone who knows `LEAD` promote themselves; alice starts as facilitator.
fn demo_channel<S, B, E>(
    config: &AppConfig,
    identity: &Arc<dyn IdentityResolver>,
    room_id: &str,
    build: B,
) -> Result<RoomChannel, Box<dyn Error>>
where
    S: RoomState,
    B: FnOnce(DomainPorts<S>) -> Result<DispatchTable, E>,
    E: Error + 'static,
{
    let store = Arc::new(InMemoryRoomStore::<S>::new());
    let room = Room::new(RoomId::new(room_id)?, "Demo room")
        .with_join_code("JOIN")
        .with_facilitator_code("LEAD");
    store.insert_room(room, [UserId::new("alice")?])?;

    let table = build(DomainPorts::new(store.clone(), store.clone()))?;
    tracing::debug!(kind = %table.kind(), room_id, events = ?table.event_types(), "Seeded demo room");

    Ok(RoomChannel::new(
        table,
        ChannelPorts {
            directory: store.clone(),
            state: store,
            identity: Arc::clone(identity),
        },
        config.hub.clone(),
        config.auth.clone(),
    ))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
