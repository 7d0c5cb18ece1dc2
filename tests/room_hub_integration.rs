//! End-to-end tests for the room hub over real WebSocket connections.
//!
//! Each test binds the router on an ephemeral port and drives it with
//! tokio-tungstenite clients carrying session cookies:
//! 1. Admission refusals close with the documented codes
//! 2. The join-code challenge gates first-time joiners
//! 3. Events from one member reach every member of the room
//! 4. A forced close removes the member and announces the departure
//! 5. Keepalive and idle deadlines drop silent peers only

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use roomhub::adapters::{room_router, ChannelPorts, InMemoryIdentityResolver, InMemoryRoomStore, RoomChannel};
use roomhub::application::handlers::{poker, DomainPorts};
use roomhub::config::AppConfig;
use roomhub::domain::foundation::{RoomId, RoomUser, UserId};
use roomhub::domain::poker::PokerGame;
use roomhub::domain::room::{Envelope, Room};
use roomhub::ports::RoomDirectory;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ROOM: &str = "game-1";
const STEP: Duration = Duration::from_secs(5);

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    store: Arc<InMemoryRoomStore<PokerGame>>,
    channel: RoomChannel,
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn room_id() -> RoomId {
    RoomId::new(ROOM).unwrap()
}

/// Serve one poker room with alice as facilitator and bob as a regular user.
async fn start_server(room: Room) -> TestServer {
    start_server_with(room, AppConfig::default()).await
}

/// Same as [`start_server`] with a 2s idle timeout, so keepalive paths run.
async fn start_short_idle_server(room: Room) -> TestServer {
    let mut config = AppConfig::default();
    config.hub.idle_timeout_secs = 2;
    config.hub.write_timeout_secs = 1;
    config.validate().unwrap();
    start_server_with(room, config).await
}

async fn start_server_with(room: Room, config: AppConfig) -> TestServer {
    let store = Arc::new(InMemoryRoomStore::<PokerGame>::new());
    store.insert_room(room, [user("alice")]).unwrap();

    let identity = InMemoryIdentityResolver::new()
        .with_session("s-alice", RoomUser::registered(user("alice"), "Alice"))
        .with_session("s-bob", RoomUser::registered(user("bob"), "Bob"));

    let table = poker::dispatch_table(DomainPorts::new(store.clone(), store.clone())).unwrap();
    let channel = RoomChannel::new(
        table,
        ChannelPorts {
            directory: store.clone(),
            state: store.clone(),
            identity: Arc::new(identity),
        },
        config.hub,
        config.auth,
    );

    let app = room_router(std::slice::from_ref(&channel));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        addr,
        store,
        channel,
    }
}

async fn connect(addr: SocketAddr, room: &str, cookie: Option<&str>) -> Client {
    let mut request = format!("ws://{addr}/poker/room/{room}")
        .into_client_request()
        .unwrap();
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert("cookie", HeaderValue::from_str(cookie).unwrap());
    }
    let (ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    ws
}

async fn send(ws: &mut Client, event_type: &str, value: &str) {
    let frame = serde_json::json!({ "type": event_type, "value": value }).to_string();
    ws.send(Message::text(frame)).await.unwrap();
}

/// Next envelope, skipping keepalive frames. Panics on close.
async fn next_envelope(ws: &mut Client) -> Envelope {
    loop {
        let message = tokio::time::timeout(STEP, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("transport error");
        match message {
            Message::Text(text) => return Envelope::parse(text.as_str()).unwrap(),
            Message::Close(frame) => panic!("unexpected close: {frame:?}"),
            _ => continue,
        }
    }
}

/// Skips envelopes until one of the given type arrives.
async fn expect_event(ws: &mut Client, event_type: &str) -> Envelope {
    loop {
        let envelope = next_envelope(ws).await;
        if envelope.event_type == event_type {
            return envelope;
        }
    }
}

/// Reads until the server's close frame and returns its code.
async fn expect_close(ws: &mut Client) -> u16 {
    loop {
        let message = tokio::time::timeout(STEP, ws.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended without close frame")
            .expect("transport error");
        if let Message::Close(frame) = message {
            return frame.map(|f| u16::from(f.code)).unwrap_or(1005);
        }
    }
}

fn value_of(envelope: &Envelope) -> Value {
    serde_json::from_str(&envelope.value).unwrap()
}

/// Connects and consumes the admission frames for an ungated room.
async fn join(addr: SocketAddr, cookie: &str) -> Client {
    let mut ws = connect(addr, ROOM, Some(cookie)).await;
    assert_eq!(next_envelope(&mut ws).await.event_type, "init");
    assert_eq!(next_envelope(&mut ws).await.event_type, "member_joined");
    ws
}

async fn wait_for_members(channel: &RoomChannel, expected: usize) {
    for _ in 0..250 {
        if channel.hub().member_count(&room_id()).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("room never reached {expected} members");
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn missing_cookie_closes_with_4001() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut ws = connect(server.addr, ROOM, None).await;
    assert_eq!(expect_close(&mut ws).await, 4001);
}

#[tokio::test]
async fn unknown_session_closes_with_4001() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut ws = connect(server.addr, ROOM, Some("session=forged")).await;
    assert_eq!(expect_close(&mut ws).await, 4001);
}

#[tokio::test]
async fn unknown_room_closes_with_4004() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut ws = connect(server.addr, "game-404", Some("session=s-alice")).await;
    assert_eq!(expect_close(&mut ws).await, 4004);
}

#[tokio::test]
async fn second_connection_is_refused_and_first_keeps_working() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut first = join(server.addr, "session=s-alice").await;

    let mut second = connect(server.addr, ROOM, Some("session=s-alice")).await;
    assert_eq!(expect_close(&mut second).await, 4003);

    send(&mut first, "activate_story", r#"{"name":"Login"}"#).await;
    let activated = expect_event(&mut first, poker::STORY_ACTIVATED).await;
    assert_eq!(activated.user_id, "alice");
    assert_eq!(server.channel.hub().member_count(&room_id()).await, 1);
}

#[tokio::test]
async fn join_code_challenge_gates_first_time_joiners() {
    let server = start_server(Room::new(room_id(), "Sprint").with_join_code("ABC")).await;
    let mut ws = connect(server.addr, ROOM, Some("session=s-bob")).await;

    assert_eq!(next_envelope(&mut ws).await.event_type, "join_code_required");

    // Frames other than auth_poker are ignored while the challenge runs.
    send(&mut ws, "vote", r#"{"points":"5"}"#).await;
    send(&mut ws, "auth_poker", "XYZ").await;
    assert_eq!(next_envelope(&mut ws).await.event_type, "join_code_incorrect");

    send(&mut ws, "auth_poker", "ABC").await;
    let init = next_envelope(&mut ws).await;
    assert_eq!(init.event_type, "init");
    let snapshot = value_of(&init);
    assert_eq!(snapshot["room"]["name"], "Sprint");
    assert!(snapshot["room"].get("joinCode").is_none());
    assert_eq!(snapshot["members"][0]["id"], "bob");

    assert_eq!(next_envelope(&mut ws).await.event_type, "member_joined");
}

#[tokio::test]
async fn returning_member_skips_join_code() {
    let server = start_server(Room::new(room_id(), "Sprint").with_join_code("ABC")).await;
    server
        .store
        .set_membership_active(&room_id(), &RoomUser::registered(user("bob"), "Bob"), false)
        .await
        .unwrap();

    let mut ws = connect(server.addr, ROOM, Some("session=s-bob")).await;
    assert_eq!(next_envelope(&mut ws).await.event_type, "init");
}

// =============================================================================
// Room traffic
// =============================================================================

#[tokio::test]
async fn two_members_see_the_same_vote() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut alice = join(server.addr, "session=s-alice").await;
    let mut bob = join(server.addr, "session=s-bob").await;
    expect_event(&mut alice, "member_joined").await;

    send(&mut alice, "activate_story", r#"{"name":"Checkout"}"#).await;
    for ws in [&mut alice, &mut bob] {
        let env = expect_event(ws, poker::STORY_ACTIVATED).await;
        assert_eq!(value_of(&env)["activeStory"]["name"], "Checkout");
    }

    send(&mut bob, "vote", r#"{"points":"8"}"#).await;
    for ws in [&mut alice, &mut bob] {
        let env = expect_event(ws, poker::VOTE_ACTIVITY).await;
        assert_eq!(env.user_id, "bob");
        assert_eq!(value_of(&env)["voters"], serde_json::json!(["bob"]));
    }

    send(&mut alice, "end_voting", "").await;
    for ws in [&mut alice, &mut bob] {
        let env = expect_event(ws, poker::VOTING_ENDED).await;
        let results = value_of(&env)["results"].clone();
        assert_eq!(results[0]["userId"], "bob");
        assert_eq!(results[0]["points"], "8");
    }
}

#[tokio::test]
async fn invalid_frames_do_not_close_the_connection() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut bob = join(server.addr, "session=s-bob").await;

    bob.send(Message::text("not json")).await.unwrap();
    bob.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    send(&mut bob, "launch_rocket", "").await;
    send(&mut bob, "end_voting", "").await;
    send(&mut bob, "auth_poker", "ABC").await;

    send(&mut bob, "promote_leader_self", "wrong").await;

    server
        .channel
        .bridge()
        .inject_event(&room_id(), &user("alice"), "activate_story", r#"{"name":"Login"}"#)
        .await
        .unwrap();
    send(&mut bob, "retract_vote", "").await;
    let env = expect_event(&mut bob, poker::VOTE_RETRACTED).await;
    assert_eq!(env.user_id, "bob");
}

#[tokio::test]
async fn abandon_closes_with_4002_and_announces_departure() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut alice = join(server.addr, "session=s-alice").await;
    let mut bob = join(server.addr, "session=s-bob").await;
    expect_event(&mut alice, "member_joined").await;

    send(&mut bob, "abandon_game", "").await;
    assert_eq!(expect_close(&mut bob).await, 4002);

    let left = expect_event(&mut alice, "member_left").await;
    assert_eq!(left.user_id, "bob");
    let members = value_of(&left);
    let bob_row = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"] == "bob")
        .unwrap()
        .clone();
    assert_eq!(bob_row["abandoned"], true);
    assert_eq!(bob_row["active"], false);

    wait_for_members(&server.channel, 1).await;
    let row = server
        .store
        .get_membership(&room_id(), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert!(row.abandoned);
}

#[tokio::test]
async fn disconnect_marks_member_inactive() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut alice = join(server.addr, "session=s-alice").await;
    let mut bob = join(server.addr, "session=s-bob").await;
    expect_event(&mut alice, "member_joined").await;

    bob.close(None).await.unwrap();

    let left = expect_event(&mut alice, "member_left").await;
    assert_eq!(left.user_id, "bob");
    wait_for_members(&server.channel, 1).await;

    let row = server
        .store
        .get_membership(&room_id(), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert!(!row.active);
    assert!(!row.abandoned);

    // bob may come straight back now that the old connection is gone.
    join(server.addr, "session=s-bob").await;
}

#[tokio::test]
async fn injected_event_reaches_connected_members() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut bob = join(server.addr, "session=s-bob").await;

    server
        .channel
        .bridge()
        .inject_event(&room_id(), &user("alice"), "activate_story", r#"{"name":"Search"}"#)
        .await
        .unwrap();

    let env = expect_event(&mut bob, poker::STORY_ACTIVATED).await;
    assert_eq!(env.user_id, "alice");
}

#[tokio::test]
async fn hub_shutdown_closes_connections_normally() {
    let server = start_server(Room::new(room_id(), "Sprint")).await;
    let mut bob = join(server.addr, "session=s-bob").await;

    server.channel.hub().shutdown();

    assert_eq!(expect_close(&mut bob).await, 1000);
}

// =============================================================================
// Keepalive and idle deadlines
// =============================================================================

#[tokio::test]
async fn silent_peer_is_dropped_after_idle_timeout() {
    let server = start_short_idle_server(Room::new(room_id(), "Sprint")).await;
    let mut alice = join(server.addr, "session=s-alice").await;
    // bob never polls again, so the server's pings go unanswered.
    let _bob = join(server.addr, "session=s-bob").await;
    expect_event(&mut alice, "member_joined").await;

    let left = expect_event(&mut alice, "member_left").await;
    assert_eq!(left.user_id, "bob");
    let bob_row = value_of(&left)
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"] == "bob")
        .unwrap()
        .clone();
    assert_eq!(bob_row["active"], false);

    wait_for_members(&server.channel, 1).await;
    let row = server
        .store
        .get_membership(&room_id(), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert!(!row.active);
    assert!(!row.abandoned);
}

#[tokio::test]
async fn polling_peer_answers_pings_and_outlives_idle_timeout() {
    let server = start_short_idle_server(Room::new(room_id(), "Sprint")).await;
    let mut bob = join(server.addr, "session=s-bob").await;

    // Ping period is 9/10 of the 2s idle timeout.
    let mut pings = 0;
    let until = tokio::time::Instant::now() + Duration::from_millis(4_500);
    while let Ok(next) = tokio::time::timeout_at(until, bob.next()).await {
        match next.expect("stream ended").expect("transport error") {
            Message::Ping(_) => pings += 1,
            Message::Close(frame) => panic!("unexpected close: {frame:?}"),
            _ => {}
        }
    }

    assert!(pings >= 2, "expected at least 2 pings, got {pings}");
    assert_eq!(server.channel.hub().member_count(&room_id()).await, 1);

    server
        .channel
        .bridge()
        .inject_event(&room_id(), &user("alice"), "activate_story", r#"{"name":"Still here"}"#)
        .await
        .unwrap();
    expect_event(&mut bob, poker::STORY_ACTIVATED).await;
}

#[tokio::test]
async fn unanswered_join_code_closes_with_4001() {
    let server = start_short_idle_server(Room::new(room_id(), "Sprint").with_join_code("ABC")).await;
    let mut ws = connect(server.addr, ROOM, Some("session=s-bob")).await;
    assert_eq!(next_envelope(&mut ws).await.event_type, "join_code_required");

    let started = tokio::time::Instant::now();
    assert_eq!(expect_close(&mut ws).await, 4001);
    assert!(started.elapsed() >= Duration::from_millis(1_500));

    assert_eq!(server.channel.hub().member_count(&room_id()).await, 0);
    assert!(server
        .store
        .get_membership(&room_id(), &user("bob"))
        .await
        .unwrap()
        .is_none());
}
