//! End-to-end session tests against an in-process WebSocket server.
//!
//! These tests wire a real `SessionConnection` to a real `GameController`
//! and script the server side of the conversation. They verify:
//! - Board sync, attack dispatch, and result application, in order
//! - Unknown and malformed server messages passing by without harm
//! - Automatic reconnect after the server drops the socket
//! - Server pings answered with pongs carrying the same payload
//! - Binary frames dropped without disturbing the text stream
//! - Local refusal of intents while disconnected (nothing is queued)

// Rust guideline compliant 2026-02

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use broadside::connection::SessionConfig;
use broadside::game::ControllerConfig;
use broadside::{
    CellState, GameController, GamePhase, Intent, Orientation, ReconnectPolicy, ServerMessage,
    SessionConnection, SessionEvent, ShipKind, ViewFrame,
};

/// Upper bound for any single await in these tests.
const WAIT: Duration = Duration::from_secs(5);

/// Binds a listener on an ephemeral port and returns it with its ws:// URL.
async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let url = format!("ws://{}", listener.local_addr().expect("local addr"));
    (listener, url)
}

/// Accepts one TCP connection and completes the WebSocket handshake.
async fn accept_client(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("timed out waiting for a client connection")
        .expect("accept");
    tokio_tungstenite::accept_async(stream)
        .await
        .expect("websocket handshake")
}

/// Spawns the full client stack against `url` and returns its channel ends.
fn spawn_client(
    url: String,
    policy: ReconnectPolicy,
) -> (
    mpsc::UnboundedSender<Intent>,
    mpsc::UnboundedReceiver<ViewFrame>,
) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (intents_tx, intents_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    let connection = SessionConnection::open(SessionConfig { url, policy }, events_tx);
    let controller = GameController::new(connection, ControllerConfig::default());
    tokio::spawn(controller.run(intents_rx, events_rx, frames_tx));

    (intents_tx, frames_rx)
}

/// Receives the next frame, or panics on timeout.
async fn next_frame(frames_rx: &mut mpsc::UnboundedReceiver<ViewFrame>) -> ViewFrame {
    tokio::time::timeout(WAIT, frames_rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("frame channel closed")
}

/// Receives frames until one satisfies `pred`, or panics on timeout.
async fn frame_where<F>(frames_rx: &mut mpsc::UnboundedReceiver<ViewFrame>, mut pred: F) -> ViewFrame
where
    F: FnMut(&ViewFrame) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let frame = frames_rx.recv().await.expect("frame channel closed");
            if pred(&frame) {
                return frame;
            }
        }
    })
    .await
    .expect("timed out waiting for a matching frame")
}

/// A ten by ten grid of wire cell strings with the standard fleet placed.
fn rows_with_fleet() -> Vec<Vec<&'static str>> {
    let mut rows = vec![vec!["white"; 10]; 10];
    for (row, len) in [(0usize, 5usize), (2, 4), (4, 3), (6, 3), (8, 2)] {
        for col in 0..len {
            rows[row][col] = "ship";
        }
    }
    rows
}

/// Counts cells in `state` across the whole board.
fn count_cells(board: &broadside::Board, state: CellState) -> usize {
    board.rows().flatten().filter(|c| **c == state).count()
}

// === Full session flow ===

/// The canonical happy path: connect, receive the board, enter attack
/// mode, fire, and watch the server's verdict land on the opponent grid.
#[tokio::test]
async fn test_board_sync_attack_and_result_flow() {
    let (listener, url) = bind_server().await;
    let (intents_tx, mut frames_rx) =
        spawn_client(url, ReconnectPolicy::FixedDelay(Duration::from_millis(50)));
    let mut server = accept_client(&listener).await;

    // Connectivity flows through to the snapshot.
    frame_where(&mut frames_rx, |f| f.snapshot.connected).await;

    // Server pushes the player's board with the full fleet placed.
    let board_msg = json!({ "type": "update_board", "board": rows_with_fleet() });
    server
        .send(Message::Text(board_msg.to_string()))
        .await
        .expect("send update_board");

    let frame = frame_where(&mut frames_rx, |f| {
        count_cells(&f.snapshot.own_board, CellState::Ship) > 0
    })
    .await;
    assert_eq!(
        count_cells(&frame.snapshot.own_board, CellState::Ship),
        17,
        "the five-ship fleet covers 17 cells"
    );
    // Own-board sync never touches the opponent grid.
    assert_eq!(
        count_cells(&frame.snapshot.opponent_board, CellState::Empty),
        100
    );

    // Enter attack mode and fire at (0, 0).
    intents_tx
        .send(Intent::ToggleAttackMode)
        .expect("send toggle");
    frame_where(&mut frames_rx, |f| f.snapshot.phase == GamePhase::Targeting).await;

    intents_tx
        .send(Intent::Attack { row: 0, col: 0 })
        .expect("send attack");

    // The attack reaches the wire exactly as typed.
    let wire = tokio::time::timeout(WAIT, server.next())
        .await
        .expect("timed out waiting for the attack")
        .expect("server stream ended")
        .expect("websocket error");
    let value: Value =
        serde_json::from_str(wire.to_text().expect("text frame")).expect("valid json");
    assert_eq!(value, json!({ "type": "attack", "row": 0, "col": 0 }));

    // No local guessing: the opponent grid stays empty until the server answers.
    let frame = next_frame(&mut frames_rx).await;
    assert_eq!(frame.snapshot.opponent_board.get(0, 0), CellState::Empty);

    // An unknown tag is tolerated and does not disturb the stream.
    server
        .send(Message::Text(
            json!({ "type": "chat_message", "text": "gg" }).to_string(),
        ))
        .await
        .expect("send unknown tag");

    // The verdict lands on the cell, in order, with a log line.
    server
        .send(Message::Text(
            json!({ "type": "attack_result", "row": 0, "col": 0, "result": "HIT" }).to_string(),
        ))
        .await
        .expect("send attack_result");

    let frame = frame_where(&mut frames_rx, |f| {
        f.snapshot.opponent_board.get(0, 0) == CellState::Hit
    })
    .await;
    assert!(
        frame.fresh_log.iter().any(|l| l.contains("(0, 0)")),
        "the result is logged: {:?}",
        frame.fresh_log
    );

    // Game over locks the phase and records the winner.
    server
        .send(Message::Text(
            json!({ "type": "game_over", "winner": "player1" }).to_string(),
        ))
        .await
        .expect("send game_over");

    let frame = frame_where(&mut frames_rx, |f| f.snapshot.phase == GamePhase::Over).await;
    assert_eq!(frame.snapshot.winner.as_deref(), Some("player1"));

    // Closing the intent side winds the whole stack down.
    drop(intents_tx);
}

/// Opponent-board sync replaces the grid wholesale and leaves the
/// player's own grid alone; a malformed known tag right before it is
/// dropped at the session layer without surfacing anything.
#[tokio::test]
async fn test_enemy_update_replaces_opponent_board() {
    let (listener, url) = bind_server().await;
    let (intents_tx, mut frames_rx) =
        spawn_client(url, ReconnectPolicy::FixedDelay(Duration::from_millis(50)));
    let mut server = accept_client(&listener).await;

    // Missing fields on a known tag: dropped with a warning, no event.
    server
        .send(Message::Text(
            json!({ "type": "attack_result", "row": 1 }).to_string(),
        ))
        .await
        .expect("send malformed attack_result");

    let mut rows = vec![vec!["white"; 10]; 10];
    rows[5][5] = "HIT";
    rows[5][6] = "MISS";
    server
        .send(Message::Text(
            json!({ "type": "enemy_update", "board": rows }).to_string(),
        ))
        .await
        .expect("send enemy_update");

    let frame = frame_where(&mut frames_rx, |f| {
        f.snapshot.opponent_board.get(5, 5) == CellState::Hit
    })
    .await;
    assert_eq!(frame.snapshot.opponent_board.get(5, 6), CellState::Miss);
    assert_eq!(count_cells(&frame.snapshot.own_board, CellState::Empty), 100);
    assert!(
        frame.notices.is_empty(),
        "malformed frames vanish at the session layer: {:?}",
        frame.notices
    );

    drop(intents_tx);
}

// === Reconnect behavior ===

/// Receives session events until `Up`, or panics on timeout.
async fn wait_for_up(events_rx: &mut mpsc::UnboundedReceiver<SessionEvent>) {
    tokio::time::timeout(WAIT, async {
        loop {
            if let SessionEvent::Up = events_rx.recv().await.expect("event channel closed") {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for session up");
}

/// Receives session events until `Down`, or panics on timeout.
async fn wait_for_down(events_rx: &mut mpsc::UnboundedReceiver<SessionEvent>) {
    tokio::time::timeout(WAIT, async {
        loop {
            if let SessionEvent::Down { .. } = events_rx.recv().await.expect("event channel closed")
            {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for session down");
}

/// A dropped socket is reported, then a fresh connection is established
/// without any outside help.
#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let (listener, url) = bind_server().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let connection = SessionConnection::open(
        SessionConfig {
            url,
            policy: ReconnectPolicy::FixedDelay(Duration::from_millis(50)),
        },
        events_tx,
    );

    // First connection comes up.
    let server = accept_client(&listener).await;
    wait_for_up(&mut events_rx).await;
    assert!(connection.is_connected());

    // Server drops the socket; the session notices and retries.
    drop(server);
    wait_for_down(&mut events_rx).await;

    // The retry lands as a brand new connection.
    let _second = accept_client(&listener).await;
    wait_for_up(&mut events_rx).await;
    assert!(connection.is_connected());

    connection.shutdown();
}

// === Transport frames ===

/// Server pings are answered with pongs carrying the same payload, so
/// keepalive works without the game layer ever hearing about it.
#[tokio::test]
async fn test_server_ping_answered_with_pong() {
    let (listener, url) = bind_server().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let connection = SessionConnection::open(
        SessionConfig {
            url,
            policy: ReconnectPolicy::FixedDelay(Duration::from_millis(50)),
        },
        events_tx,
    );
    let mut server = accept_client(&listener).await;
    wait_for_up(&mut events_rx).await;

    server
        .send(Message::Ping(b"keepalive".to_vec()))
        .await
        .expect("send ping");

    let payload = tokio::time::timeout(WAIT, async {
        loop {
            let msg = server
                .next()
                .await
                .expect("server stream ended")
                .expect("websocket error");
            if let Message::Pong(data) = msg {
                break data;
            }
        }
    })
    .await
    .expect("timed out waiting for the pong");
    assert_eq!(payload, b"keepalive");

    connection.shutdown();
}

/// A binary frame means nothing to the protocol: the session drops it
/// and the connection and frame stream carry on untouched.
#[tokio::test]
async fn test_binary_frame_ignored_stream_continues() {
    let (listener, url) = bind_server().await;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let connection = SessionConnection::open(
        SessionConfig {
            url,
            policy: ReconnectPolicy::FixedDelay(Duration::from_millis(50)),
        },
        events_tx,
    );
    let mut server = accept_client(&listener).await;
    wait_for_up(&mut events_rx).await;

    server
        .send(Message::Binary(vec![0xde, 0xad, 0xbe, 0xef]))
        .await
        .expect("send binary");
    server
        .send(Message::Text(
            json!({ "type": "log", "text": "still here" }).to_string(),
        ))
        .await
        .expect("send log");

    // The log frame is the very next event: the binary frame produced
    // neither a frame nor a disconnect.
    let event = tokio::time::timeout(WAIT, events_rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed");
    match event {
        SessionEvent::Frame(ServerMessage::Log { text }) => {
            assert_eq!(text, "still here");
        }
        other => panic!("expected the log frame, got {other:?}"),
    }
    assert!(connection.is_connected());

    connection.shutdown();
}

// === Offline behavior ===

/// With no server at all, the controller stays responsive: local toggles
/// work, transmitting intents are refused with a notice, and nothing is
/// queued for later.
#[tokio::test]
async fn test_intents_refused_while_disconnected() {
    // Port 1 refuses connections; the fixed-delay policy keeps retrying
    // in the background while the controller keeps serving the view.
    let (intents_tx, mut frames_rx) = spawn_client(
        "ws://127.0.0.1:1/ws".to_string(),
        ReconnectPolicy::FixedDelay(Duration::from_millis(200)),
    );

    let frame = next_frame(&mut frames_rx).await;
    assert!(!frame.snapshot.connected, "no server, must start disconnected");

    // Local toggles still work offline.
    intents_tx
        .send(Intent::ToggleAttackMode)
        .expect("send toggle");
    let frame = next_frame(&mut frames_rx).await;
    assert_eq!(frame.snapshot.phase, GamePhase::Targeting);

    // Attacks are refused locally with a warning.
    intents_tx
        .send(Intent::Attack { row: 3, col: 4 })
        .expect("send attack");
    let frame = next_frame(&mut frames_rx).await;
    assert!(
        frame.notices.iter().any(|n| n.text.contains("Not connected")),
        "got: {:?}",
        frame.notices
    );
    assert_eq!(count_cells(&frame.snapshot.opponent_board, CellState::Empty), 100);

    // Placements too, and the refusal leaves no intent in the log.
    intents_tx
        .send(Intent::PlaceShip {
            ship: ShipKind::Destroyer,
            orientation: Orientation::Horizontal,
            row: 0,
            col: 0,
        })
        .expect("send place");
    let frame = next_frame(&mut frames_rx).await;
    assert!(
        frame.notices.iter().any(|n| n.text.contains("Not connected")),
        "got: {:?}",
        frame.notices
    );
    assert!(frame.fresh_log.is_empty());
}
