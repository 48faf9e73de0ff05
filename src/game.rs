//! Game controller: the single owner of all game state.
//!
//! # Architecture
//!
//! ```text
//!  view (console, tests)                    game server
//!    │ Intent mpsc                              │
//!    ▼                                          ▼
//!  GameController::run ◄─── SessionEvent mpsc ─── SessionConnection
//!    │ owns: own board, opponent board, mode,
//!    │       game-over flag, session log
//!    ▼
//!  ViewFrame mpsc ───► renderer (snapshot + fresh log + notices)
//! ```
//!
//! The controller is the only component that mutates game state. Every
//! other component receives immutable [`GameSnapshot`]s and talks back
//! through [`Intent`] messages; there is no shared mutable state. One
//! `tokio::select!` loop processes intents and session events strictly
//! in arrival order, so board mutations never race or reorder.

// Rust guideline compliant 2026-02

use std::fmt;

use tokio::sync::mpsc;

use crate::board::Board;
use crate::connection::{SendError, SessionConnection, SessionEvent};
use crate::constants::BOARD_SIZE;
use crate::protocol::{ClientMessage, Orientation, ServerMessage, ShipKind};

// ─── Intents & view types ──────────────────────────────────────────────────

/// User-originated actions. The view layer emits these; the controller
/// validates them against local invariants before anything reaches the
/// wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Ask the server to place one ship.
    PlaceShip {
        /// Which ship to place.
        ship: ShipKind,
        /// Direction the ship extends from the origin.
        orientation: Orientation,
        /// Origin row, 0-based.
        row: usize,
        /// Origin column, 0-based.
        col: usize,
    },
    /// Fire at one opponent-board cell.
    Attack {
        /// Target row, 0-based.
        row: usize,
        /// Target column, 0-based.
        col: usize,
    },
    /// Flip between placing and targeting.
    ToggleAttackMode,
}

/// Where the session stands. Game-over dominates the mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Initial state: clicks place ships, attacks are refused.
    Placing,
    /// Attack mode is on: targets turn into attack intents.
    Targeting,
    /// Terminal. Attacks are refused regardless of mode.
    Over,
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// A local precondition refused an action.
    Warning,
    /// The server rejected an action.
    Error,
}

/// Transient user-facing message. Rendered once with the frame that
/// carries it; never part of the session log unless logged separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity, for the renderer to style.
    pub kind: NoticeKind,
    /// Human-readable text.
    pub text: String,
}

/// Immutable copy of all game state, cheap enough to push per change.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    /// The player's own board.
    pub own_board: Board,
    /// The player's view of the opponent board.
    pub opponent_board: Board,
    /// Derived phase (mode and game-over combined).
    pub phase: GamePhase,
    /// Whether the session currently has a live transport.
    pub connected: bool,
    /// Winner identifier once the game is over.
    pub winner: Option<String>,
}

/// What the renderer receives after each processed intent or event.
#[derive(Debug, Clone)]
pub struct ViewFrame {
    /// Full state snapshot.
    pub snapshot: GameSnapshot,
    /// Log lines appended since the previous frame.
    pub fresh_log: Vec<String>,
    /// Notices raised since the previous frame.
    pub notices: Vec<Notice>,
}

// ─── Outbound seam ─────────────────────────────────────────────────────────

/// Outbound side of the session, as the controller sees it.
///
/// The real implementation is [`SessionConnection`]; tests substitute a
/// recorder to assert exactly what would have reached the wire.
pub trait Outbound {
    /// Transmit one message.
    fn send(&self, msg: &ClientMessage) -> Result<(), SendError>;
}

impl Outbound for SessionConnection {
    fn send(&self, msg: &ClientMessage) -> Result<(), SendError> {
        SessionConnection::send(self, msg)
    }
}

// ─── Controller ────────────────────────────────────────────────────────────

/// Behavior switches for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Forward placement intents even after game over (the server stays
    /// the arbiter). `false` rejects them locally with a notice.
    pub forward_placement_when_over: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            forward_placement_when_over: true,
        }
    }
}

/// Owns both boards, the session flags, and the log; applies every
/// transition; emits outbound messages through its [`Outbound`] seam.
pub struct GameController<O: Outbound> {
    // === Boards ===
    own_board: Board,
    opponent_board: Board,

    // === Session state ===
    attack_mode: bool,
    game_over: bool,
    winner: Option<String>,
    connected: bool,
    log: Vec<String>,

    // === View plumbing ===
    notices: Vec<Notice>,
    log_mark: usize,

    // === Wiring ===
    outbound: O,
    config: ControllerConfig,
}

impl<O: Outbound> GameController<O> {
    /// Creates a controller with empty boards in the `Placing` phase.
    #[must_use]
    pub fn new(outbound: O, config: ControllerConfig) -> Self {
        Self {
            own_board: Board::new(),
            opponent_board: Board::new(),
            attack_mode: false,
            game_over: false,
            winner: None,
            connected: false,
            log: Vec::new(),
            notices: Vec::new(),
            log_mark: 0,
            outbound,
            config,
        }
    }

    /// Derived phase: game-over dominates, then the mode flag.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        if self.game_over {
            GamePhase::Over
        } else if self.attack_mode {
            GamePhase::Targeting
        } else {
            GamePhase::Placing
        }
    }

    /// Immutable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            own_board: self.own_board.clone(),
            opponent_board: self.opponent_board.clone(),
            phase: self.phase(),
            connected: self.connected,
            winner: self.winner.clone(),
        }
    }

    /// Applies one user intent.
    pub fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::ToggleAttackMode => self.toggle_attack_mode(),
            Intent::PlaceShip {
                ship,
                orientation,
                row,
                col,
            } => self.place_ship(ship, orientation, row, col),
            Intent::Attack { row, col } => self.attack(row, col),
        }
    }

    /// Applies one session event.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Up => {
                self.connected = true;
                self.log_line("Connected to server");
            }
            SessionEvent::Down { reason } => {
                self.connected = false;
                self.log_line(format!("Connection lost: {reason}"));
            }
            SessionEvent::Frame(msg) => self.apply_server_message(msg),
        }
    }

    fn toggle_attack_mode(&mut self) {
        if self.game_over {
            self.notice(NoticeKind::Warning, "Game is over");
            return;
        }
        self.attack_mode = !self.attack_mode;
    }

    fn place_ship(&mut self, ship: ShipKind, orientation: Orientation, row: usize, col: usize) {
        if self.game_over && !self.config.forward_placement_when_over {
            self.notice(NoticeKind::Warning, "Game is over, placement not sent");
            return;
        }
        if !self.connected {
            self.notice(NoticeKind::Warning, "Not connected to server");
            return;
        }
        // Logged as intent, not outcome: the server may still reject it
        self.log_line(format!("Placing {ship} {orientation} at ({row}, {col})"));
        self.transmit(&ClientMessage::PlaceShip {
            ship,
            orientation,
            row,
            col,
        });
    }

    fn attack(&mut self, row: usize, col: usize) {
        if self.game_over {
            self.notice(NoticeKind::Warning, "Game is over");
            return;
        }
        if !self.attack_mode {
            self.notice(NoticeKind::Warning, "Enable attack mode first");
            return;
        }
        let current = self.opponent_board.get(row, col);
        if current.is_terminal() {
            // Resolved cells never go back on the wire
            self.notice(
                NoticeKind::Warning,
                format!("({row}, {col}) is already resolved"),
            );
            return;
        }
        if !self.connected {
            self.notice(NoticeKind::Warning, "Not connected to server");
            return;
        }
        self.transmit(&ClientMessage::Attack { row, col });
    }

    fn apply_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::UpdateBoard { board } => {
                self.own_board.replace(board);
            }
            ServerMessage::EnemyUpdate { board } => {
                self.opponent_board.replace(board);
            }
            ServerMessage::AttackResult { row, col, result } => {
                if row >= BOARD_SIZE || col >= BOARD_SIZE {
                    log::warn!("[Game] attack_result out of range: ({row}, {col})");
                    return;
                }
                let current = self.opponent_board.get(row, col);
                if current.is_terminal() {
                    // First write wins; a second result for the same
                    // cell is a server defect, not a transition
                    log::warn!(
                        "[Game] duplicate attack_result for ({row}, {col}): keeping {current:?}, ignoring {result}"
                    );
                    return;
                }
                self.opponent_board.set(row, col, result.cell_state());
                self.log_line(format!("Attack on ({row}, {col}): {result}"));
            }
            ServerMessage::Log { text } => self.log_line(text),
            ServerMessage::Error { message } => {
                self.notice(NoticeKind::Error, message.clone());
                self.log_line(format!("Server error: {message}"));
            }
            ServerMessage::GameOver { winner } => {
                self.game_over = true;
                if self.winner.is_none() {
                    self.winner = Some(winner.clone());
                }
                // Re-logs on repeat receipt; everything else is a no-op
                self.log_line(format!("Game over: {winner} wins"));
            }
            ServerMessage::Unknown { tag } => {
                log::warn!("[Game] ignoring unknown message tag `{tag}`");
            }
        }
    }

    fn transmit(&mut self, msg: &ClientMessage) {
        if let Err(e) = self.outbound.send(msg) {
            self.notice(NoticeKind::Warning, format!("Not sent: {e}"));
        }
    }

    fn log_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::debug!("[Game] log: {line}");
        self.log.push(line);
    }

    fn notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        let text = text.into();
        log::warn!("[Game] notice: {text}");
        self.notices.push(Notice { kind, text });
    }

    fn take_frame(&mut self) -> ViewFrame {
        let fresh_log = self.log[self.log_mark..].to_vec();
        self.log_mark = self.log.len();
        ViewFrame {
            snapshot: self.snapshot(),
            fresh_log,
            notices: std::mem::take(&mut self.notices),
        }
    }

    /// Drives the controller until the view or the connection goes away.
    ///
    /// Exactly one logical thread of control: each intent or event is
    /// applied fully, then a [`ViewFrame`] is pushed, then the next one
    /// is taken. Inbound frames are therefore processed strictly in the
    /// order the session delivered them.
    pub async fn run(
        mut self,
        mut intents_rx: mpsc::UnboundedReceiver<Intent>,
        mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        frames_tx: mpsc::UnboundedSender<ViewFrame>,
    ) {
        log::info!("[Game] controller loop started");
        // Seed the renderer before anything happens
        if frames_tx.send(self.take_frame()).is_err() {
            return;
        }

        loop {
            tokio::select! {
                maybe_intent = intents_rx.recv() => {
                    match maybe_intent {
                        Some(intent) => self.handle_intent(intent),
                        None => break,
                    }
                }
                maybe_event = events_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
            }
            if frames_tx.send(self.take_frame()).is_err() {
                break;
            }
        }
        log::info!("[Game] controller loop exited");
    }
}

impl<O: Outbound> fmt::Debug for GameController<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameController")
            .field("phase", &self.phase())
            .field("connected", &self.connected)
            .field("log_len", &self.log.len())
            .finish_non_exhaustive()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
