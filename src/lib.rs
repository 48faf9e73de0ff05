//! Broadside - client core for a two-player naval grid duel.
//!
//! This crate provides the core functionality for the broadside CLI:
//! board state tracking, the wire codec, the server session, and the
//! game controller that ties them together.
//!
//! # Architecture
//!
//! The crate follows a single-owner state pattern:
//!
//! - **GameController** - Sole owner of game state, runs the event loop
//! - **SessionConnection** - WebSocket session adapter with automatic reconnect
//! - **Protocol** - Tagged JSON codec for client/server messages
//! - **Console** - Line-oriented terminal view adapter (any front end can
//!   replace it by speaking intents and frames)
//!
//! # Modules
//!
//! - [`game`] - Game controller, intents, snapshots
//! - [`connection`] - Session connection and reconnect policy
//! - [`protocol`] - Message types and codec
//! - [`board`] - Board grid and cell states
//! - [`config`] - Configuration loading

// Library modules
pub mod board;
pub mod connection;
pub mod console;
pub mod game;
pub mod protocol;
pub mod ws;

pub mod config;
pub mod constants;

// Re-export commonly used types
pub use board::{Board, CellState};
pub use config::Config;
pub use connection::{ConnectionStatus, ReconnectPolicy, SessionConnection, SessionEvent};
pub use protocol::{AttackOutcome, ClientMessage, Orientation, ServerMessage, ShipKind};

// Re-export the controller
pub use game::{GameController, GamePhase, GameSnapshot, Intent, ViewFrame};
