//! Game wire protocol types and JSON codec.
//!
//! Wire format: one JSON object per WebSocket text frame, discriminated
//! by a `type` tag.
//!
//! Client to server:
//! - `place_ship`: ship, orientation, row, col
//! - `attack`: row, col
//!
//! Server to client:
//! - `update_board`: full own-board grid
//! - `enemy_update`: full opponent-board grid
//! - `attack_result`: row, col, result (`HIT` | `MISS` | `SUNK`)
//! - `log`: text to append to the session log
//! - `error`: server-side rejection, surfaced to the user
//! - `game_over`: winner identifier
//!
//! Anything else decodes to [`ServerMessage::Unknown`] instead of an
//! error: unrecognized tags are dropped with a diagnostic, never a
//! reason to tear down the session. Malformed payloads under a known
//! tag are a [`ProtocolError`], reported and skipped by the caller.

// Rust guideline compliant 2026-02

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::board::{Board, CellState};

// ─── Ship catalog ──────────────────────────────────────────────────────────

/// The five fixed ship kinds. Wire names are the lowercase kind names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipKind {
    /// Length 5.
    Carrier,
    /// Length 4.
    Battleship,
    /// Length 3.
    Cruiser,
    /// Length 3.
    Submarine,
    /// Length 2.
    Destroyer,
}

impl ShipKind {
    /// Every ship kind, in fleet order.
    pub const ALL: [ShipKind; 5] = [
        ShipKind::Carrier,
        ShipKind::Battleship,
        ShipKind::Cruiser,
        ShipKind::Submarine,
        ShipKind::Destroyer,
    ];

    /// Number of cells the ship occupies.
    #[must_use]
    pub fn length(self) -> usize {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 3,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    /// Parses a wire name, case-insensitively. `None` for unknown ships.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "carrier" => Some(ShipKind::Carrier),
            "battleship" => Some(ShipKind::Battleship),
            "cruiser" => Some(ShipKind::Cruiser),
            "submarine" => Some(ShipKind::Submarine),
            "destroyer" => Some(ShipKind::Destroyer),
            _ => None,
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShipKind::Carrier => "carrier",
            ShipKind::Battleship => "battleship",
            ShipKind::Cruiser => "cruiser",
            ShipKind::Submarine => "submarine",
            ShipKind::Destroyer => "destroyer",
        };
        f.write_str(name)
    }
}

/// Placement orientation, starting at the origin cell and extending
/// right (horizontal) or down (vertical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Extends along the row, toward higher columns.
    Horizontal,
    /// Extends along the column, toward higher rows.
    Vertical,
}

impl Orientation {
    /// Parses `h`/`horizontal` or `v`/`vertical`, case-insensitively.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "h" | "horizontal" => Some(Orientation::Horizontal),
            "v" | "vertical" => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => f.write_str("horizontal"),
            Orientation::Vertical => f.write_str("vertical"),
        }
    }
}

/// Outcome of a resolved attack, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttackOutcome {
    /// The attack struck a ship.
    Hit,
    /// The attack struck water.
    Miss,
    /// The attack struck a ship and sank it.
    Sunk,
}

impl AttackOutcome {
    /// Cell state the opponent board takes on for this outcome.
    /// A sinking shot marks its cell as a hit like any other.
    #[must_use]
    pub fn cell_state(self) -> CellState {
        match self {
            AttackOutcome::Hit | AttackOutcome::Sunk => CellState::Hit,
            AttackOutcome::Miss => CellState::Miss,
        }
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackOutcome::Hit => f.write_str("HIT"),
            AttackOutcome::Miss => f.write_str("MISS"),
            AttackOutcome::Sunk => f.write_str("SUNK"),
        }
    }
}

// ─── Message enums ─────────────────────────────────────────────────────────

/// Messages sent from client to server (JSON text frames).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Ask the server to place one ship on the player's board.
    ///
    /// The server is the authority on overlap and bounds; the client
    /// only clamps coordinates into range.
    #[serde(rename = "place_ship")]
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
    #[serde(rename = "attack")]
    Attack {
        /// Target row, 0-based.
        row: usize,
        /// Target column, 0-based.
        col: usize,
    },
}

/// Messages received from the server (JSON text frames).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Authoritative snapshot of the player's own board.
    #[serde(rename = "update_board")]
    UpdateBoard {
        /// Full grid, replaces the own board wholesale.
        board: Board,
    },

    /// Authoritative snapshot of the player's view of the opponent board.
    #[serde(rename = "enemy_update")]
    EnemyUpdate {
        /// Full grid, replaces the opponent board wholesale.
        board: Board,
    },

    /// Resolution of one of the player's attacks.
    #[serde(rename = "attack_result")]
    AttackResult {
        /// Target row the result applies to.
        row: usize,
        /// Target column the result applies to.
        col: usize,
        /// What the attack found.
        result: AttackOutcome,
    },

    /// Server-authored line for the session log.
    #[serde(rename = "log")]
    Log {
        /// Text to append verbatim.
        text: String,
    },

    /// Server-side rejection (invalid placement, out-of-turn attack).
    ///
    /// Surfaced to the user and logged; game state is untouched.
    #[serde(rename = "error")]
    Error {
        /// Human-readable error description.
        message: String,
    },

    /// The game ended. Always terminal, whoever won.
    #[serde(rename = "game_over")]
    GameOver {
        /// Identifier of the winning player, as the server names it.
        winner: String,
    },

    /// A tag this client does not know. Dropped after a diagnostic;
    /// never an error.
    #[serde(skip)]
    Unknown {
        /// The unrecognized tag.
        tag: String,
    },
}

// ─── Codec ─────────────────────────────────────────────────────────────────

/// Tags [`decode`] deserializes strictly. Anything else is `Unknown`.
const KNOWN_TAGS: &[&str] = &[
    "update_board",
    "enemy_update",
    "attack_result",
    "log",
    "error",
    "game_over",
];

/// Error from decoding an inbound frame.
#[derive(Debug)]
pub enum ProtocolError {
    /// The frame was not valid JSON at all.
    NotJson(serde_json::Error),
    /// The frame had no string `type` field to dispatch on.
    MissingTag,
    /// A known tag carried a payload that does not match its shape.
    Malformed {
        /// The tag whose payload failed to deserialize.
        tag: String,
        /// The underlying deserialization failure.
        source: serde_json::Error,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::NotJson(e) => write!(f, "frame is not valid JSON: {e}"),
            ProtocolError::MissingTag => write!(f, "frame has no string `type` tag"),
            ProtocolError::Malformed { tag, source } => {
                write!(f, "malformed `{tag}` payload: {source}")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::NotJson(e) | ProtocolError::Malformed { source: e, .. } => Some(e),
            ProtocolError::MissingTag => None,
        }
    }
}

/// Encode an outbound message to its wire JSON.
#[must_use]
pub fn encode(msg: &ClientMessage) -> String {
    serde_json::to_string(msg).expect("client message serialization cannot fail")
}

/// Decode an inbound text frame.
///
/// Dispatches on the `type` tag first: known tags deserialize strictly
/// (shape errors are [`ProtocolError::Malformed`]); unknown tags come
/// back as `Ok(ServerMessage::Unknown)` so the caller can drop them
/// after logging.
pub fn decode(raw: &str) -> Result<ServerMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw).map_err(ProtocolError::NotJson)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingTag)?
        .to_owned();

    if KNOWN_TAGS.contains(&tag.as_str()) {
        serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { tag, source })
    } else {
        Ok(ServerMessage::Unknown { tag })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
