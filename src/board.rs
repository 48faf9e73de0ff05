//! Board state for one side of the game.
//!
//! Two [`Board`] instances exist per session: the player's own board
//! (ship placements plus incoming-attack outcomes) and the opponent
//! board (only the outcomes of the player's own attacks; opponent ships
//! stay hidden until hit). Boards are pure data; all game rules live in
//! the controller.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;

/// State of a single board cell.
///
/// Variants carry the wire spellings the server uses in board payloads,
/// so whole grids deserialize directly from `update_board` /
/// `enemy_update` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    /// Untouched water (the server calls this `white`).
    #[serde(rename = "white")]
    Empty,
    /// One of the player's own ships. Never present on the opponent board.
    #[serde(rename = "ship")]
    Ship,
    /// A resolved attack that struck a ship.
    #[serde(rename = "HIT")]
    Hit,
    /// A resolved attack that struck water.
    #[serde(rename = "MISS")]
    Miss,
}

impl CellState {
    /// Whether the cell is resolved. Terminal cells never change again
    /// and must not be attacked again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CellState::Hit | CellState::Miss)
    }
}

/// Error from building a board out of a wire grid with the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardShapeError {
    /// The payload did not have exactly [`BOARD_SIZE`] rows.
    RowCount(usize),
    /// A row did not have exactly [`BOARD_SIZE`] cells.
    RowWidth {
        /// Zero-based index of the offending row.
        row: usize,
        /// Number of cells the row actually had.
        cols: usize,
    },
}

impl fmt::Display for BoardShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardShapeError::RowCount(rows) => {
                write!(f, "expected {BOARD_SIZE} rows, got {rows}")
            }
            BoardShapeError::RowWidth { row, cols } => {
                write!(f, "row {row} has {cols} cells, expected {BOARD_SIZE}")
            }
        }
    }
}

impl std::error::Error for BoardShapeError {}

/// A fixed `BOARD_SIZE` x `BOARD_SIZE` grid of cell states, row-major.
///
/// Coordinates are `(row, col)` with `(0, 0)` top-left. Out-of-range
/// access is a programming error and panics: every coordinate reaching
/// a board comes either from a range-clamped input surface or from a
/// server payload validated at decode time.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: Box<[CellState]>,
}

impl Board {
    /// Creates a board with every cell [`CellState::Empty`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![CellState::Empty; BOARD_SIZE * BOARD_SIZE].into_boxed_slice(),
        }
    }

    /// Builds a board from wire rows, enforcing the fixed shape.
    pub fn try_from_rows(rows: Vec<Vec<CellState>>) -> Result<Self, BoardShapeError> {
        if rows.len() != BOARD_SIZE {
            return Err(BoardShapeError::RowCount(rows.len()));
        }
        let mut cells = Vec::with_capacity(BOARD_SIZE * BOARD_SIZE);
        for (row, cols) in rows.iter().enumerate() {
            if cols.len() != BOARD_SIZE {
                return Err(BoardShapeError::RowWidth {
                    row,
                    cols: cols.len(),
                });
            }
            cells.extend_from_slice(cols);
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    fn linearize(row: usize, col: usize) -> Option<usize> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(row * BOARD_SIZE + col)
        } else {
            None
        }
    }

    /// Returns the state of the cell at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self[(row, col)]
    }

    /// Sets the cell at `(row, col)` to `state`.
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self[(row, col)] = state;
    }

    /// Bulk overwrite with an authoritative server snapshot.
    pub fn replace(&mut self, snapshot: Board) {
        self.cells = snapshot.cells;
    }

    /// Iterates rows top to bottom, each a `BOARD_SIZE`-cell slice.
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> {
        self.cells.chunks(BOARD_SIZE)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<(usize, usize)> for Board {
    type Output = CellState;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        Self::linearize(row, col)
            .and_then(|i| self.cells.get(i))
            .expect("coordinate out of bounds")
    }
}

impl IndexMut<(usize, usize)> for Board {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        Self::linearize(row, col)
            .and_then(move |i| self.cells.get_mut(i))
            .expect("coordinate out of bounds")
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("cells", &format_args!("{}x{BOARD_SIZE} grid", BOARD_SIZE))
            .finish_non_exhaustive()
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<CellState>>::deserialize(deserializer)?;
        Board::try_from_rows(rows).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_all_empty() {
        let board = Board::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                assert_eq!(board.get(row, col), CellState::Empty);
            }
        }
    }

    #[test]
    fn test_set_then_get() {
        let mut board = Board::new();
        board.set(3, 4, CellState::Hit);
        assert_eq!(board.get(3, 4), CellState::Hit);
        assert_eq!(board.get(4, 3), CellState::Empty);
    }

    #[test]
    #[should_panic(expected = "coordinate out of bounds")]
    fn test_out_of_range_get_panics() {
        let board = Board::new();
        let _ = board.get(0, BOARD_SIZE);
    }

    #[test]
    #[should_panic(expected = "coordinate out of bounds")]
    fn test_out_of_range_set_panics() {
        let mut board = Board::new();
        board.set(BOARD_SIZE, 0, CellState::Miss);
    }

    #[test]
    fn test_terminal_states() {
        assert!(CellState::Hit.is_terminal());
        assert!(CellState::Miss.is_terminal());
        assert!(!CellState::Empty.is_terminal());
        assert!(!CellState::Ship.is_terminal());
    }

    #[test]
    fn test_try_from_rows_rejects_bad_shapes() {
        let short = vec![vec![CellState::Empty; BOARD_SIZE]; BOARD_SIZE - 1];
        assert_eq!(
            Board::try_from_rows(short),
            Err(BoardShapeError::RowCount(BOARD_SIZE - 1))
        );

        let mut ragged = vec![vec![CellState::Empty; BOARD_SIZE]; BOARD_SIZE];
        ragged[7].pop();
        assert_eq!(
            Board::try_from_rows(ragged),
            Err(BoardShapeError::RowWidth {
                row: 7,
                cols: BOARD_SIZE - 1
            })
        );
    }

    #[test]
    fn test_replace_overwrites_all_cells() {
        let mut board = Board::new();
        board.set(0, 0, CellState::Ship);

        let mut snapshot = Board::new();
        snapshot.set(9, 9, CellState::Miss);
        board.replace(snapshot);

        assert_eq!(board.get(0, 0), CellState::Empty);
        assert_eq!(board.get(9, 9), CellState::Miss);
    }

    #[test]
    fn test_deserialize_wire_grid() {
        let mut rows = vec![vec!["white"; BOARD_SIZE]; BOARD_SIZE];
        rows[0][0] = "ship";
        rows[2][5] = "HIT";
        rows[9][9] = "MISS";
        let json = serde_json::to_string(&rows).expect("serialize fixture");

        let board: Board = serde_json::from_str(&json).expect("deserialize board");
        assert_eq!(board.get(0, 0), CellState::Ship);
        assert_eq!(board.get(2, 5), CellState::Hit);
        assert_eq!(board.get(9, 9), CellState::Miss);
        assert_eq!(board.get(1, 1), CellState::Empty);
    }

    #[test]
    fn test_deserialize_rejects_wrong_shape() {
        let rows = vec![vec!["white"; BOARD_SIZE]; 3];
        let json = serde_json::to_string(&rows).expect("serialize fixture");
        assert!(serde_json::from_str::<Board>(&json).is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_cell_token() {
        let mut rows = vec![vec!["white"; BOARD_SIZE]; BOARD_SIZE];
        rows[4][4] = "kraken";
        let json = serde_json::to_string(&rows).expect("serialize fixture");
        assert!(serde_json::from_str::<Board>(&json).is_err());
    }

    #[test]
    fn test_serialize_uses_wire_spellings() {
        let mut board = Board::new();
        board.set(0, 1, CellState::Ship);
        board.set(0, 2, CellState::Hit);
        board.set(0, 3, CellState::Miss);

        let value = serde_json::to_value(&board).expect("serialize board");
        assert_eq!(value[0][0], "white");
        assert_eq!(value[0][1], "ship");
        assert_eq!(value[0][2], "HIT");
        assert_eq!(value[0][3], "MISS");
    }
}
