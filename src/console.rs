//! Console host: the bundled view-layer collaborator.
//!
//! Owns no game state. Stdin lines become [`Intent`]s (or local
//! commands like `board` and `quit`); [`ViewFrame`]s from the
//! controller are rendered as text: fresh log lines, transient
//! notices, and on demand both boards as glyph grids.

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::board::{Board, CellState};
use crate::constants::BOARD_SIZE;
use crate::game::{GamePhase, GameSnapshot, Intent, NoticeKind, ViewFrame};
use crate::protocol::{Orientation, ShipKind};

/// Help text printed on `help` and on unknown commands.
pub const HELP: &str = "\
commands:
  place <ship> <h|v> <row> <col>   request a ship placement
  attack <row> <col>               fire at an opponent cell
  mode                             toggle attack mode
  board                            print both boards
  help                             show this help
  quit                             exit
ships: carrier (5), battleship (4), cruiser (3), submarine (3), destroyer (2)";

/// One parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Forward an intent to the controller.
    Intent(Intent),
    /// Print both boards.
    ShowBoards,
    /// Print [`HELP`].
    Help,
    /// Exit the client.
    Quit,
}

/// Parses one input line.
///
/// Coordinates are clamped into the board range rather than rejected,
/// matching the input surface contract the controller relies on. The
/// error string is ready to print.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err("empty command".to_string());
    };

    match head.to_ascii_lowercase().as_str() {
        "place" | "p" => {
            let usage = "usage: place <ship> <h|v> <row> <col>";
            let ship_token = parts.next().ok_or(usage)?;
            let ship = ShipKind::parse(ship_token)
                .ok_or_else(|| format!("unknown ship `{ship_token}` (see `help`)"))?;
            let orient_token = parts.next().ok_or(usage)?;
            let orientation = Orientation::parse(orient_token)
                .ok_or_else(|| format!("unknown orientation `{orient_token}` (use h or v)"))?;
            let row = parse_coord(parts.next().ok_or(usage)?)?;
            let col = parse_coord(parts.next().ok_or(usage)?)?;
            Ok(Command::Intent(Intent::PlaceShip {
                ship,
                orientation,
                row,
                col,
            }))
        }
        "attack" | "a" => {
            let usage = "usage: attack <row> <col>";
            let row = parse_coord(parts.next().ok_or(usage)?)?;
            let col = parse_coord(parts.next().ok_or(usage)?)?;
            Ok(Command::Intent(Intent::Attack { row, col }))
        }
        "mode" | "m" => Ok(Command::Intent(Intent::ToggleAttackMode)),
        "board" | "b" => Ok(Command::ShowBoards),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command `{other}` (try `help`)")),
    }
}

fn parse_coord(token: &str) -> Result<usize, String> {
    token
        .parse::<usize>()
        .map(|n| n.min(BOARD_SIZE - 1))
        .map_err(|_| format!("`{token}` is not a coordinate"))
}

fn cell_glyph(cell: CellState) -> char {
    match cell {
        CellState::Empty => '.',
        CellState::Ship => 'S',
        CellState::Hit => 'X',
        CellState::Miss => 'o',
    }
}

/// Renders one board as a glyph grid with coordinate labels.
#[must_use]
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    out.push_str("   ");
    for col in 0..BOARD_SIZE {
        out.push_str(&format!("{col} "));
    }
    out.push('\n');
    for (row, cells) in board.rows().enumerate() {
        out.push_str(&format!("{row:>2} "));
        for &cell in cells {
            out.push(cell_glyph(cell));
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

fn phase_label(phase: GamePhase) -> &'static str {
    match phase {
        GamePhase::Placing => "placing",
        GamePhase::Targeting => "targeting",
        GamePhase::Over => "game over",
    }
}

/// Renders both boards plus a one-line status summary.
#[must_use]
pub fn render_boards(snapshot: &GameSnapshot) -> String {
    let link = if snapshot.connected {
        "connected"
    } else {
        "disconnected"
    };
    let mut out = String::new();
    out.push_str("your board:\n");
    out.push_str(&render_board(&snapshot.own_board));
    out.push_str("opponent board:\n");
    out.push_str(&render_board(&snapshot.opponent_board));
    out.push_str(&format!("phase: {} | {link}", phase_label(snapshot.phase)));
    if let Some(winner) = &snapshot.winner {
        out.push_str(&format!(" | winner: {winner}"));
    }
    out.push('\n');
    out
}

/// Renders the incremental part of a frame: fresh log lines first,
/// then notices. Empty when nothing new happened.
#[must_use]
pub fn render_frame(frame: &ViewFrame) -> String {
    let mut out = String::new();
    for line in &frame.fresh_log {
        out.push_str(line);
        out.push('\n');
    }
    for notice in &frame.notices {
        let prefix = match notice.kind {
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        };
        out.push_str(&format!("{prefix}: {}\n", notice.text));
    }
    out
}

/// Interactive loop: stdin commands in, rendered frames out.
///
/// Returns when the user quits, stdin closes, or the controller goes
/// away. The caller tears the session down afterwards.
pub async fn run_console(
    intents_tx: mpsc::UnboundedSender<Intent>,
    mut frames_rx: mpsc::UnboundedReceiver<ViewFrame>,
) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last_snapshot: Option<GameSnapshot> = None;

    println!("{HELP}");

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                let line = match maybe_line {
                    Ok(Some(line)) => line,
                    // EOF or unreadable stdin both end the session
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("[Console] stdin read failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(Command::Intent(intent)) => {
                        if intents_tx.send(intent).is_err() {
                            break;
                        }
                    }
                    Ok(Command::ShowBoards) => match &last_snapshot {
                        Some(snapshot) => print!("{}", render_boards(snapshot)),
                        None => println!("no state yet"),
                    },
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Quit) => break,
                    Err(e) => println!("{e}"),
                }
            }

            maybe_frame = frames_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        print!("{}", render_frame(&frame));
                        last_snapshot = Some(frame.snapshot);
                    }
                    // Controller gone: nothing left to render
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_place_command() {
        let cmd = parse_command("place carrier h 2 3").expect("valid command");
        assert_eq!(
            cmd,
            Command::Intent(Intent::PlaceShip {
                ship: ShipKind::Carrier,
                orientation: Orientation::Horizontal,
                row: 2,
                col: 3,
            })
        );
    }

    #[test]
    fn test_parse_attack_with_aliases() {
        assert_eq!(
            parse_command("a 0 9").expect("valid command"),
            Command::Intent(Intent::Attack { row: 0, col: 9 })
        );
        assert_eq!(
            parse_command("ATTACK 5 5").expect("valid command"),
            Command::Intent(Intent::Attack { row: 5, col: 5 })
        );
    }

    #[test]
    fn test_coordinates_clamp_into_range() {
        // The input surface clamps; the controller trusts that
        assert_eq!(
            parse_command("attack 12 40").expect("valid command"),
            Command::Intent(Intent::Attack { row: 9, col: 9 })
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            parse_command("mode").expect("valid"),
            Command::Intent(Intent::ToggleAttackMode)
        );
        assert_eq!(parse_command("board").expect("valid"), Command::ShowBoards);
        assert_eq!(parse_command("?").expect("valid"), Command::Help);
        assert_eq!(parse_command("quit").expect("valid"), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_command("").is_err());
        assert!(parse_command("fire 1 1").is_err());
        assert!(parse_command("place dinghy h 0 0").is_err());
        assert!(parse_command("place carrier d 0 0").is_err());
        assert!(parse_command("attack one two").is_err());
        assert!(parse_command("place carrier h").is_err());
    }

    #[test]
    fn test_render_board_glyphs() {
        let mut board = Board::new();
        board.set(1, 0, CellState::Ship);
        board.set(1, 1, CellState::Hit);
        board.set(1, 2, CellState::Miss);

        let rendered = render_board(&board);
        let rows: Vec<&str> = rendered.lines().collect();
        // Header + one line per board row
        assert_eq!(rows.len(), 1 + BOARD_SIZE);
        assert!(rows[0].contains('9'));
        assert!(rows[2].starts_with(" 1 S X o ."));
    }

    #[test]
    fn test_render_frame_formats_notices() {
        let frame = ViewFrame {
            snapshot: GameSnapshot {
                own_board: Board::new(),
                opponent_board: Board::new(),
                phase: GamePhase::Placing,
                connected: true,
                winner: None,
            },
            fresh_log: vec!["Connected to server".to_string()],
            notices: vec![crate::game::Notice {
                kind: NoticeKind::Error,
                text: "Invalid ship placement".to_string(),
            }],
        };

        let rendered = render_frame(&frame);
        assert!(rendered.contains("Connected to server\n"));
        assert!(rendered.contains("error: Invalid ship placement\n"));
    }

    #[test]
    fn test_render_boards_status_line() {
        let snapshot = GameSnapshot {
            own_board: Board::new(),
            opponent_board: Board::new(),
            phase: GamePhase::Over,
            connected: false,
            winner: Some("player2".to_string()),
        };

        let rendered = render_boards(&snapshot);
        assert!(rendered.contains("phase: game over | disconnected | winner: player2"));
    }
}
