//! Application-wide constants for broadside.
//!
//! This module centralizes all magic numbers and configuration constants
//! to improve maintainability and discoverability. Constants are grouped
//! by domain with documentation explaining their purpose.
//!
//! # Categories
//!
//! - **Game**: Board geometry shared by the codec, the boards, and the views
//! - **Transport**: WebSocket endpoint and handshake limits
//! - **Reconnect**: Retry pacing for the session's reconnect policies

use std::time::Duration;

// ============================================================================
// Game
// ============================================================================

/// Board dimension (the grid is `BOARD_SIZE` x `BOARD_SIZE`).
///
/// The server speaks 10x10 boards exclusively; both board payload
/// validation and coordinate clamping in the console derive from this.
pub const BOARD_SIZE: usize = 10;

// ============================================================================
// Transport
// ============================================================================

/// Default server endpoint.
///
/// The game server exposes a single WebSocket route. Overridable via
/// config, environment, or the `--server-url` flag.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";

/// WebSocket handshake timeout.
///
/// Bounds a single connect attempt so an unresponsive endpoint cannot
/// stall the reconnect loop indefinitely. 10 seconds covers slow links
/// without masking a dead server for long.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Reconnect
// ============================================================================

/// Default delay between reconnect attempts for the fixed-delay policy.
///
/// The default session policy retries indefinitely at this pace,
/// preferring eventual reconnection over backing off.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// First delay of the backoff reconnect policy.
pub const INITIAL_BACKOFF_DELAY: Duration = Duration::from_secs(1);

/// Ceiling for the backoff reconnect policy.
///
/// Doubling stops here so a long outage settles into a steady retry
/// cadence instead of growing unbounded.
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(30);

/// Upper bound of the random jitter added to each backoff delay.
///
/// Spreads reconnect attempts from clients that lost the same server
/// at the same moment.
pub const BACKOFF_JITTER: Duration = Duration::from_millis(1000);
