//! Runtime configuration.
//!
//! The session lives entirely in memory, so there is no config file:
//! defaults come from [`crate::constants`], overridden by `BROADSIDE_*`
//! environment variables, overridden in turn by CLI flags in `main`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::{ReconnectPolicy, SessionConfig};
use crate::constants::{DEFAULT_RECONNECT_DELAY, DEFAULT_SERVER_URL};
use crate::game::ControllerConfig;
use crate::ws;

/// Configuration for the broadside client.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Game server endpoint. `http(s)` schemes are normalized to `ws(s)`.
    pub server_url: String,
    /// Delay between reconnect attempts, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Use exponential backoff instead of a fixed reconnect delay.
    pub reconnect_backoff: bool,
    /// Stop reconnecting after this many consecutive failures.
    /// `0` means retry forever (the default contract).
    pub reconnect_max_attempts: u32,
    /// Forward placement intents even after game over; the server stays
    /// the arbiter. `false` rejects them locally instead.
    pub forward_placement_when_over: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            reconnect_backoff: false,
            reconnect_max_attempts: 0,
            forward_placement_when_over: true,
        }
    }
}

impl Config {
    /// Defaults with environment variable overrides applied.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(server_url) = std::env::var("BROADSIDE_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Ok(delay) = std::env::var("BROADSIDE_RECONNECT_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.reconnect_delay_ms = ms;
            }
        }

        if let Ok(backoff) = std::env::var("BROADSIDE_RECONNECT_BACKOFF") {
            if let Ok(enabled) = backoff.parse::<bool>() {
                self.reconnect_backoff = enabled;
            }
        }

        if let Ok(attempts) = std::env::var("BROADSIDE_RECONNECT_MAX_ATTEMPTS") {
            if let Ok(max) = attempts.parse::<u32>() {
                self.reconnect_max_attempts = max;
            }
        }

        if let Ok(forward) = std::env::var("BROADSIDE_FORWARD_PLACEMENT_WHEN_OVER") {
            if let Ok(enabled) = forward.parse::<bool>() {
                self.forward_placement_when_over = enabled;
            }
        }
    }

    /// Reconnect policy implied by the knobs.
    ///
    /// Precedence: a bounded attempt count wins over backoff, backoff
    /// wins over the fixed delay.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        if self.reconnect_max_attempts > 0 {
            ReconnectPolicy::BoundedAttempts {
                attempts: self.reconnect_max_attempts,
                delay: Duration::from_millis(self.reconnect_delay_ms),
            }
        } else if self.reconnect_backoff {
            ReconnectPolicy::backoff()
        } else {
            ReconnectPolicy::FixedDelay(Duration::from_millis(self.reconnect_delay_ms))
        }
    }

    /// Session connection parameters.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: ws::to_ws_scheme(&self.server_url),
            policy: self.reconnect_policy(),
        }
    }

    /// Controller behavior switches.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            forward_placement_when_over: self.forward_placement_when_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "ws://localhost:8080/ws");
        assert_eq!(config.reconnect_delay_ms, 1000);
        assert!(!config.reconnect_backoff);
        assert_eq!(config.reconnect_max_attempts, 0);
        assert!(config.forward_placement_when_over);
    }

    #[test]
    fn test_default_policy_is_indefinite_fixed_delay() {
        let config = Config::default();
        assert_eq!(
            config.reconnect_policy(),
            ReconnectPolicy::FixedDelay(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_backoff_flag_selects_backoff_policy() {
        let config = Config {
            reconnect_backoff: true,
            ..Config::default()
        };
        assert!(matches!(
            config.reconnect_policy(),
            ReconnectPolicy::Backoff { .. }
        ));
    }

    #[test]
    fn test_bounded_attempts_take_precedence() {
        let config = Config {
            reconnect_backoff: true,
            reconnect_max_attempts: 5,
            reconnect_delay_ms: 250,
            ..Config::default()
        };
        assert_eq!(
            config.reconnect_policy(),
            ReconnectPolicy::BoundedAttempts {
                attempts: 5,
                delay: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_session_config_normalizes_scheme() {
        let config = Config {
            server_url: "http://example.com/ws".to_string(),
            ..Config::default()
        };
        assert_eq!(config.session_config().url, "ws://example.com/ws");
    }
}
