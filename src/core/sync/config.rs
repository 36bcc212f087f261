/*!
 * Synchronization Configuration
 *
 * Runtime configuration for how blocked workers wait
 */

use super::spinwait::SpinWait;
use crate::core::limits::{
    DEFAULT_MAX_SPINS, DEFAULT_SPIN_DURATION, ENV_SPIN_MAX, ENV_SYNC_STRATEGY,
    LONG_WAIT_MAX_SPINS, LONG_WAIT_SPIN_DURATION, LOW_LATENCY_MAX_SPINS,
    LOW_LATENCY_SPIN_DURATION,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown wait strategy '{0}' (expected auto, park or spin)")]
    UnknownStrategy(String),

    #[error("Invalid spin count '{0}'")]
    InvalidSpinCount(String),
}

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Park on a condvar immediately
    Park,
    /// Spin briefly, then park (low latency, burns CPU on short waits)
    SpinWait,
    /// Spin on multi-core hosts, park on single-core hosts
    Auto,
}

impl FromStr for StrategyType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "park" | "condvar" => Ok(StrategyType::Park),
            "spin" | "spinwait" => Ok(StrategyType::SpinWait),
            "auto" => Ok(StrategyType::Auto),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
    /// Spin duration before parking (for SpinWait)
    pub spin_duration: Duration,
    /// Maximum spin iterations before parking
    pub max_spins: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: DEFAULT_SPIN_DURATION,
            max_spins: DEFAULT_MAX_SPINS,
        }
    }
}

impl SyncConfig {
    /// Configuration that never spins
    pub const fn park() -> Self {
        Self {
            strategy: StrategyType::Park,
            spin_duration: DEFAULT_SPIN_DURATION,
            max_spins: DEFAULT_MAX_SPINS,
        }
    }

    /// Configuration optimized for low-latency (< 1ms wait expected)
    pub const fn low_latency() -> Self {
        Self {
            strategy: StrategyType::SpinWait,
            spin_duration: LOW_LATENCY_SPIN_DURATION,
            max_spins: LOW_LATENCY_MAX_SPINS,
        }
    }

    /// Configuration optimized for long waits (> 1ms expected)
    pub const fn long_wait() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: LONG_WAIT_SPIN_DURATION,
            max_spins: LONG_WAIT_MAX_SPINS,
        }
    }

    /// Defaults overridden by `COORD_SYNC_STRATEGY` and `COORD_SPIN_MAX`
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_SYNC_STRATEGY) {
            match raw.parse::<StrategyType>() {
                Ok(strategy) => config.strategy = strategy,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_SYNC_STRATEGY),
            }
        }

        if let Ok(raw) = std::env::var(ENV_SPIN_MAX) {
            match parse_spin_count(&raw) {
                Ok(max_spins) => config.max_spins = max_spins,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_SPIN_MAX),
            }
        }

        config
    }

    /// Resolve `Auto` for the current host
    pub fn select_strategy(&self) -> StrategyType {
        match self.strategy {
            StrategyType::Auto => {
                let cores = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                if cores > 1 {
                    StrategyType::SpinWait
                } else {
                    StrategyType::Park
                }
            }
            other => other,
        }
    }

    /// Spin phase to run before parking, if the strategy spins at all
    pub fn spin_wait(&self) -> Option<SpinWait> {
        match self.select_strategy() {
            StrategyType::SpinWait if self.max_spins > 0 => {
                Some(SpinWait::new(self.spin_duration, self.max_spins))
            }
            _ => None,
        }
    }
}

fn parse_spin_count(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidSpinCount(raw.to_string()))
}
