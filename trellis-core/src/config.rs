//! Runtime configuration.
//!
//! Configuration is deliberately small: whether development diagnostics are
//! on, how many times a job may re-run inside one flush chain, and how a
//! pending flush gets executed.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default for [`RuntimeConfig::recursion_limit`].
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// How a pending flush is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// The flush runs when the host awaits [`next_tick`](crate::scheduler::next_tick)
    /// or calls [`flush_pending`](crate::scheduler::flush_pending).
    #[default]
    Manual,

    /// The flush is additionally spawned onto the current tokio `LocalSet`
    /// so it runs as soon as the current task yields.
    ///
    /// Queueing work outside of a `LocalSet` panics in this mode.
    SpawnLocal,
}

/// Per-thread runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit [`Diagnostic`](crate::Diagnostic)s and run the recursion detector.
    pub dev_mode: bool,

    /// Maximum number of runs of one job inside a single flush chain.
    pub recursion_limit: u32,

    /// How pending flushes are executed.
    pub flush_mode: FlushMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dev_mode: cfg!(debug_assertions),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            flush_mode: FlushMode::Manual,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.recursion_limit, 100);
        assert_eq!(config.flush_mode, FlushMode::Manual);
        assert_eq!(config.dev_mode, cfg!(debug_assertions));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "flush_mode": "spawn_local" }"#).unwrap();
        assert_eq!(config.flush_mode, FlushMode::SpawnLocal);
        assert_eq!(config.recursion_limit, DEFAULT_RECURSION_LIMIT);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(RuntimeConfig::from_json(r#"{ "recursion_limit": "lots" }"#).is_err());
    }
}
