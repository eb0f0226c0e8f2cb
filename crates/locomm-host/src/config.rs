//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the protocol engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long one transaction attempt waits for its response before the
    /// request is re-sent.
    pub response_timeout: Duration,
    /// How long the dispatcher sleeps when the port has no bytes ready.
    pub poll_interval: Duration,
    /// Total attempts (first send included) before a transaction fails.
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            response_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
            max_attempts: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let config = EngineConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert!(config.poll_interval < config.response_timeout);
    }
}
