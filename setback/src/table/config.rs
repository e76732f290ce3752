//! Table configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::DEFAULT_TARGET_SCORE;

/// A table setting that can't be used
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct InvalidTableConfig {
    pub field: &'static str,
    pub reason: &'static str,
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name, used in logs and the health summary
    pub name: String,

    /// Score a team must reach to win the game (default: 52)
    pub target_score: i32,

    /// Capacity of the actor's action queue
    pub inbox_capacity: usize,

    /// Capacity of each connection's outbound queue. A connection whose
    /// queue fills up is treated as stalled and dropped.
    pub outbound_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Setback".to_string(),
            target_score: DEFAULT_TARGET_SCORE,
            inbox_capacity: 100,
            outbound_capacity: 256,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), InvalidTableConfig> {
        if self.target_score <= 0 {
            return Err(InvalidTableConfig {
                field: "target_score",
                reason: "Must be greater than 0",
            });
        }

        if self.inbox_capacity == 0 {
            return Err(InvalidTableConfig {
                field: "inbox_capacity",
                reason: "Must be greater than 0",
            });
        }

        if self.outbound_capacity == 0 {
            return Err(InvalidTableConfig {
                field: "outbound_capacity",
                reason: "Must be greater than 0",
            });
        }

        Ok(())
    }
}
