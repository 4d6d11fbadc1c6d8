//! Optimizer configuration.
//!
//! Everything has a default, so a missing file only means the built-in roster,
//! search bounds, position groups and strategy table are used.
//!
//! ```
//! use lineup_optimizer::config::OptimizerConfig;
//!
//! let config = OptimizerConfig::from_toml_str(r#"
//!     salary_cap = 50000
//!     slots = ["P", "P", "C", "1B", "2B", "3B", "SS", "OF", "OF", "OF"]
//!
//!     [search]
//!     seed_width = 10
//!     time_limit_ms = 2000
//!
//!     [positions]
//!     OF = ["LF", "CF", "RF"]
//! "#).unwrap();
//!
//! assert_eq!(config.slots.len(), 10);
//! assert_eq!(config.search.seed_width, 10);
//! assert_eq!(config.search.branch_width, 15);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lineup::eligibility::{normalize_tag, PositionMapping, PositionRules};
use crate::lineup::search::SearchConfig;
use crate::lineup::stack::{StrategyTable, StrategyTableEntry};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Cap used when a request does not name one
    pub salary_cap: i64,

    /// Roster used when a request does not list its slots
    pub slots: Vec<String>,

    pub search: SearchConfig,

    /// Flexible slot label -> raw position tags
    pub positions: PositionMapping,

    /// Tags that make a player a pitcher
    pub pitcher_tags: Vec<String>,

    /// Replaces the built-in win-rate table when non-empty
    pub strategy: Vec<StrategyTableEntry>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let hitters = ["C", "1B", "2B", "3B", "SS", "OF", "LF", "CF", "RF"];
        Self {
            salary_cap: 35000,
            slots: ["P", "C/1B", "2B", "3B", "SS", "OF", "OF", "OF", "UTIL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            search: SearchConfig::default(),
            positions: PositionMapping::new()
                .with_group("P", &["SP", "RP"])
                .with_group("C/1B", &["C", "1B"])
                .with_group("OF", &["LF", "CF", "RF"])
                .with_group("UTIL", &hitters),
            pitcher_tags: vec!["P".to_string(), "SP".to_string(), "RP".to_string()],
            strategy: Vec::new(),
        }
    }
}

impl OptimizerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read, holds invalid TOML, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string; slot labels are normalized
    /// the same way position tags are.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(s)?;
        config.slots = config.slots.iter().map(|label| normalize_tag(label)).collect();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.salary_cap <= 0 {
            return Err(ConfigError::Invalid(format!("salary_cap must be positive, got {}", self.salary_cap)));
        }
        if self.slots.is_empty() {
            return Err(ConfigError::Invalid("slots must not be empty".to_string()));
        }
        if self.search.seed_width == 0 || self.search.branch_width == 0 {
            return Err(ConfigError::Invalid("search widths must be at least 1".to_string()));
        }
        if let Some(entry) = self.strategy.iter().find(|e| !(0.0..=1.0).contains(&e.win_rate)) {
            return Err(ConfigError::Invalid(format!(
                "win rate for {} on {} games must be a fraction, got {}",
                entry.config, entry.slate_size, entry.win_rate
            )));
        }
        Ok(())
    }

    pub fn rules(&self) -> PositionRules {
        PositionRules::new(self.positions.clone(), self.pitcher_tags.iter().cloned())
    }

    pub fn strategy_table(&self) -> StrategyTable {
        if self.strategy.is_empty() {
            StrategyTable::builtin()
        } else {
            StrategyTable::new(self.strategy.clone())
        }
    }
}
