//! Error types for lineup optimization

use thiserror::Error;

/// Every way an optimization run can fail.
///
/// Expected infeasibility is reported through these variants and turned into a
/// structured failure response; only `UpstreamData` represents an unexpected fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// Malformed or contradictory request (bad stack spec, excluded must-start, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A must-start player could not be placed in any open slot
    #[error("Cannot pin player {player_id}: {reason}")]
    InfeasiblePin { player_id: String, reason: String },

    /// Must-start salaries alone exceed the cap
    #[error("Must-start players cost {pinned_salary}, which exceeds the salary cap of {salary_cap}")]
    SalaryCapExceededByPins { pinned_salary: i64, salary_cap: i64 },

    /// A slot had nobody unused, eligible and affordable during the fill
    #[error("No eligible candidate for slot {slot_label} (position {slot_index})")]
    NoEligibleCandidate { slot_label: String, slot_index: usize },

    /// Every seed and branch was explored without completing a lineup
    #[error("Infeasible lineup: {0}")]
    InfeasibleLineup(String),

    /// A stack's group-size requirement could not be met in any group ordering
    #[error("Stack requirement unmet: {0}")]
    StackUnsatisfied(String),

    /// The produced assignment broke a hard constraint
    #[error("Lineup failed validation ({constraint}){}", .player_id.as_deref().map(|p| format!(": player {p}")).unwrap_or_default())]
    Validation {
        constraint: String,
        player_id: Option<String>,
    },

    /// Deadline or cancellation hit before any complete lineup was found
    #[error("Search terminated before a complete lineup was found")]
    TimedOut,

    /// Pool or slate metadata could not be fetched
    #[error("Upstream data error: {0}")]
    UpstreamData(String),
}

impl OptimizeError {
    /// Stable machine-readable kind, carried in failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizeError::Configuration(_) => "ConfigurationError",
            OptimizeError::InfeasiblePin { .. } => "InfeasiblePin",
            OptimizeError::SalaryCapExceededByPins { .. } => "SalaryCapExceededByPins",
            OptimizeError::NoEligibleCandidate { .. } => "NoEligibleCandidate",
            OptimizeError::InfeasibleLineup(_) => "InfeasibleLineup",
            OptimizeError::StackUnsatisfied(_) => "StackUnsatisfied",
            OptimizeError::Validation { .. } => "ValidationFailed",
            OptimizeError::TimedOut => "TimedOut",
            OptimizeError::UpstreamData(_) => "UpstreamDataError",
        }
    }
}

/// Result type alias for optimization operations
pub type Result<T> = std::result::Result<T, OptimizeError>;
