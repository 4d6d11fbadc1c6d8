//! Salary-capped lineup optimizer.
//!
//! Assigns players from a candidate pool to roster slots under a salary cap,
//! honoring per-slot eligibility, pinned must-start players and optional team
//! stacks, while maximizing total projected points.
//!
//! ```text
//! CSV pool -> filter -> pin must-starts -> stack (both orderings) -> search -> validate
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod lineup;
pub mod parser;
pub mod provider;
pub mod web;

pub use config::OptimizerConfig;
pub use error::{OptimizeError, Result};
pub use lineup::{Lineup, OptimizationRequest, OptimizationResponse, Optimizer, Player};
