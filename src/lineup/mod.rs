pub mod types;
pub mod eligibility;
pub mod termination;
pub mod must_start;
pub mod stack;
pub mod search;
pub mod validate;
pub mod request;
pub mod optimizer;

pub use types::{Lineup, LineupSlot, PartialLineup, Player, SlotSource};
pub use eligibility::{is_eligible, PositionMapping, PositionRules};
pub use termination::Termination;
pub use stack::{StackSpec, StrategyAdvisor, StrategyTable};
pub use request::{AssignmentEntry, OptimizationRequest, OptimizationResponse};
pub use optimizer::{filter_pool, Optimizer};
