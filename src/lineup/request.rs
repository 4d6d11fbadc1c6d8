use serde::{Serialize, Deserialize};
use crate::error::OptimizeError;
use super::stack::StackSpec;
use super::types::{Lineup, SlotSource};

fn default_true() -> bool {
    true
}

/// One optimization request; immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    #[serde(default)]
    pub pool_scope_id: String,
    /// Slot labels to fill; empty means the configured roster
    #[serde(default)]
    pub slot_requirements: Vec<String>,
    /// Budget; absent means the configured cap
    #[serde(default)]
    pub salary_cap: Option<i64>,
    /// Maximize projected score (true) or fill evenly toward the cap (false)
    #[serde(default = "default_true")]
    pub maximize_score: bool,
    #[serde(default)]
    pub allow_list: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_list: Vec<String>,
    #[serde(default)]
    pub must_start_players: Vec<String>,
    #[serde(default)]
    pub opponent_rank_threshold: Option<u32>,
    #[serde(default)]
    pub stack: Option<StackSpec>,
}

impl OptimizationRequest {
    pub fn new(pool_scope_id: &str) -> Self {
        Self {
            pool_scope_id: pool_scope_id.to_string(),
            slot_requirements: Vec::new(),
            salary_cap: None,
            maximize_score: true,
            allow_list: None,
            exclude_list: Vec::new(),
            must_start_players: Vec::new(),
            opponent_rank_threshold: None,
            stack: None,
        }
    }

    pub fn needs_slate_size(&self) -> bool {
        self.stack.as_ref().is_some_and(|s| s.is_auto())
    }
}

/// One row of a successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEntry {
    pub slot_label: String,
    pub player_id: String,
    pub name: String,
    pub team: String,
    pub salary: i64,
    pub score: f64,
    pub source: SlotSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Vec<AssignmentEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_salary: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}

impl OptimizationResponse {
    pub fn success(lineup: &Lineup) -> Self {
        let assignment = lineup
            .slots
            .iter()
            .map(|s| AssignmentEntry {
                slot_label: s.slot_label.clone(),
                player_id: s.player_id.clone(),
                name: s.name.clone(),
                team: s.team.clone(),
                salary: s.salary,
                score: s.score,
                source: s.source,
            })
            .collect();
        Self {
            success: true,
            message: format!(
                "Lineup built: {} players, salary {}, projected {:.2}",
                lineup.slots.len(),
                lineup.total_salary,
                lineup.total_score
            ),
            error_kind: None,
            assignment: Some(assignment),
            total_salary: Some(lineup.total_salary),
            total_score: Some(lineup.total_score),
        }
    }

    /// Upstream faults are reported with a generic message; details stay in the logs
    pub fn failure(error: &OptimizeError) -> Self {
        let message = match error {
            OptimizeError::UpstreamData(_) => "Player data is unavailable right now, please try again later".to_string(),
            other => other.to_string(),
        };
        Self {
            success: false,
            message,
            error_kind: Some(error.kind().to_string()),
            assignment: None,
            total_salary: None,
            total_score: None,
        }
    }
}
