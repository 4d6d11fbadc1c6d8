use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

/// A candidate player, loaded once per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team: String,
    /// Normalized eligibility tags, e.g. {"1B", "OF"}
    pub positions: BTreeSet<String>,
    pub salary: i64,
    pub projected_points: Option<f64>,
    pub active: bool,
    /// Opponent-strength ordinal; lower means a more favorable matchup
    pub opponent_rank: Option<u32>,
    pub opponent: Option<String>,
}

impl Player {
    /// Projected score used by the objective; missing projections count as zero
    pub fn score(&self) -> f64 {
        self.projected_points.unwrap_or(0.0)
    }
}

/// Why a slot holds the player it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSource {
    Pinned,
    Stacked,
    Searched,
    Filled,
}

/// Slot-by-slot assignment under construction.
///
/// Players are referenced by index into the pool slice the lineup was built against,
/// so backtracking is a matter of `place`/`unplace` rather than copying lists.
#[derive(Debug, Clone)]
pub struct PartialLineup {
    labels: Vec<String>,
    assigned: Vec<Option<(usize, SlotSource)>>,
    used: Vec<bool>,
    salary_cap: i64,
    salary_used: i64,
}

impl PartialLineup {
    pub fn new(labels: Vec<String>, pool_len: usize, salary_cap: i64) -> Self {
        let slot_count = labels.len();
        Self {
            labels,
            assigned: vec![None; slot_count],
            used: vec![false; pool_len],
            salary_cap,
            salary_used: 0,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, slot: usize) -> &str {
        &self.labels[slot]
    }

    pub fn slot_count(&self) -> usize {
        self.labels.len()
    }

    pub fn salary_cap(&self) -> i64 {
        self.salary_cap
    }

    pub fn salary_used(&self) -> i64 {
        self.salary_used
    }

    pub fn remaining_budget(&self) -> i64 {
        self.salary_cap - self.salary_used
    }

    pub fn is_used(&self, player: usize) -> bool {
        self.used[player]
    }

    pub fn assigned(&self, slot: usize) -> Option<(usize, SlotSource)> {
        self.assigned[slot]
    }

    /// Indices of unfilled slots, in roster order
    pub fn open_slots(&self) -> Vec<usize> {
        self.assigned
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.assigned.iter().all(|a| a.is_some())
    }

    /// Assigned pool indices with their slot, in roster order
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize, SlotSource)> + '_ {
        self.assigned
            .iter()
            .enumerate()
            .filter_map(|(slot, a)| a.map(|(player, source)| (slot, player, source)))
    }

    pub fn place(&mut self, slot: usize, player: usize, pool: &[Player], source: SlotSource) {
        debug_assert!(self.assigned[slot].is_none(), "slot {} already filled", slot);
        debug_assert!(!self.used[player], "player {} already placed", player);
        self.assigned[slot] = Some((player, source));
        self.used[player] = true;
        self.salary_used += pool[player].salary;
    }

    pub fn unplace(&mut self, slot: usize, pool: &[Player]) {
        if let Some((player, _)) = self.assigned[slot].take() {
            self.used[player] = false;
            self.salary_used -= pool[player].salary;
        }
    }

    pub fn total_score(&self, pool: &[Player]) -> f64 {
        self.filled().map(|(_, player, _)| pool[player].score()).sum()
    }
}

/// One filled roster slot in a finished lineup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupSlot {
    pub slot_label: String,
    pub player_id: String,
    pub name: String,
    pub team: String,
    pub salary: i64,
    pub score: f64,
    pub source: SlotSource,
}

/// A validated lineup with its totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lineup {
    pub slots: Vec<LineupSlot>,
    pub total_salary: i64,
    pub total_score: f64,
}

impl Lineup {
    pub fn player_ids(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.player_id.as_str()).collect()
    }
}
