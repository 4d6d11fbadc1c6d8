use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use crate::error::{OptimizeError, Result};
use super::eligibility::PositionRules;
use super::termination::Termination;
use super::types::{PartialLineup, Player, SlotSource};

/// Branching bounds for the maximize-score search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates tried as the first placement of each seed slot (K)
    pub seed_width: usize,
    /// Candidates tried per subsequent slot (M)
    pub branch_width: usize,
    /// Wall-clock budget for one run; 0 disables it
    pub time_limit_ms: u64,
    /// Budget of seeds and nodes visited in one run; 0 disables it
    pub node_limit: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed_width: 20,
            branch_width: 15,
            time_limit_ms: 5000,
            node_limit: 0,
        }
    }
}

#[derive(Debug, Default)]
struct SearchStats {
    seeds: usize,
    nodes: usize,
    complete: usize,
}

/// Candidate lists for the open slots, built once against the starting budget
struct SlotCandidates {
    /// slot index -> pool indices ordered by projected score, best first
    by_slot: Vec<Vec<usize>>,
}

impl SlotCandidates {
    fn build(pool: &[Player], rules: &PositionRules, lineup: &PartialLineup, open: &[usize]) -> Self {
        let budget = lineup.remaining_budget();
        let mut by_slot = vec![Vec::new(); lineup.slot_count()];
        for &slot in open {
            let label = lineup.label(slot);
            let mut list: Vec<usize> = (0..pool.len())
                .filter(|&i| !lineup.is_used(i) && pool[i].salary <= budget && rules.is_eligible(&pool[i], label))
                .collect();
            // Stable sort keeps pool order among equal scores
            list.sort_by(|&a, &b| pool[b].score().total_cmp(&pool[a].score()));
            by_slot[slot] = list;
        }
        Self { by_slot }
    }

    fn get(&self, slot: usize) -> &[usize] {
        &self.by_slot[slot]
    }
}

/// Fills the open slots maximizing total projected score.
///
/// Every open slot takes a turn as the seed: each of its top `seed_width` candidates is
/// placed first, then the remaining slots are completed depth-first in roster order,
/// trying at most `branch_width` affordable candidates per slot and backtracking when a
/// slot runs dry. The first complete fill of each seed branch is scored and the best one
/// across all branches wins. This is a bounded heuristic, not an exhaustive search.
pub fn maximize_score(
    pool: &[Player],
    rules: &PositionRules,
    start: &PartialLineup,
    config: &SearchConfig,
    termination: &Termination,
) -> Result<PartialLineup> {
    let open = start.open_slots();
    if open.is_empty() {
        return Ok(start.clone());
    }

    let candidates = SlotCandidates::build(pool, rules, start, &open);
    if let Some(&slot) = open.iter().find(|&&s| candidates.get(s).is_empty()) {
        return Err(OptimizeError::NoEligibleCandidate {
            slot_label: start.label(slot).to_string(),
            slot_index: slot,
        });
    }

    let mut stats = SearchStats::default();
    let mut best: Option<(f64, PartialLineup)> = None;
    let mut terminated = false;

    'seeds: for &seed_slot in &open {
        let rest: Vec<usize> = open.iter().copied().filter(|&s| s != seed_slot).collect();

        for &seed in candidates.get(seed_slot).iter().take(config.seed_width) {
            if termination.is_terminated() {
                terminated = true;
                break 'seeds;
            }
            stats.seeds += 1;

            let mut draft = start.clone();
            draft.place(seed_slot, seed, pool, SlotSource::Searched);
            if complete(pool, &candidates, &mut draft, &rest, config.branch_width, termination, &mut stats) {
                stats.complete += 1;
                let score = draft.total_score(pool);
                // Strictly better only, so the earliest branch wins ties
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    debug!(seed_slot = draft.label(seed_slot), seed = %pool[seed].id, score, "new best lineup");
                    best = Some((score, draft));
                }
            } else if termination.is_terminated() {
                terminated = true;
                break 'seeds;
            }
        }
    }

    info!(
        seeds = stats.seeds,
        nodes = stats.nodes,
        complete = stats.complete,
        terminated,
        best_score = best.as_ref().map(|(s, _)| *s),
        "score search finished"
    );

    match best {
        Some((_, lineup)) => Ok(lineup),
        None if terminated => Err(OptimizeError::TimedOut),
        None => Err(OptimizeError::InfeasibleLineup(format!(
            "no combination of the top {} seeds and top {} branches fills {} open slots within a budget of {}",
            config.seed_width,
            config.branch_width,
            open.len(),
            start.remaining_budget()
        ))),
    }
}

/// Depth-first completion of `rest[..]`; leaves `lineup` filled on success and
/// restored on failure
fn complete(
    pool: &[Player],
    candidates: &SlotCandidates,
    lineup: &mut PartialLineup,
    rest: &[usize],
    branch_width: usize,
    termination: &Termination,
    stats: &mut SearchStats,
) -> bool {
    let Some((&slot, tail)) = rest.split_first() else {
        return true;
    };
    stats.nodes += 1;
    if termination.is_terminated() || !can_still_fill(pool, candidates, lineup, rest) {
        return false;
    }

    let budget = lineup.remaining_budget();
    let branch: Vec<usize> = candidates
        .get(slot)
        .iter()
        .copied()
        .filter(|&i| !lineup.is_used(i) && pool[i].salary <= budget)
        .take(branch_width)
        .collect();

    for player in branch {
        lineup.place(slot, player, pool, SlotSource::Searched);
        if complete(pool, candidates, lineup, tail, branch_width, termination, stats) {
            return true;
        }
        lineup.unplace(slot, pool);
    }
    false
}

/// Lower bound check: every remaining slot needs an unused candidate, and the cheapest
/// such candidates together must fit the budget.
fn can_still_fill(pool: &[Player], candidates: &SlotCandidates, lineup: &PartialLineup, rest: &[usize]) -> bool {
    let mut floor = 0i64;
    for &slot in rest {
        let cheapest = candidates
            .get(slot)
            .iter()
            .filter(|&&i| !lineup.is_used(i))
            .map(|&i| pool[i].salary)
            .min();
        match cheapest {
            Some(salary) => floor += salary,
            None => return false,
        }
    }
    floor <= lineup.remaining_budget()
}

/// Fills the open slots aiming to spend the budget evenly.
///
/// One pass in roster order: each slot takes the unused, eligible, affordable player whose
/// salary is closest to the remaining budget split over the remaining slots, preferring
/// the higher projection on ties. No backtracking.
pub fn fill_to_cap(pool: &[Player], rules: &PositionRules, start: &PartialLineup) -> Result<PartialLineup> {
    let mut lineup = start.clone();
    let open = lineup.open_slots();

    for (filled, &slot) in open.iter().enumerate() {
        let slots_left = (open.len() - filled) as i64;
        let budget = lineup.remaining_budget();
        let target = budget / slots_left;
        let label = lineup.label(slot);

        let choice = (0..pool.len())
            .filter(|&i| !lineup.is_used(i) && pool[i].salary <= budget && rules.is_eligible(&pool[i], label))
            .min_by(|&a, &b| {
                let gap_a = (pool[a].salary - target).abs();
                let gap_b = (pool[b].salary - target).abs();
                gap_a
                    .cmp(&gap_b)
                    .then_with(|| pool[b].score().total_cmp(&pool[a].score()))
                    .then_with(|| a.cmp(&b))
            });

        match choice {
            Some(player) => {
                debug!(slot = label, player = %pool[player].id, target, "filled slot");
                lineup.place(slot, player, pool, SlotSource::Filled);
            }
            None => {
                return Err(OptimizeError::NoEligibleCandidate {
                    slot_label: label.to_string(),
                    slot_index: slot,
                });
            }
        }
    }

    Ok(lineup)
}
