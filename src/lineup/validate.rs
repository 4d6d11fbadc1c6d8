use std::collections::HashSet;
use tracing::warn;
use crate::error::{OptimizeError, Result};
use super::eligibility::PositionRules;
use super::types::{Lineup, LineupSlot, PartialLineup, Player};

fn violation(constraint: &str, player_id: Option<&str>) -> OptimizeError {
    warn!(constraint, player = player_id, "lineup failed validation");
    OptimizeError::Validation {
        constraint: constraint.to_string(),
        player_id: player_id.map(str::to_string),
    }
}

/// Re-checks every hard constraint on a produced lineup and builds the finished result.
///
/// Independent of how the lineup was built: slot count, one eligible player per slot,
/// no repeated player, salary within the cap, every must-start present.
pub fn finalize(
    pool: &[Player],
    rules: &PositionRules,
    lineup: &PartialLineup,
    required_slots: &[String],
    salary_cap: i64,
    must_start_ids: &[String],
) -> Result<Lineup> {
    if lineup.slot_count() != required_slots.len() || lineup.labels() != required_slots {
        return Err(violation("slot count", None));
    }

    let mut slots = Vec::with_capacity(required_slots.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for (slot, label) in required_slots.iter().enumerate() {
        let Some((index, source)) = lineup.assigned(slot) else {
            return Err(violation(&format!("slot {} unfilled", label), None));
        };
        let player = &pool[index];
        if !seen.insert(player.id.as_str()) {
            return Err(violation("duplicate player", Some(player.id.as_str())));
        }
        if !rules.is_eligible(player, label) {
            return Err(violation(&format!("not eligible for {}", label), Some(player.id.as_str())));
        }
        slots.push(LineupSlot {
            slot_label: label.clone(),
            player_id: player.id.clone(),
            name: player.name.clone(),
            team: player.team.clone(),
            salary: player.salary,
            score: player.score(),
            source,
        });
    }

    let total_salary: i64 = slots.iter().map(|s| s.salary).sum();
    if total_salary > salary_cap {
        return Err(violation(&format!("salary {} exceeds cap {}", total_salary, salary_cap), None));
    }

    if let Some(missing) = must_start_ids.iter().find(|id| !seen.contains(id.as_str())) {
        return Err(violation("must-start missing", Some(missing.as_str())));
    }

    let total_score = slots.iter().map(|s| s.score).sum();
    Ok(Lineup {
        slots,
        total_salary,
        total_score,
    })
}
