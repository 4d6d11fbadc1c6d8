use tracing::debug;
use crate::error::{OptimizeError, Result};
use super::eligibility::PositionRules;
use super::types::{PartialLineup, Player, SlotSource};

/// Pins must-start players into compatible slots before the search runs.
///
/// Pitchers go first, each into the first open pitcher-labeled slot, since those slots
/// are the scarcest. Everyone else follows in the order given, into the first open slot
/// they are eligible for. The returned lineup carries the locked slots, the salary they
/// consume and the remaining open slots.
pub fn pin_must_starts(
    pool: &[Player],
    rules: &PositionRules,
    labels: Vec<String>,
    salary_cap: i64,
    must_start_ids: &[String],
) -> Result<PartialLineup> {
    let mut lineup = PartialLineup::new(labels, pool.len(), salary_cap);

    // Resolve ids to pool indices, ignoring repeats
    let mut pinned: Vec<usize> = Vec::with_capacity(must_start_ids.len());
    for id in must_start_ids {
        let index = pool
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| OptimizeError::InfeasiblePin {
                player_id: id.clone(),
                reason: "not in the candidate pool".to_string(),
            })?;
        if !pinned.contains(&index) {
            pinned.push(index);
        }
    }

    let pinned_salary: i64 = pinned.iter().map(|&i| pool[i].salary).sum();
    if pinned_salary > salary_cap {
        return Err(OptimizeError::SalaryCapExceededByPins {
            pinned_salary,
            salary_cap,
        });
    }

    let (pitchers, others): (Vec<usize>, Vec<usize>) =
        pinned.into_iter().partition(|&i| rules.is_pitcher(&pool[i]));

    for player in pitchers {
        let slot = lineup
            .open_slots()
            .into_iter()
            .find(|&s| rules.is_pitcher_slot(lineup.label(s)) && rules.is_eligible(&pool[player], lineup.label(s)))
            .ok_or_else(|| OptimizeError::InfeasiblePin {
                player_id: pool[player].id.clone(),
                reason: "no open pitcher slot".to_string(),
            })?;
        lineup.place(slot, player, pool, SlotSource::Pinned);
        debug!(player = %pool[player].id, slot = lineup.label(slot), "pinned pitcher");
    }

    for player in others {
        let slot = lineup
            .open_slots()
            .into_iter()
            .find(|&s| rules.is_eligible(&pool[player], lineup.label(s)))
            .ok_or_else(|| OptimizeError::InfeasiblePin {
                player_id: pool[player].id.clone(),
                reason: format!("no open slot accepts positions {:?}", pool[player].positions),
            })?;
        lineup.place(slot, player, pool, SlotSource::Pinned);
        debug!(player = %pool[player].id, slot = lineup.label(slot), "pinned player");
    }

    Ok(lineup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::eligibility::PositionMapping;
    use crate::lineup::types::fixtures::{labels, player};

    fn rules() -> PositionRules {
        let mapping = PositionMapping::new()
            .with_group("P", &["SP", "RP"])
            .with_group("OF", &["LF", "CF", "RF"])
            .with_group("UTIL", &["C", "1B", "2B", "3B", "SS", "LF", "CF", "RF", "OF"]);
        PositionRules::new(mapping, vec!["SP".into(), "RP".into(), "P".into()])
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_pins_over_cap_before_placing() {
        let pool = vec![
            player("c", "NYY", "C", 30000, 9.0),
            player("p", "BOS", "SP", 25000, 20.0),
        ];
        let err = pin_must_starts(&pool, &rules(), labels(&["P", "C"]), 50000, &ids(&["c", "p"]))
            .unwrap_err();
        assert_eq!(
            err,
            OptimizeError::SalaryCapExceededByPins {
                pinned_salary: 55000,
                salary_cap: 50000
            }
        );
    }

    #[test]
    fn pitchers_are_placed_first() {
        // The hitter is listed first but the pitcher still takes the only P slot
        let pool = vec![
            player("h", "NYY", "OF", 4000, 9.0),
            player("p", "BOS", "SP", 9000, 20.0),
        ];
        let lineup = pin_must_starts(&pool, &rules(), labels(&["OF", "P", "UTIL"]), 50000, &ids(&["h", "p"]))
            .unwrap();
        assert_eq!(lineup.assigned(1), Some((1, SlotSource::Pinned)));
        assert_eq!(lineup.assigned(0), Some((0, SlotSource::Pinned)));
        assert_eq!(lineup.open_slots(), vec![2]);
        assert_eq!(lineup.salary_used(), 13000);
    }

    #[test]
    fn hitters_take_first_eligible_slot_in_caller_order() {
        let pool = vec![
            player("a", "NYY", "LF", 4000, 9.0),
            player("b", "NYY", "RF", 4100, 9.5),
        ];
        let lineup = pin_must_starts(&pool, &rules(), labels(&["C", "UTIL", "OF"]), 50000, &ids(&["b", "a"]))
            .unwrap();
        // b claims UTIL (first eligible open slot), a then lands in OF
        assert_eq!(lineup.assigned(1), Some((1, SlotSource::Pinned)));
        assert_eq!(lineup.assigned(2), Some((0, SlotSource::Pinned)));
        assert_eq!(lineup.open_slots(), vec![0]);
    }

    #[test]
    fn second_pitcher_without_slot_is_infeasible() {
        let pool = vec![
            player("p1", "NYY", "SP", 9000, 20.0),
            player("p2", "BOS", "SP", 8000, 18.0),
        ];
        let err = pin_must_starts(&pool, &rules(), labels(&["P", "UTIL"]), 50000, &ids(&["p1", "p2"]))
            .unwrap_err();
        assert!(matches!(err, OptimizeError::InfeasiblePin { ref player_id, .. } if player_id == "p2"));
    }

    #[test]
    fn unknown_must_start_is_infeasible() {
        let pool = vec![player("a", "NYY", "C", 3000, 5.0)];
        let err = pin_must_starts(&pool, &rules(), labels(&["C"]), 50000, &ids(&["ghost"])).unwrap_err();
        assert_eq!(err.kind(), "InfeasiblePin");
    }

    #[test]
    fn repeated_ids_pin_once() {
        let pool = vec![player("a", "NYY", "C", 3000, 5.0)];
        let lineup = pin_must_starts(&pool, &rules(), labels(&["C", "UTIL"]), 50000, &ids(&["a", "a"])).unwrap();
        assert_eq!(lineup.salary_used(), 3000);
        assert_eq!(lineup.open_slots(), vec![1]);
    }
}
