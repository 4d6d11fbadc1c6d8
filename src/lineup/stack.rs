use std::str::FromStr;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use crate::error::{OptimizeError, Result};
use super::eligibility::PositionRules;
use super::types::{PartialLineup, Player, SlotSource};

/// Win rates within this many points of the best are treated as contenders
const CONTENDER_MARGIN: f64 = 0.05;

/// Stacking preference as it arrives on a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    /// One or two teams to stack
    pub groups: Vec<String>,
    /// "X-Y", "X" or "auto"; absent means "auto"
    #[serde(default)]
    pub sizes: Option<String>,
}

impl StackSpec {
    pub fn is_auto(&self) -> bool {
        self.sizes
            .as_deref()
            .map_or(true, |s| s.trim().eq_ignore_ascii_case("auto"))
    }
}

/// Parsed stack sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSizes {
    Explicit { primary: usize, secondary: Option<usize> },
    Auto,
}

impl FromStr for StackSizes {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(StackSizes::Auto);
        }
        let parse = |part: &str| -> Result<usize> {
            match part.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(OptimizeError::Configuration(format!("malformed stack size '{}'", s))),
            }
        };
        match s.split_once('-') {
            Some((primary, secondary)) => Ok(StackSizes::Explicit {
                primary: parse(primary)?,
                secondary: Some(parse(secondary)?),
            }),
            None => Ok(StackSizes::Explicit {
                primary: parse(s)?,
                secondary: None,
            }),
        }
    }
}

/// A configuration's historical win rate, as a fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRate {
    pub config: String,
    pub win_rate: f64,
}

/// One row of the historical strategy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTableEntry {
    pub slate_size: u32,
    pub config: String,
    pub win_rate: f64,
}

/// Source of historical stacking win rates
pub trait StrategyAdvisor: Send + Sync {
    /// Win rates recorded for the given number of games, in table order
    fn win_rates(&self, slate_size: u32) -> Vec<StrategyRate>;
}

/// Static win-rate table; lookups fall back to the closest recorded slate size
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyTable {
    entries: Vec<StrategyTableEntry>,
}

impl StrategyTable {
    pub fn new(entries: Vec<StrategyTableEntry>) -> Self {
        Self { entries }
    }

    /// Historical MLB stacking results by slate size
    pub fn builtin() -> Self {
        const ROWS: &[(u32, &str, f64)] = &[
            (2, "4-4", 0.121), (2, "5-3", 0.114), (2, "4-3", 0.098), (2, "5-2", 0.087),
            (3, "4-4", 0.109), (3, "5-3", 0.112), (3, "4-3", 0.095), (3, "4-2", 0.081),
            (4, "5-3", 0.104), (4, "4-4", 0.097), (4, "4-3", 0.093), (4, "4-2", 0.078),
            (5, "5-3", 0.097), (5, "4-3", 0.101), (5, "5-2", 0.088), (5, "4-2", 0.074),
            (6, "5-3", 0.091), (6, "4-3", 0.096), (6, "5-2", 0.089), (6, "4-2", 0.071),
            (8, "5-3", 0.089), (8, "5-2", 0.093), (8, "4-3", 0.084), (8, "4-2", 0.066),
            (10, "5-3", 0.086), (10, "5-2", 0.083), (10, "4-3", 0.079), (10, "3-3", 0.058),
            (12, "5-3", 0.084), (12, "5-2", 0.078), (12, "4-4", 0.071), (12, "4-3", 0.075),
            (15, "5-3", 0.081), (15, "5-2", 0.074), (15, "4-4", 0.069), (15, "4-3", 0.072),
        ];
        Self::new(
            ROWS.iter()
                .map(|&(slate_size, config, win_rate)| StrategyTableEntry {
                    slate_size,
                    config: config.to_string(),
                    win_rate,
                })
                .collect(),
        )
    }

    /// Recorded slate size nearest to `slate_size`, ties going to the smaller one
    fn closest_slate_size(&self, slate_size: u32) -> Option<u32> {
        self.entries
            .iter()
            .map(|e| e.slate_size)
            .min_by_key(|&size| (size.abs_diff(slate_size), size))
    }
}

impl StrategyAdvisor for StrategyTable {
    fn win_rates(&self, slate_size: u32) -> Vec<StrategyRate> {
        let Some(size) = self.closest_slate_size(slate_size) else {
            return Vec::new();
        };
        if size != slate_size {
            debug!(requested = slate_size, used = size, "no strategy rows for slate size, using closest");
        }
        self.entries
            .iter()
            .filter(|e| e.slate_size == size)
            .map(|e| StrategyRate {
                config: e.config.clone(),
                win_rate: e.win_rate,
            })
            .collect()
    }
}

/// Picks the stack configuration with the highest historical win rate for the slate.
///
/// Ties and near-ties resolve to the highest rate, earliest in table order.
pub fn recommend_sizes(advisor: &dyn StrategyAdvisor, games_in_slate: u32) -> Result<StackSizes> {
    let rates = advisor.win_rates(games_in_slate);
    let best = rates
        .iter()
        .fold(None::<&StrategyRate>, |best, rate| match best {
            Some(b) if b.win_rate >= rate.win_rate => Some(b),
            _ => Some(rate),
        })
        .ok_or_else(|| OptimizeError::Configuration(format!("no stacking strategy recorded for a {}-game slate", games_in_slate)))?;

    let contenders: Vec<&str> = rates
        .iter()
        .filter(|r| best.win_rate - r.win_rate <= CONTENDER_MARGIN)
        .map(|r| r.config.as_str())
        .collect();
    info!(games = games_in_slate, config = %best.config, win_rate = best.win_rate, ?contenders, "recommended stack");

    match best.config.parse::<StackSizes>()? {
        StackSizes::Auto => Err(OptimizeError::Configuration(format!("strategy '{}' is not a size", best.config))),
        sizes => Ok(sizes),
    }
}

/// Minimum number of non-pitchers required from one team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequirement {
    pub team: String,
    pub count: usize,
}

/// One way of assigning sizes to teams, primary first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOrdering {
    pub requirements: Vec<StackRequirement>,
}

impl StackOrdering {
    pub fn describe(&self) -> String {
        self.requirements
            .iter()
            .map(|r| format!("{} x{}", r.team, r.count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Resolves a stack spec into the team orderings to try.
///
/// Two teams yield two orderings (A primary then B primary); one team yields one.
/// `games_in_slate` is only consulted for "auto".
pub fn resolve_stack(
    spec: &StackSpec,
    advisor: &dyn StrategyAdvisor,
    games_in_slate: Option<u32>,
) -> Result<Vec<StackOrdering>> {
    let groups: Vec<String> = spec
        .groups
        .iter()
        .map(|g| g.trim().to_uppercase())
        .filter(|g| !g.is_empty())
        .collect();
    let sizes = match spec.sizes.as_deref() {
        Some(s) => s.parse::<StackSizes>()?,
        None => StackSizes::Auto,
    };

    let (primary, secondary) = match sizes {
        StackSizes::Explicit { primary, secondary } => (primary, secondary),
        StackSizes::Auto => {
            let games = games_in_slate
                .ok_or_else(|| OptimizeError::Configuration("auto stack needs the number of games in the slate".to_string()))?;
            match recommend_sizes(advisor, games)? {
                // A single team only takes the primary size of the recommendation
                StackSizes::Explicit { primary, secondary } if groups.len() == 2 => (primary, secondary),
                StackSizes::Explicit { primary, .. } => (primary, None),
                StackSizes::Auto => {
                    return Err(OptimizeError::Configuration("strategy table recommended no sizes".to_string()))
                }
            }
        }
    };

    let requirement = |team: &str, count: usize| StackRequirement {
        team: team.to_string(),
        count,
    };

    match (groups.as_slice(), secondary) {
        ([], _) => Err(OptimizeError::Configuration("stack requested without a team".to_string())),
        ([team], None) => Ok(vec![StackOrdering {
            requirements: vec![requirement(team, primary)],
        }]),
        ([_], Some(_)) => Err(OptimizeError::Configuration(format!(
            "two-team stack {}-{} requested with only one team",
            primary,
            secondary.unwrap_or_default()
        ))),
        ([a, b], Some(secondary)) => {
            if a == b {
                return Err(OptimizeError::Configuration(format!("stack teams must differ, got {} twice", a)));
            }
            Ok(vec![
                StackOrdering {
                    requirements: vec![requirement(a, primary), requirement(b, secondary)],
                },
                StackOrdering {
                    requirements: vec![requirement(b, primary), requirement(a, secondary)],
                },
            ])
        }
        ([_, _], None) => Err(OptimizeError::Configuration(format!(
            "two teams need an X-Y stack size, got {}",
            primary
        ))),
        _ => Err(OptimizeError::Configuration(format!("at most two stack teams, got {}", groups.len()))),
    }
}

/// Seats `player` in an open eligible slot, moving already stacked players between slots
/// when that frees one up. Pinned and searched slots are never touched.
fn seat(pool: &[Player], rules: &PositionRules, lineup: &mut PartialLineup, player: usize, visited: &mut [bool]) -> bool {
    let eligible: Vec<usize> = (0..lineup.slot_count())
        .filter(|&s| !visited[s] && rules.is_eligible(&pool[player], lineup.label(s)))
        .collect();

    if let Some(&slot) = eligible.iter().find(|&&s| lineup.assigned(s).is_none()) {
        lineup.place(slot, player, pool, SlotSource::Stacked);
        return true;
    }

    for slot in eligible {
        let Some((holder, SlotSource::Stacked)) = lineup.assigned(slot) else {
            continue;
        };
        visited[slot] = true;
        lineup.unplace(slot, pool);
        if seat(pool, rules, lineup, holder, visited) {
            lineup.place(slot, player, pool, SlotSource::Stacked);
            return true;
        }
        lineup.place(slot, holder, pool, SlotSource::Stacked);
    }
    false
}

/// Places stack players for one ordering into `lineup`.
///
/// Non-pitchers already locked to a team count toward its requirement. The rest come from
/// the unused pool, best projection first, each into the first open slot it is eligible
/// for and can afford; a player with no open slot left may shift earlier stack players
/// into other slots they also qualify for.
pub fn apply_stack(
    pool: &[Player],
    rules: &PositionRules,
    lineup: &mut PartialLineup,
    ordering: &StackOrdering,
) -> Result<()> {
    for req in &ordering.requirements {
        let locked = lineup
            .filled()
            .filter(|&(_, p, _)| pool[p].team.eq_ignore_ascii_case(&req.team) && !rules.is_pitcher(&pool[p]))
            .count();
        let mut needed = req.count.saturating_sub(locked);

        let mut candidates: Vec<usize> = (0..pool.len())
            .filter(|&i| !lineup.is_used(i) && pool[i].team.eq_ignore_ascii_case(&req.team) && !rules.is_pitcher(&pool[i]))
            .collect();
        candidates.sort_by(|&a, &b| pool[b].score().total_cmp(&pool[a].score()));

        for player in candidates {
            if needed == 0 {
                break;
            }
            let budget = lineup.remaining_budget();
            if pool[player].salary > budget {
                continue;
            }
            let mut visited = vec![false; lineup.slot_count()];
            if seat(pool, rules, lineup, player, &mut visited) {
                needed -= 1;
            }
        }

        if needed > 0 {
            return Err(OptimizeError::StackUnsatisfied(format!(
                "{} needs {} non-pitchers but only {} fit",
                req.team,
                req.count,
                req.count - needed
            )));
        }
        debug!(team = %req.team, count = req.count, locked, "stack placed");
    }
    Ok(())
}

/// Runs `attempt` for every ordering and keeps the feasible result with the highest score.
///
/// Earlier orderings win ties. When every ordering fails, a stack-depth failure is
/// reported with the reason for each ordering; otherwise the first error is returned.
pub fn best_of_orderings<T, F, S>(orderings: &[StackOrdering], mut attempt: F, score: S) -> Result<T>
where
    F: FnMut(&StackOrdering) -> Result<T>,
    S: Fn(&T) -> f64,
{
    let mut best: Option<(f64, T)> = None;
    let mut failures: Vec<(String, OptimizeError)> = Vec::new();

    for ordering in orderings {
        match attempt(ordering) {
            Ok(result) => {
                let value = score(&result);
                debug!(ordering = %ordering.describe(), score = value, "stack ordering feasible");
                if best.as_ref().map_or(true, |(b, _)| value > *b) {
                    best = Some((value, result));
                }
            }
            Err(e) => {
                warn!(ordering = %ordering.describe(), error = %e, "stack ordering failed");
                failures.push((ordering.describe(), e));
            }
        }
    }

    if let Some((_, result)) = best {
        return Ok(result);
    }
    if failures.iter().any(|(_, e)| matches!(e, OptimizeError::StackUnsatisfied(_))) {
        let reasons: Vec<String> = failures
            .iter()
            .map(|(ordering, e)| format!("[{}] {}", ordering, e))
            .collect();
        return Err(OptimizeError::StackUnsatisfied(reasons.join("; ")));
    }
    match failures.into_iter().next() {
        Some((_, e)) => Err(e),
        None => Err(OptimizeError::Configuration("no stack ordering to try".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::eligibility::PositionMapping;
    use crate::lineup::types::fixtures::{labels, player};

    fn spec(groups: &[&str], sizes: Option<&str>) -> StackSpec {
        StackSpec {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            sizes: sizes.map(|s| s.to_string()),
        }
    }

    fn rules() -> PositionRules {
        let mapping = PositionMapping::new()
            .with_group("P", &["SP", "RP"])
            .with_group("OF", &["LF", "CF", "RF"])
            .with_group("UTIL", &["C", "1B", "2B", "3B", "SS", "LF", "CF", "RF", "OF"]);
        PositionRules::new(mapping, vec!["SP".into(), "RP".into()])
    }

    #[test]
    fn parses_sizes() {
        assert_eq!("5-3".parse::<StackSizes>().unwrap(), StackSizes::Explicit { primary: 5, secondary: Some(3) });
        assert_eq!(" 4 ".parse::<StackSizes>().unwrap(), StackSizes::Explicit { primary: 4, secondary: None });
        assert_eq!("Auto".parse::<StackSizes>().unwrap(), StackSizes::Auto);
        assert_eq!("5-x".parse::<StackSizes>().unwrap_err().kind(), "ConfigurationError");
        assert_eq!("0-2".parse::<StackSizes>().unwrap_err().kind(), "ConfigurationError");
    }

    #[test]
    fn two_team_size_with_one_team_is_configuration_error() {
        let err = resolve_stack(&spec(&["NYY"], Some("5-3")), &StrategyTable::builtin(), None).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn two_teams_yield_both_orderings() {
        let orderings = resolve_stack(&spec(&["NYY", "BOS"], Some("4-2")), &StrategyTable::builtin(), None).unwrap();
        assert_eq!(orderings.len(), 2);
        assert_eq!(orderings[0].describe(), "NYY x4, BOS x2");
        assert_eq!(orderings[1].describe(), "BOS x4, NYY x2");
    }

    #[test]
    fn auto_uses_best_rate_for_slate() {
        let sizes = recommend_sizes(&StrategyTable::builtin(), 6).unwrap();
        assert_eq!(sizes, StackSizes::Explicit { primary: 4, secondary: Some(3) });
    }

    #[test]
    fn auto_falls_back_to_closest_smaller_slate() {
        let table = StrategyTable::new(vec![
            StrategyTableEntry { slate_size: 4, config: "4-4".into(), win_rate: 0.10 },
            StrategyTableEntry { slate_size: 8, config: "5-2".into(), win_rate: 0.12 },
        ]);
        // 6 is equidistant from 4 and 8; the smaller wins
        assert_eq!(table.win_rates(6)[0].config, "4-4");
        assert_eq!(table.win_rates(7)[0].config, "5-2");
        assert_eq!(table.win_rates(40)[0].config, "5-2");
    }

    #[test]
    fn near_ties_pick_highest_then_table_order() {
        let table = StrategyTable::new(vec![
            StrategyTableEntry { slate_size: 5, config: "4-3".into(), win_rate: 0.10 },
            StrategyTableEntry { slate_size: 5, config: "5-3".into(), win_rate: 0.11 },
            StrategyTableEntry { slate_size: 5, config: "5-2".into(), win_rate: 0.11 },
        ]);
        for _ in 0..3 {
            assert_eq!(
                recommend_sizes(&table, 5).unwrap(),
                StackSizes::Explicit { primary: 5, secondary: Some(3) }
            );
        }
    }

    #[test]
    fn auto_with_one_team_takes_primary_size() {
        let orderings = resolve_stack(&spec(&["NYY"], None), &StrategyTable::builtin(), Some(6)).unwrap();
        assert_eq!(orderings, vec![StackOrdering { requirements: vec![StackRequirement { team: "NYY".into(), count: 4 }] }]);
    }

    #[test]
    fn auto_without_slate_size_is_configuration_error() {
        let err = resolve_stack(&spec(&["NYY", "BOS"], Some("auto")), &StrategyTable::builtin(), None).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn locked_players_reduce_requirement() {
        let pool = vec![
            player("a1", "A", "C", 3000, 5.0),
            player("a2", "A", "SS", 3000, 9.0),
            player("a3", "A", "LF", 3000, 7.0),
            player("ap", "A", "SP", 9000, 20.0),
        ];
        let mut lineup = PartialLineup::new(labels(&["P", "C", "SS", "OF"]), pool.len(), 50000);
        lineup.place(1, 0, &pool, SlotSource::Pinned);
        lineup.place(0, 3, &pool, SlotSource::Pinned);

        let ordering = StackOrdering { requirements: vec![StackRequirement { team: "A".into(), count: 2 }] };
        apply_stack(&pool, &rules(), &mut lineup, &ordering).unwrap();
        // Pinned catcher counts, the pitcher does not; one more from A, best projection first
        assert_eq!(lineup.assigned(2), Some((1, SlotSource::Stacked)));
        assert_eq!(lineup.open_slots(), vec![3]);
    }

    #[test]
    fn multi_position_player_moves_aside_for_teammate() {
        let pool = vec![
            player("a1", "A", "C/1B", 3000, 10.0),
            player("a2", "A", "1B", 3000, 9.0),
        ];
        let mut lineup = PartialLineup::new(labels(&["1B", "C"]), pool.len(), 50000);
        let ordering = StackOrdering { requirements: vec![StackRequirement { team: "A".into(), count: 2 }] };
        apply_stack(&pool, &rules(), &mut lineup, &ordering).unwrap();
        assert_eq!(lineup.assigned(0), Some((1, SlotSource::Stacked)));
        assert_eq!(lineup.assigned(1), Some((0, SlotSource::Stacked)));
        assert_eq!(lineup.salary_used(), 6000);
    }

    #[test]
    fn pinned_slots_are_not_reshuffled() {
        let pool = vec![
            player("a1", "A", "C/1B", 3000, 10.0),
            player("a2", "A", "1B", 3000, 9.0),
            player("x", "B", "C", 3000, 5.0),
        ];
        let mut lineup = PartialLineup::new(labels(&["1B", "C"]), pool.len(), 50000);
        lineup.place(1, 2, &pool, SlotSource::Pinned);
        let ordering = StackOrdering { requirements: vec![StackRequirement { team: "A".into(), count: 2 }] };
        let err = apply_stack(&pool, &rules(), &mut lineup, &ordering).unwrap_err();
        assert_eq!(err.kind(), "StackUnsatisfied");
        assert_eq!(lineup.assigned(1), Some((2, SlotSource::Pinned)));
    }

    #[test]
    fn team_match_ignores_case() {
        let pool = vec![
            player("a1", "nyy", "C", 3000, 5.0),
            player("a2", "Nyy", "SS", 3000, 9.0),
        ];
        let mut lineup = PartialLineup::new(labels(&["C", "SS"]), pool.len(), 50000);
        let orderings = resolve_stack(&spec(&["NYY"], Some("2")), &StrategyTable::builtin(), None).unwrap();
        apply_stack(&pool, &rules(), &mut lineup, &orderings[0]).unwrap();
        assert!(lineup.is_complete());
    }

    #[test]
    fn shallow_team_fails_stack() {
        let pool = vec![
            player("b1", "B", "C", 3000, 5.0),
            player("bp", "B", "SP", 9000, 20.0),
        ];
        let mut lineup = PartialLineup::new(labels(&["P", "C", "UTIL"]), pool.len(), 50000);
        let ordering = StackOrdering { requirements: vec![StackRequirement { team: "B".into(), count: 2 }] };
        let err = apply_stack(&pool, &rules(), &mut lineup, &ordering).unwrap_err();
        assert_eq!(err, OptimizeError::StackUnsatisfied("B needs 2 non-pitchers but only 1 fit".to_string()));
    }

    #[test]
    fn best_of_orderings_tries_every_ordering() {
        let orderings = resolve_stack(&spec(&["A", "B"], Some("4-2")), &StrategyTable::builtin(), None).unwrap();
        let mut tried = Vec::new();
        let err = best_of_orderings(
            &orderings,
            |o| {
                tried.push(o.describe());
                Err::<f64, _>(OptimizeError::StackUnsatisfied(format!("{} too shallow", o.requirements[1].team)))
            },
            |v| *v,
        )
        .unwrap_err();
        assert_eq!(tried, vec!["A x4, B x2", "B x4, A x2"]);
        assert_eq!(err.kind(), "StackUnsatisfied");
        assert!(err.to_string().contains("[A x4, B x2]"));
        assert!(err.to_string().contains("[B x4, A x2]"));
    }

    #[test]
    fn best_of_orderings_keeps_higher_score() {
        let orderings = resolve_stack(&spec(&["A", "B"], Some("3-2")), &StrategyTable::builtin(), None).unwrap();
        let result = best_of_orderings(
            &orderings,
            |o| Ok(if o.requirements[0].team == "A" { 10.0 } else { 12.5 }),
            |v| *v,
        )
        .unwrap();
        assert_eq!(result, 12.5);

        // Only the second ordering feasible
        let result = best_of_orderings(
            &orderings,
            |o| {
                if o.requirements[0].team == "A" {
                    Err(OptimizeError::InfeasibleLineup("no".into()))
                } else {
                    Ok(7.0)
                }
            },
            |v| *v,
        )
        .unwrap();
        assert_eq!(result, 7.0);
    }
}
