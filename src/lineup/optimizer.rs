use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, Result};
use crate::provider::{PlayerPoolProvider, SlateMetadataProvider};
use super::eligibility::{normalize_tag, PositionRules};
use super::must_start::pin_must_starts;
use super::request::{OptimizationRequest, OptimizationResponse};
use super::search::{fill_to_cap, maximize_score};
use super::stack::{apply_stack, best_of_orderings, resolve_stack, StrategyAdvisor};
use super::termination::Termination;
use super::types::{Lineup, PartialLineup, Player};
use super::validate::finalize;

/// Narrows the fetched pool to the players a request may use.
///
/// Inactive and excluded players always go. Must-starts survive the allow-list and rank
/// filters; a must-start that is also excluded is a contradiction in the request.
pub fn filter_pool(pool: &[Player], request: &OptimizationRequest) -> Result<Vec<Player>> {
    let must_start: HashSet<&str> = request.must_start_players.iter().map(String::as_str).collect();
    let excluded: HashSet<&str> = request.exclude_list.iter().map(String::as_str).collect();

    if let Some(id) = request.must_start_players.iter().find(|id| excluded.contains(id.as_str())) {
        return Err(OptimizeError::Configuration(format!("player {} is both must-start and excluded", id)));
    }

    let allowed: Option<HashSet<&str>> = request
        .allow_list
        .as_ref()
        .map(|ids| ids.iter().map(String::as_str).collect());

    let filtered: Vec<Player> = pool
        .iter()
        .filter(|p| {
            if !p.active || excluded.contains(p.id.as_str()) {
                return false;
            }
            if must_start.contains(p.id.as_str()) {
                return true;
            }
            if let Some(allowed) = &allowed {
                if !allowed.contains(p.id.as_str()) {
                    return false;
                }
            }
            match (request.opponent_rank_threshold, p.opponent_rank) {
                (Some(threshold), Some(rank)) => rank <= threshold,
                _ => true,
            }
        })
        .cloned()
        .collect();

    debug!(before = pool.len(), after = filtered.len(), "filtered player pool");
    Ok(filtered)
}

/// Runs the whole pipeline for one request: filter, pin, stack, search, validate
pub struct Optimizer {
    config: OptimizerConfig,
    rules: PositionRules,
    advisor: Arc<dyn StrategyAdvisor>,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        let rules = config.rules();
        let advisor = Arc::new(config.strategy_table());
        Self { config, rules, advisor }
    }

    /// Replaces the configured strategy table
    pub fn with_advisor(mut self, advisor: Arc<dyn StrategyAdvisor>) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimizes with the configured time limit
    pub fn optimize(&self, request: &OptimizationRequest, pool: &[Player], games_in_slate: Option<u32>) -> Result<Lineup> {
        let termination =
            Termination::millis(self.config.search.time_limit_ms).with_check_limit(self.config.search.node_limit);
        self.optimize_with(request, pool, games_in_slate, &termination)
    }

    pub fn optimize_with(
        &self,
        request: &OptimizationRequest,
        pool: &[Player],
        games_in_slate: Option<u32>,
        termination: &Termination,
    ) -> Result<Lineup> {
        let started = Instant::now();
        let slots: Vec<String> = if request.slot_requirements.is_empty() {
            self.config.slots.clone()
        } else {
            request.slot_requirements.iter().map(|label| normalize_tag(label)).collect()
        };
        let salary_cap = request.salary_cap.unwrap_or(self.config.salary_cap);

        // Stack problems are request errors; surface them before any work
        let orderings = match &request.stack {
            Some(spec) => Some(resolve_stack(spec, self.advisor.as_ref(), games_in_slate)?),
            None => None,
        };

        let pool = filter_pool(pool, request)?;
        let pinned = pin_must_starts(&pool, &self.rules, slots.clone(), salary_cap, &request.must_start_players)?;
        info!(
            scope = %request.pool_scope_id,
            players = pool.len(),
            slots = slots.len(),
            salary_cap,
            pinned = slots.len() - pinned.open_slots().len(),
            maximize = request.maximize_score,
            "starting optimization"
        );

        let search = |start: &PartialLineup| -> Result<PartialLineup> {
            if request.maximize_score {
                maximize_score(&pool, &self.rules, start, &self.config.search, termination)
            } else {
                fill_to_cap(&pool, &self.rules, start)
            }
        };

        let lineup = match orderings {
            Some(orderings) => best_of_orderings(
                &orderings,
                |ordering| {
                    let mut draft = pinned.clone();
                    apply_stack(&pool, &self.rules, &mut draft, ordering)?;
                    let done = search(&draft)?;
                    finalize(&pool, &self.rules, &done, &slots, salary_cap, &request.must_start_players)
                },
                |lineup| lineup.total_score,
            )?,
            None => {
                let done = search(&pinned)?;
                finalize(&pool, &self.rules, &done, &slots, salary_cap, &request.must_start_players)?
            }
        };

        info!(
            total_salary = lineup.total_salary,
            total_score = lineup.total_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lineup ready"
        );
        Ok(lineup)
    }

    /// Fetches the pool (and slate size when an auto stack needs it), optimizes, and
    /// reports the outcome as a response. Never fails; upstream faults are logged and
    /// answered with a generic message.
    pub fn run<P>(&self, request: &OptimizationRequest, provider: &P) -> OptimizationResponse
    where
        P: PlayerPoolProvider + SlateMetadataProvider,
    {
        let outcome = provider.fetch_pool(&request.pool_scope_id).and_then(|pool| {
            let games = if request.needs_slate_size() {
                Some(provider.games_in_slate(&request.pool_scope_id)?)
            } else {
                None
            };
            self.optimize(request, &pool, games)
        });

        match outcome {
            Ok(lineup) => OptimizationResponse::success(&lineup),
            Err(e @ OptimizeError::UpstreamData(_)) => {
                error!(scope = %request.pool_scope_id, error = %e, "upstream data fetch failed");
                OptimizationResponse::failure(&e)
            }
            Err(e) => {
                warn!(scope = %request.pool_scope_id, kind = e.kind(), error = %e, "optimization failed");
                OptimizationResponse::failure(&e)
            }
        }
    }
}
