//! Player pool and slate metadata sources.
//!
//! The optimizer only sees these traits; `SlateStore` is the in-memory implementation
//! the CLI and web server load CSV pools into.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{OptimizeError, Result};
use crate::lineup::Player;

/// Supplies the candidate pool for a scope, already free of inactive players
pub trait PlayerPoolProvider {
    fn fetch_pool(&self, pool_scope_id: &str) -> Result<Vec<Player>>;
}

/// Supplies the number of games in a scope's slate
pub trait SlateMetadataProvider {
    fn games_in_slate(&self, pool_scope_id: &str) -> Result<u32>;
}

#[derive(Debug, Clone)]
pub struct Slate {
    pub players: Vec<Player>,
    pub games: u32,
    pub loaded_at: DateTime<Utc>,
}

impl Slate {
    /// `games` falls back to the distinct team/opponent pairings, then to half the teams
    pub fn new(players: Vec<Player>, games: Option<u32>) -> Self {
        let games = games.unwrap_or_else(|| count_games(&players));
        Self {
            players,
            games,
            loaded_at: Utc::now(),
        }
    }

    pub fn summary(&self, pool_scope_id: &str) -> SlateSummary {
        let mut by_team: HashMap<String, usize> = HashMap::new();
        let mut by_position: HashMap<String, usize> = HashMap::new();
        for player in &self.players {
            *by_team.entry(player.team.clone()).or_insert(0) += 1;
            for tag in &player.positions {
                *by_position.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        SlateSummary {
            pool_scope_id: pool_scope_id.to_string(),
            players: self.players.len(),
            games: self.games,
            loaded_at: self.loaded_at,
            by_team,
            by_position,
        }
    }
}

fn count_games(players: &[Player]) -> u32 {
    let pairings: BTreeSet<(String, String)> = players
        .iter()
        .filter_map(|p| {
            let opponent = p.opponent.clone()?;
            let team = p.team.clone();
            Some(if team <= opponent { (team, opponent) } else { (opponent, team) })
        })
        .collect();
    if !pairings.is_empty() {
        return pairings.len() as u32;
    }
    let teams: BTreeSet<&str> = players.iter().map(|p| p.team.as_str()).collect();
    (teams.len() as u32).div_ceil(2)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlateSummary {
    pub pool_scope_id: String,
    pub players: usize,
    pub games: u32,
    pub loaded_at: DateTime<Utc>,
    pub by_team: HashMap<String, usize>,
    pub by_position: HashMap<String, usize>,
}

/// In-memory slates keyed by pool scope id
#[derive(Debug, Default)]
pub struct SlateStore {
    slates: Mutex<HashMap<String, Slate>>,
}

impl SlateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pool_scope_id: &str, slate: Slate) -> Result<()> {
        info!(scope = pool_scope_id, players = slate.players.len(), games = slate.games, "slate stored");
        self.lock()?.insert(pool_scope_id.to_string(), slate);
        Ok(())
    }

    pub fn summary(&self, pool_scope_id: &str) -> Result<Option<SlateSummary>> {
        Ok(self.lock()?.get(pool_scope_id).map(|s| s.summary(pool_scope_id)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Slate>>> {
        self.slates
            .lock()
            .map_err(|_| OptimizeError::UpstreamData("slate store lock poisoned".to_string()))
    }

    fn with_slate<T>(&self, pool_scope_id: &str, f: impl FnOnce(&Slate) -> T) -> Result<T> {
        let slates = self.lock()?;
        slates
            .get(pool_scope_id)
            .map(f)
            .ok_or_else(|| OptimizeError::UpstreamData(format!("no slate loaded for scope '{}'", pool_scope_id)))
    }
}

impl PlayerPoolProvider for SlateStore {
    fn fetch_pool(&self, pool_scope_id: &str) -> Result<Vec<Player>> {
        self.with_slate(pool_scope_id, |s| s.players.iter().filter(|p| p.active).cloned().collect())
    }
}

impl SlateMetadataProvider for SlateStore {
    fn games_in_slate(&self, pool_scope_id: &str) -> Result<u32> {
        self.with_slate(pool_scope_id, |s| s.games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::types::fixtures::player;

    #[test]
    fn games_from_opponent_pairings() {
        let mut a = player("1", "NYY", "C", 3000, 5.0);
        a.opponent = Some("BOS".into());
        let mut b = player("2", "BOS", "C", 3000, 5.0);
        b.opponent = Some("NYY".into());
        let mut c = player("3", "SEA", "C", 3000, 5.0);
        c.opponent = Some("HOU".into());
        assert_eq!(Slate::new(vec![a, b, c], None).games, 2);
    }

    #[test]
    fn games_from_team_count_without_opponents() {
        let players = vec![
            player("1", "NYY", "C", 3000, 5.0),
            player("2", "BOS", "C", 3000, 5.0),
            player("3", "SEA", "C", 3000, 5.0),
        ];
        assert_eq!(Slate::new(players.clone(), None).games, 2);
        assert_eq!(Slate::new(players, Some(6)).games, 6);
    }

    #[test]
    fn store_serves_pool_and_games() {
        let store = SlateStore::new();
        let mut benched = player("2", "BOS", "C", 3000, 5.0);
        benched.active = false;
        store
            .insert("main", Slate::new(vec![player("1", "NYY", "C", 3000, 5.0), benched], Some(4)))
            .unwrap();

        assert_eq!(store.fetch_pool("main").unwrap().len(), 1);
        assert_eq!(store.games_in_slate("main").unwrap(), 4);
        assert_eq!(store.fetch_pool("late").unwrap_err().kind(), "UpstreamDataError");

        let summary = store.summary("main").unwrap().unwrap();
        assert_eq!(summary.players, 2);
        assert_eq!(summary.by_position["C"], 2);
    }
}
