use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::lineup::eligibility::parse_positions;
use crate::lineup::Player;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// Column positions, located by header name
struct Columns {
    id: usize,
    name: usize,
    team: usize,
    positions: usize,
    salary: usize,
    projection: Option<usize>,
    active: Option<usize>,
    opponent_rank: Option<usize>,
    opponent: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, PoolError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase().replace([' ', '-'], "_"))
            .collect();
        let find = |aliases: &[&str]| normalized.iter().position(|h| aliases.contains(&h.as_str()));
        let require = |aliases: &[&str], name: &'static str| find(aliases).ok_or(PoolError::MissingColumn(name));

        Ok(Self {
            id: require(&["id", "player_id", "playerid"], "id")?,
            name: require(&["name", "full_name", "nickname", "player_name"], "name")?,
            team: require(&["team", "team_abbrev", "teamabbrev"], "team")?,
            positions: require(&["position", "positions", "pos", "roster_position"], "position")?,
            salary: require(&["salary", "cost"], "salary")?,
            projection: find(&["projection", "projected_points", "fppg", "points", "ppg"]),
            active: find(&["active", "is_active", "status"]),
            opponent_rank: find(&["opponent_rank", "opp_rank", "matchup_rank"]),
            opponent: find(&["opponent", "opp"]),
        })
    }
}

/// Parses a yes/true/1 style flag; "active"/"playing" status strings count too
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1" || lower == "active" || lower == "playing"
}

/// Parses a non-negative salary, tolerating "$" and thousands separators
fn parse_salary(value: &str) -> Option<i64> {
    value
        .trim()
        .trim_start_matches('$')
        .replace(',', "")
        .parse()
        .ok()
        .filter(|salary: &i64| *salary >= 0)
}

fn parse_optional<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.map(str::trim).filter(|v| !v.is_empty()).and_then(|v| v.parse().ok())
}

/// Reads a player pool from CSV.
///
/// Rows without an id or name, or with an unreadable salary, are skipped; a later row
/// for the same id replaces the earlier one, and inactive players are left out. Position strings are normalized to
/// tag sets here so nothing downstream re-parses them.
pub fn parse_pool<R: Read>(reader: R) -> Result<Vec<Player>, PoolError> {
    let mut reader = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
    let columns = Columns::locate(reader.headers()?)?;

    let mut order: Vec<String> = Vec::new();
    let mut players: HashMap<String, Player> = HashMap::new();
    let mut inactive = 0usize;
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;
        let field = |col: usize| record.get(col).unwrap_or("").trim();

        let id = field(columns.id).to_string();
        let name = field(columns.name).to_string();
        if id.is_empty() || name.is_empty() {
            continue;
        }

        let active = columns.active.map(|c| parse_bool(field(c))).unwrap_or(true);
        if !active {
            inactive += 1;
            players.remove(&id);
            continue;
        }

        let Some(salary) = parse_salary(field(columns.salary)) else {
            warn!(player = %id, salary = field(columns.salary), "unreadable salary, row skipped");
            skipped += 1;
            continue;
        };

        let player = Player {
            id: id.clone(),
            name,
            team: field(columns.team).to_uppercase(),
            positions: parse_positions(field(columns.positions)),
            salary,
            projected_points: parse_optional(columns.projection.map(field)),
            active,
            opponent_rank: parse_optional(columns.opponent_rank.map(field)),
            opponent: columns
                .opponent
                .map(field)
                .filter(|o| !o.is_empty())
                .map(|o| o.to_uppercase()),
        };

        if players.insert(id.clone(), player).is_some() {
            debug!(player = %id, "duplicate row replaces earlier entry");
        } else {
            order.push(id);
        }
    }

    let pool: Vec<Player> = order.into_iter().filter_map(|id| players.remove(&id)).collect();
    info!(players = pool.len(), inactive, skipped, "loaded player pool");
    Ok(pool)
}

/// Loads a player pool from a CSV file
pub fn load_pool<P: AsRef<Path>>(csv_path: P) -> Result<Vec<Player>, PoolError> {
    let file = std::fs::File::open(csv_path)?;
    parse_pool(file)
}
