use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use super::types::Player;

/// Slot label -> raw position tags that satisfy it (e.g. "OF" -> {LF, CF, RF})
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, BTreeSet<String>>", into = "BTreeMap<String, BTreeSet<String>>")]
pub struct PositionMapping {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl From<BTreeMap<String, BTreeSet<String>>> for PositionMapping {
    fn from(raw: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (label, tags) in raw {
            groups
                .entry(normalize_tag(&label))
                .or_default()
                .extend(tags.iter().map(|t| normalize_tag(t)));
        }
        Self { groups }
    }
}

impl From<PositionMapping> for BTreeMap<String, BTreeSet<String>> {
    fn from(mapping: PositionMapping) -> Self {
        mapping.groups
    }
}

impl PositionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or extends) a flexible group for `label`
    pub fn with_group(mut self, label: &str, tags: &[&str]) -> Self {
        self.groups
            .entry(normalize_tag(label))
            .or_default()
            .extend(tags.iter().map(|t| normalize_tag(t)));
        self
    }

    pub fn group(&self, label: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(label)
    }
}

/// Uppercases and trims a raw position tag
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Splits a delimited position string ("1B/OF", "C,1B", "SP|RP") into a normalized tag set
pub fn parse_positions(raw: &str) -> BTreeSet<String> {
    raw.split(['/', ',', '|'])
        .map(normalize_tag)
        .filter(|t| !t.is_empty())
        .collect()
}

/// True if the player may fill a slot with the given label.
///
/// Matches when the label is one of the player's tags, or when the mapping defines the
/// label as a flexible group that shares at least one tag with the player.
pub fn is_eligible(player: &Player, slot_label: &str, mapping: &PositionMapping) -> bool {
    if player.positions.contains(slot_label) {
        return true;
    }
    mapping
        .group(slot_label)
        .map(|group| group.iter().any(|tag| player.positions.contains(tag)))
        .unwrap_or(false)
}

/// Position mapping plus the tags that mark pitchers
#[derive(Debug, Clone, Default)]
pub struct PositionRules {
    pub mapping: PositionMapping,
    pub pitcher_tags: BTreeSet<String>,
}

impl PositionRules {
    pub fn new(mapping: PositionMapping, pitcher_tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            mapping,
            pitcher_tags: pitcher_tags.into_iter().map(|t| normalize_tag(&t)).collect(),
        }
    }

    pub fn is_eligible(&self, player: &Player, slot_label: &str) -> bool {
        is_eligible(player, slot_label, &self.mapping)
    }

    pub fn is_pitcher(&self, player: &Player) -> bool {
        player.positions.iter().any(|tag| self.pitcher_tags.contains(tag))
    }

    /// A slot is pitcher-labeled if its label is a pitcher tag, or its group holds only pitcher tags
    pub fn is_pitcher_slot(&self, slot_label: &str) -> bool {
        if self.pitcher_tags.contains(slot_label) {
            return true;
        }
        match self.mapping.group(slot_label) {
            Some(group) => !group.is_empty() && group.iter().all(|tag| self.pitcher_tags.contains(tag)),
            None => false,
        }
    }
}
