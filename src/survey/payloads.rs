use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};


/// Original option id -> replacement option id.
pub type IdMap = HashMap<String, String>;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnswerValue {
    Text { text: String },
    Number { value: f64 },
    #[serde(rename_all = "camelCase")]
    Choice { question_items: Vec<String> },
    Grid { cells: Vec<GridCell> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub row: String,
    pub column: String,
}

impl AnswerValue {
    /// Returns true when any id was replaced.
    pub fn remap(&mut self, map: &IdMap) -> bool {
        let mut changed = false;
        match self {
            Self::Choice { question_items } => {
                for id in question_items.iter_mut() {
                    changed |= swap(id, map);
                }
            }
            Self::Grid { cells } => {
                for cell in cells.iter_mut() {
                    changed |= swap(&mut cell.row, map);
                    changed |= swap(&mut cell.column, map);
                }
            }
            Self::Text { .. } | Self::Number { .. } => {}
        }
        changed
    }

    pub fn remove_option(&mut self, option_id: &str) -> bool {
        match self {
            Self::Choice { question_items } => {
                let before = question_items.len();
                question_items.retain(|id| id != option_id);
                before != question_items.len()
            }
            Self::Grid { cells } => {
                let before = cells.len();
                cells.retain(|c| c.row != option_id && c.column != option_id);
                before != cells.len()
            }
            Self::Text { .. } | Self::Number { .. } => false,
        }
    }

    pub fn references(&self, option_id: &str) -> bool {
        match self {
            Self::Choice { question_items } => question_items.iter().any(|id| id == option_id),
            Self::Grid { cells } => cells
                .iter()
                .any(|c| c.row == option_id || c.column == option_id),
            Self::Text { .. } | Self::Number { .. } => false,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub survey_item: String,
    pub value: AnswerValue,
}


/// Aggregates keyed by option id; grid counts are row -> column -> count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StatisticData {
    Summary { responses: u64 },
    Options { counts: BTreeMap<String, u64> },
    Grid { counts: BTreeMap<String, BTreeMap<String, u64>> },
}

impl StatisticData {
    pub fn remap(&mut self, map: &IdMap) -> bool {
        match self {
            Self::Summary { .. } => false,
            Self::Options { counts } => remap_keys(counts, map),
            Self::Grid { counts } => remap_grid(counts, map),
        }
    }

    pub fn remove_option(&mut self, option_id: &str) -> bool {
        match self {
            Self::Summary { .. } => false,
            Self::Options { counts } => counts.remove(option_id).is_some(),
            Self::Grid { counts } => {
                let mut changed = counts.remove(option_id).is_some();
                for columns in counts.values_mut() {
                    changed |= columns.remove(option_id).is_some();
                }
                changed
            }
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Summary { .. } => Vec::new(),
            Self::Options { counts } => counts.keys().map(String::as_str).collect(),
            Self::Grid { counts } => counts
                .iter()
                .flat_map(|(row, cols)| {
                    std::iter::once(row.as_str()).chain(cols.keys().map(String::as_str))
                })
                .collect(),
        }
    }
}

fn swap(id: &mut String, map: &IdMap) -> bool {
    match map.get(id.as_str()) {
        Some(replacement) if *replacement != *id => {
            *id = replacement.clone();
            true
        }
        _ => false,
    }
}

fn remap_keys<V: Default + std::ops::AddAssign>(counts: &mut BTreeMap<String, V>, map: &IdMap) -> bool {
    if !counts.keys().any(|k| map.contains_key(k)) {
        return false;
    }
    let old = std::mem::take(counts);
    for (key, value) in old {
        let key = map.get(&key).cloned().unwrap_or(key);
        *counts.entry(key).or_default() += value;
    }
    true
}

/// Rows are remapped first; columns landing on the same row are summed.
fn remap_grid(counts: &mut BTreeMap<String, BTreeMap<String, u64>>, map: &IdMap) -> bool {
    let touched = counts
        .iter()
        .any(|(row, cols)| map.contains_key(row) || cols.keys().any(|c| map.contains_key(c)));
    if !touched {
        return false;
    }

    let old = std::mem::take(counts);
    for (row, mut columns) in old {
        remap_keys(&mut columns, map);
        let row = map.get(&row).cloned().unwrap_or(row);
        let merged = counts.entry(row).or_default();
        for (column, n) in columns {
            *merged.entry(column).or_default() += n;
        }
    }
    true
}
