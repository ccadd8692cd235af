// ABOUTME: Structural diff of two flat key/value mappings.
// ABOUTME: Classifies keys as added, removed, modified or unmodified and renders the diff block.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Classification of one key in a mapping diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unmodified,
}

/// Before/after value of a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictValue {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl DictValue {
    pub fn new(key: impl Into<String>, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            key: key.into(),
            old_value,
            new_value,
        }
    }

    pub fn status(&self) -> ChangeKind {
        match (&self.old_value, &self.new_value) {
            (old, new) if old == new => ChangeKind::Unmodified,
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            _ => ChangeKind::Modified,
        }
    }

    /// Rendered lines for this key, `-` before `+` for a modification.
    pub fn changes(&self) -> Vec<String> {
        let old = self.old_value.as_deref().unwrap_or_default();
        let new = self.new_value.as_deref().unwrap_or_default();
        match self.status() {
            ChangeKind::Unmodified => vec![format!(" {} = {}", self.key, old)],
            ChangeKind::Added => vec![format!("+{} = {}", self.key, new)],
            ChangeKind::Removed => vec![format!("-{} = {}", self.key, old)],
            ChangeKind::Modified => vec![
                format!("-{} = {}", self.key, old),
                format!("+{} = {}", self.key, new),
            ],
        }
    }
}

/// Diff two single-level mappings.
///
/// Values are compared by their string representation. Returns the number of
/// keys that are not unmodified, and one entry per key sorted by key.
pub fn diff_mappings<V: Display>(
    old: &BTreeMap<String, V>,
    new: &BTreeMap<String, V>,
) -> (usize, Vec<DictValue>) {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    let entries: Vec<DictValue> = keys
        .into_iter()
        .map(|key| {
            DictValue::new(
                key.clone(),
                old.get(key).map(ToString::to_string),
                new.get(key).map(ToString::to_string),
            )
        })
        .collect();

    let changes = entries
        .iter()
        .filter(|entry| entry.status() != ChangeKind::Unmodified)
        .count();

    (changes, entries)
}

/// Diff of deployed against pending parameters, empty when nothing changed.
pub fn diff_parameters<V: Display>(
    old: &BTreeMap<String, V>,
    new: &BTreeMap<String, V>,
) -> Vec<DictValue> {
    match diff_mappings(old, new) {
        (0, _) => Vec::new(),
        (_, entries) => entries,
    }
}

/// Render a parameter diff in the `--- Old Parameters` block format.
pub fn format_params_diff(entries: &[DictValue]) -> String {
    let lines: Vec<String> = entries.iter().flat_map(DictValue::changes).collect();
    format!(
        "--- Old Parameters\n+++ New Parameters\n******************\n{}\n",
        lines.join("\n")
    )
}
