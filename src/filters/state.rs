//! Selection state shared across a scope's filters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current selections for a set of filters, keyed by filter id.
///
/// The stored shape is deliberately opaque: each value is a selection list
/// whose interpretation belongs to the filter kind that owns the id. A
/// filter id may be absent (never touched), hold an empty list (explicitly
/// cleared) or hold an ordered list of option ids. State arrives from an
/// external producer and may have drifted in shape; filters degrade a
/// malformed selection to an empty list rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState(HashMap<String, Value>);

impl FilterState {
    /// Empty state: no filter has a stored selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw stored selection for a filter id, if any.
    pub fn selection(&self, filter_id: &str) -> Option<&Value> {
        self.0.get(filter_id)
    }

    /// The stored selection interpreted as a list of option ids.
    ///
    /// Absent, non-list or non-string entries degrade to an empty list.
    pub fn selected_ids(&self, filter_id: &str) -> Vec<String> {
        match self.0.get(filter_id) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Store a selection list for a filter id.
    pub fn set_selection(&mut self, filter_id: &str, option_ids: Vec<String>) {
        self.0.insert(
            filter_id.to_string(),
            Value::Array(option_ids.into_iter().map(Value::String).collect()),
        );
    }

    /// Remove any stored selection for a filter id.
    pub fn clear(&mut self, filter_id: &str) {
        self.0.remove(filter_id);
    }

    /// Whether an option id is part of the stored selection for a filter.
    pub fn is_selected(&self, filter_id: &str, option_id: &str) -> bool {
        self.selected_ids(filter_id).iter().any(|id| id == option_id)
    }

    /// Ids of all filters with a stored selection entry.
    pub fn filter_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
