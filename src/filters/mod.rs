//! Filters: named, typed selectable option sets presented to the user.
//!
//! Filter kinds are tagged variants sharing one operation set
//! (`contains_option`, `update_state`, `active_options`, `serialize`); a new
//! kind adds a variant case, not an inheritance branch. All kinds store
//! their selection in [`FilterState`] under the filter's id as an opaque
//! list, so the storage shape never changes when kinds are added.
//!
//! Passing an option id a filter does not own is a programming error (the
//! caller built an inconsistent UI) and panics; see
//! [`Filter::update_state`].
//!
//! # Example
//!
//! ```
//! use scopekit::filters::{Filter, FilterState};
//!
//! let mut genre = Filter::radio_buttons("genre", "Genre");
//! genre.add_option("rock", "Rock");
//! genre.add_option("jazz", "Jazz");
//!
//! let mut state = FilterState::new();
//! genre.update_state(&mut state, "rock", true);
//! genre.update_state(&mut state, "jazz", true); // replaces rock
//! assert_eq!(genre.active_options(&state), vec!["jazz"]);
//! ```

mod state;

pub use state::FilterState;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;

/// Display hints controlling filter presentation.
///
/// Serialized as the integer the host runtime expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DisplayHints {
    /// Default display.
    #[default]
    Default = 0,
    /// Display prominently, above the results.
    Primary = 1,
}

/// One selectable option within a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub label: String,
}

/// Kind-specific payload of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Mutually exclusive options; at most one selected id.
    RadioButtons {
        label: String,
        options: Vec<FilterOption>,
    },
    /// List of options selectable one at a time or, with `multi_select`,
    /// several at once (ordered, duplicates suppressed).
    OptionSelector {
        label: String,
        multi_select: bool,
        options: Vec<FilterOption>,
    },
}

impl FilterKind {
    fn type_tag(&self) -> &'static str {
        match self {
            FilterKind::RadioButtons { .. } => "radio_buttons",
            FilterKind::OptionSelector { .. } => "option_selector",
        }
    }

    fn options(&self) -> &[FilterOption] {
        match self {
            FilterKind::RadioButtons { options, .. } => options,
            FilterKind::OptionSelector { options, .. } => options,
        }
    }

    fn options_mut(&mut self) -> &mut Vec<FilterOption> {
        match self {
            FilterKind::RadioButtons { options, .. } => options,
            FilterKind::OptionSelector { options, .. } => options,
        }
    }
}

/// A named, typed selectable option set.
///
/// Immutable once in use, except for appending options before the filter is
/// first pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    id: String,
    display_hints: DisplayHints,
    kind: FilterKind,
}

impl Filter {
    /// Create a radio-buttons filter: a mutually exclusive option list.
    pub fn radio_buttons(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            display_hints: DisplayHints::Default,
            kind: FilterKind::RadioButtons {
                label: label.to_string(),
                options: Vec::new(),
            },
        }
    }

    /// Create an option-selector filter.
    pub fn option_selector(id: &str, label: &str, multi_select: bool) -> Self {
        Self {
            id: id.to_string(),
            display_hints: DisplayHints::Default,
            kind: FilterKind::OptionSelector {
                label: label.to_string(),
                multi_select,
                options: Vec::new(),
            },
        }
    }

    /// Unique id of this filter within its filter set.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind-specific payload.
    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    pub fn display_hints(&self) -> DisplayHints {
        self.display_hints
    }

    pub fn set_display_hints(&mut self, hints: DisplayHints) {
        self.display_hints = hints;
    }

    /// Append an option. Only valid before the filter is first pushed.
    pub fn add_option(&mut self, id: &str, label: &str) -> &mut Self {
        self.kind.options_mut().push(FilterOption {
            id: id.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Whether `option_id` belongs to this filter's option set.
    pub fn contains_option(&self, option_id: &str) -> bool {
        self.kind.options().iter().any(|o| o.id == option_id)
    }

    /// Option ids from this filter currently selected in `state`, in stored
    /// order. Ids the filter does not own are ignored.
    pub fn active_options(&self, state: &FilterState) -> Vec<String> {
        state
            .selected_ids(&self.id)
            .into_iter()
            .filter(|id| self.contains_option(id))
            .collect()
    }

    /// Activate or deactivate `option_id` in `state` under this filter's
    /// selection-cardinality rules.
    ///
    /// A selection stored in an unexpected shape is treated as empty; state
    /// format drift from an external producer degrades gracefully.
    ///
    /// # Panics
    ///
    /// Panics if `option_id` is not in this filter's option set. That is a
    /// programming error in the caller, not a runtime condition.
    pub fn update_state(&self, state: &mut FilterState, option_id: &str, active: bool) {
        assert!(
            self.contains_option(option_id),
            "invalid option id {:?} for filter {:?}",
            option_id,
            self.id
        );

        let mut selected = state.selected_ids(&self.id);
        match &self.kind {
            FilterKind::RadioButtons { .. } => {
                Self::update_exclusive(&mut selected, option_id, active);
            }
            FilterKind::OptionSelector { multi_select, .. } => {
                if *multi_select {
                    Self::update_multi(&mut selected, option_id, active);
                } else {
                    Self::update_exclusive(&mut selected, option_id, active);
                }
            }
        }
        state.set_selection(&self.id, selected);
    }

    /// Mutually exclusive selection: at most one id held.
    fn update_exclusive(selected: &mut Vec<String>, option_id: &str, active: bool) {
        if active {
            if selected.is_empty() {
                selected.push(option_id.to_string());
            } else if selected[0] != option_id {
                // Another option is active; switch to this one.
                selected[0] = option_id.to_string();
                selected.truncate(1);
            }
        } else if selected.first().map(String::as_str) == Some(option_id) {
            // Only the active option can be deactivated.
            selected.clear();
        }
    }

    /// Ordered multi-selection with duplicates suppressed.
    fn update_multi(selected: &mut Vec<String>, option_id: &str, active: bool) {
        if active {
            if !selected.iter().any(|id| id == option_id) {
                selected.push(option_id.to_string());
            }
        } else {
            selected.retain(|id| id != option_id);
        }
    }

    /// Serialize this filter to its boundary envelope:
    /// `{id, filter_type, display_hints, label, options, ...}` plus
    /// kind-specific fields.
    pub fn serialize(&self) -> Result<Value> {
        let mut doc = json!({
            "id": self.id,
            "filter_type": self.kind.type_tag(),
            "display_hints": self.display_hints as u8,
            "options": serde_json::to_value(self.kind.options())?,
        });
        let obj = doc.as_object_mut().expect("filter envelope is an object");
        match &self.kind {
            FilterKind::RadioButtons { label, .. } => {
                obj.insert("label".into(), json!(label));
            }
            FilterKind::OptionSelector {
                label,
                multi_select,
                ..
            } => {
                obj.insert("label".into(), json!(label));
                obj.insert("multi_select".into(), json!(multi_select));
            }
        }
        Ok(doc)
    }
}

/// Serialize a filter set to the array form pushed over the boundary.
pub fn serialize_filters(filters: &[Filter]) -> Result<Value> {
    let docs = filters
        .iter()
        .map(Filter::serialize)
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(docs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_option_radio() -> Filter {
        let mut filter = Filter::radio_buttons("genre", "Genre");
        filter.add_option("a", "Option A").add_option("b", "Option B");
        filter
    }

    #[test]
    fn test_radio_selection_walkthrough() {
        let filter = two_option_radio();
        let mut state = FilterState::new();

        // Absent -> select A.
        filter.update_state(&mut state, "a", true);
        assert_eq!(filter.active_options(&state), vec!["a"]);

        // B replaces A.
        filter.update_state(&mut state, "b", true);
        assert_eq!(filter.active_options(&state), vec!["b"]);

        // Deactivating a non-active option changes nothing.
        filter.update_state(&mut state, "a", false);
        assert_eq!(filter.active_options(&state), vec!["b"]);

        // Deactivating the active option clears the selection.
        filter.update_state(&mut state, "b", false);
        assert!(filter.active_options(&state).is_empty());
        assert!(state.selection("genre").is_some());
    }

    #[test]
    fn test_radio_reselect_active_option_is_noop() {
        let filter = two_option_radio();
        let mut state = FilterState::new();
        filter.update_state(&mut state, "a", true);
        filter.update_state(&mut state, "a", true);
        assert_eq!(filter.active_options(&state), vec!["a"]);
    }

    #[test]
    #[should_panic(expected = "invalid option id")]
    fn test_unknown_option_panics() {
        let filter = two_option_radio();
        let mut state = FilterState::new();
        filter.update_state(&mut state, "c", true);
    }

    #[test]
    fn test_malformed_state_treated_as_empty() {
        let filter = two_option_radio();
        let mut state: FilterState =
            serde_json::from_value(serde_json::json!({"genre": 17})).unwrap();
        filter.update_state(&mut state, "b", true);
        assert_eq!(filter.active_options(&state), vec!["b"]);
    }

    #[test]
    fn test_multi_select_keeps_order_and_suppresses_duplicates() {
        let mut filter = Filter::option_selector("mood", "Mood", true);
        filter
            .add_option("calm", "Calm")
            .add_option("dark", "Dark")
            .add_option("epic", "Epic");
        let mut state = FilterState::new();

        filter.update_state(&mut state, "dark", true);
        filter.update_state(&mut state, "calm", true);
        filter.update_state(&mut state, "dark", true);
        assert_eq!(filter.active_options(&state), vec!["dark", "calm"]);

        filter.update_state(&mut state, "dark", false);
        assert_eq!(filter.active_options(&state), vec!["calm"]);
    }

    #[test]
    fn test_single_select_option_selector_is_exclusive() {
        let mut filter = Filter::option_selector("era", "Era", false);
        filter.add_option("80s", "1980s").add_option("90s", "1990s");
        let mut state = FilterState::new();

        filter.update_state(&mut state, "80s", true);
        filter.update_state(&mut state, "90s", true);
        assert_eq!(filter.active_options(&state), vec!["90s"]);
    }

    #[test]
    fn test_serialize_envelope() {
        let mut filter = two_option_radio();
        filter.set_display_hints(DisplayHints::Primary);
        let doc = filter.serialize().unwrap();

        assert_eq!(doc["id"], "genre");
        assert_eq!(doc["filter_type"], "radio_buttons");
        assert_eq!(doc["display_hints"], 1);
        assert_eq!(doc["label"], "Genre");
        assert_eq!(doc["options"][0]["id"], "a");
        assert_eq!(doc["options"][1]["label"], "Option B");
    }

    #[test]
    fn test_serialize_filter_set() {
        let radio = two_option_radio();
        let mut selector = Filter::option_selector("mood", "Mood", true);
        selector.add_option("calm", "Calm");

        let doc = serialize_filters(&[radio, selector]).unwrap();
        let filters = doc.as_array().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1]["filter_type"], "option_selector");
        assert_eq!(filters[1]["multi_select"], true);
    }

    #[test]
    fn test_active_options_ignores_foreign_ids() {
        let filter = two_option_radio();
        let mut state = FilterState::new();
        state.set_selection("genre", vec!["a".into(), "stale".into()]);
        assert_eq!(filter.active_options(&state), vec!["a"]);
    }
}
