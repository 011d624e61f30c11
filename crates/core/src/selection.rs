// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Multi-select state for a ticket list view.
//!
//! One `SelectionManager` is owned per list view. Membership is independent
//! of pagination: tri-state queries are always evaluated against the visible
//! ids the caller passes in, never against a cached full list.

use std::collections::HashSet;

/// Renderable state of a "select all" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No visible id is selected.
    None,
    /// Some, but not all, visible ids are selected.
    Some,
    /// Every visible id is selected.
    All,
}

/// The set of ticket ids currently chosen in a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionManager {
    selected: HashSet<String>,
}

impl SelectionManager {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id`.
    pub fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    /// Replaces the selection with exactly `ids`. Duplicates collapse.
    pub fn select_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = ids.into_iter().map(Into::into).collect();
    }

    /// Empties the selection.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Called when the visible page changes. Selection does not survive it.
    pub fn on_page_change(&mut self) {
        self.clear();
    }

    /// Header checkbox behavior: if every visible id is already selected,
    /// deselect them; otherwise add all of them. Ids outside `visible_ids`
    /// are left alone.
    pub fn toggle_all(&mut self, visible_ids: &[String]) {
        if self.is_all_selected(visible_ids) {
            for id in visible_ids {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(visible_ids.iter().cloned());
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// True iff `visible_ids` is non-empty and every element is selected.
    ///
    /// The selection may be a superset of `visible_ids`.
    #[must_use]
    pub fn is_all_selected(&self, visible_ids: &[String]) -> bool {
        !visible_ids.is_empty() && visible_ids.iter().all(|id| self.selected.contains(id))
    }

    /// True iff some, but not all, of `visible_ids` are selected.
    #[must_use]
    pub fn is_indeterminate(&self, visible_ids: &[String]) -> bool {
        let visible: HashSet<&str> = visible_ids.iter().map(String::as_str).collect();
        let overlap = visible
            .iter()
            .filter(|id| self.selected.contains(**id))
            .count();
        overlap > 0 && overlap < visible.len()
    }

    /// Collapses the two tri-state queries into one value.
    #[must_use]
    pub fn state(&self, visible_ids: &[String]) -> SelectionState {
        if self.is_all_selected(visible_ids) {
            SelectionState::All
        } else if self.is_indeterminate(visible_ids) {
            SelectionState::Some
        } else {
            SelectionState::None
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Returns the selected ids in sorted order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }
}
