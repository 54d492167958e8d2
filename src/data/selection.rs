//! Operator interface selection and reconciliation.
//!
//! Two independent rules, evaluated in a fixed order: the auto-select rule
//! fires only when the available set first populates, and an explicit
//! operator override is never auto-corrected afterwards. Keeping the rules
//! separate avoids the selection flicker that comes from letting both fire
//! on the same update.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Reconcile a selection against the currently known interface set.
///
/// If `available` is non-empty and `selected` is empty, returns `available`
/// in full (auto-select on first population). Otherwise returns `selected`
/// unchanged, even when it contains names no longer available. Stale
/// entries simply filter out no matching samples; silently dropping them
/// mid-session would surprise the operator.
pub fn reconcile(available: &BTreeSet<String>, selected: &BTreeSet<String>) -> BTreeSet<String> {
    if !available.is_empty() && selected.is_empty() {
        available.clone()
    } else {
        selected.clone()
    }
}

/// Selection snapshot exposed to consumers.
///
/// Invariant at auto-fill time: `selected ⊆ available`. Afterwards the
/// operator may hold stale names; see [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionState {
    pub available: BTreeSet<String>,
    pub selected: BTreeSet<String>,
}

/// Owns the operator's selection and the auto-select latch.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    available: BTreeSet<String>,
    selected: BTreeSet<String>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known interface set.
    ///
    /// The auto-select rule is applied once per empty→non-empty transition
    /// of `available`, not on every update, so an explicit selection
    /// (including an explicitly emptied one) survives later calls while
    /// `available` is unchanged.
    pub fn update_available(&mut self, available: BTreeSet<String>) {
        let first_population = self.available.is_empty() && !available.is_empty();
        self.available = available;
        if first_population {
            self.selected = reconcile(&self.available, &self.selected);
        }
    }

    /// Explicit operator override. Always wins; never auto-corrected.
    pub fn set_selected(&mut self, selected: BTreeSet<String>) {
        self.selected = selected;
    }

    pub fn available(&self) -> &BTreeSet<String> {
        &self.available
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn state(&self) -> SelectionState {
        SelectionState {
            available: self.available.clone(),
            selected: self.selected.clone(),
        }
    }
}
