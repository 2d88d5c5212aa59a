//! Checklist completion predicates

use serde::{Deserialize, Serialize};

use crate::domain::checklist::ChecklistItem;

/// Completion predicates derived from a checklist
///
/// Plain `Copy` value: equal checklists always produce equal summaries, so
/// callers can compare summaries to detect real changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSummary {
    pub has_any: bool,
    pub has_required: bool,
    pub all_completed: bool,
    pub required_completed: bool,
    pub remaining_required: usize,
}

impl ChecklistSummary {
    /// Derives the predicates from an ordered item list
    pub fn from_items(items: &[ChecklistItem]) -> Self {
        let remaining_required = items
            .iter()
            .filter(|item| item.is_required && !item.is_completed)
            .count();

        Self {
            has_any: !items.is_empty(),
            has_required: items.iter().any(|item| item.is_required),
            all_completed: items.iter().all(|item| item.is_completed),
            required_completed: remaining_required == 0,
            remaining_required,
        }
    }

    /// `true` when there is nothing to check or every required item is done
    pub fn checklist_ok(&self) -> bool {
        !self.has_any || self.required_completed
    }
}
