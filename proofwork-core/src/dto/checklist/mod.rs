//! Checklist DTOs

use serde::{Deserialize, Serialize};

use crate::domain::checklist::ChecklistItemState;

/// Replaces the completion state of several items at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkChecklistUpdate {
    pub items: Vec<ChecklistItemState>,
}

/// Sets one item to a completion value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItemUpdate {
    pub is_completed: bool,
}
