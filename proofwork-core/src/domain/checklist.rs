//! Checklist domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a job's checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_completed: bool,
}

/// Completion state of a single item, as sent to the backend
///
/// Setting an item to a value is idempotent by item ID, which is what makes
/// replaying a queued checklist update safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItemState {
    pub id: Uuid,
    pub is_completed: bool,
}

impl From<&ChecklistItem> for ChecklistItemState {
    fn from(item: &ChecklistItem) -> Self {
        Self {
            id: item.id,
            is_completed: item.is_completed,
        }
    }
}
