//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::check_event::RawCheckEvent;
use crate::domain::checklist::ChecklistItem;
use crate::domain::photo::{Photo, PhotoKind};

/// A scheduled visit assigned to a single field worker
///
/// This is the authoritative record returned by the backend. The field engine
/// keeps one copy per open job and overlays pending optimistic edits on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub window: ScheduleWindow,
    pub location: LocationRef,
    pub worker_id: Option<Uuid>,
    #[serde(default)]
    pub check_events: Vec<RawCheckEvent>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
}

impl Job {
    /// Returns the photo of the given kind, if one is present
    pub fn photo(&self, kind: PhotoKind) -> Option<&Photo> {
        self.photos.iter().find(|p| p.kind == kind)
    }

    /// Whether a photo of the given kind is present (uploaded or captured locally)
    pub fn has_photo(&self, kind: PhotoKind) -> bool {
        self.photo(kind).is_some()
    }

    /// Replaces the photo of the photo's kind, or adds it
    ///
    /// Keeps the "at most one photo per kind" invariant.
    pub fn put_photo(&mut self, photo: Photo) {
        self.photos.retain(|p| p.kind != photo.kind);
        self.photos.push(photo);
    }

    /// Replaces the whole photo list, keeping the last photo seen for each kind
    pub fn replace_photos(&mut self, photos: Vec<Photo>) {
        self.photos.clear();
        for photo in photos {
            self.put_photo(photo);
        }
    }

    /// Looks up a checklist item by ID
    pub fn checklist_item_mut(&mut self, item_id: Uuid) -> Option<&mut ChecklistItem> {
        self.checklist.iter_mut().find(|item| item.id == item_id)
    }
}

/// Job status
///
/// Transitions are monotonic: `Scheduled -> InProgress -> Completed`.
/// `Cancelled` is absorbing and can be entered from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle
    ///
    /// Staying in the same status is allowed (refetching an unchanged job).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        match (self, next) {
            (Scheduled, Scheduled)
            | (InProgress, InProgress)
            | (Completed, Completed)
            | (Cancelled, Cancelled) => true,
            (Scheduled, InProgress) | (InProgress, Completed) => true,
            (Scheduled | InProgress, Cancelled) => true,
            (Scheduled, Completed) | (InProgress, Scheduled) => false,
            (Completed, _) | (Cancelled, _) => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Scheduled => write!(f, "scheduled"),
            JobStatus::InProgress => write!(f, "in progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The time window the visit is booked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Reference to the site the visit takes place at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: Uuid,
    pub name: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(JobStatus::Scheduled.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Scheduled.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::InProgress));
    }

    #[test]
    fn test_backward_and_skipping_transitions_rejected() {
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::Scheduled));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::InProgress));
        assert!(!JobStatus::Scheduled.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Scheduled));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
