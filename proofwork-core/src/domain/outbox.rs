//! Outbox domain types
//!
//! An outbox entry is one mutation the device has applied locally but the
//! backend has not confirmed yet. Entries are replayed strictly in the order
//! they were enqueued and removed only after the backend acknowledged them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::checklist::ChecklistItemState;
use crate::domain::job::Job;
use crate::domain::photo::{Photo, PhotoKind};

/// A pending mutation waiting for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub mutation: OutboxMutation,
    pub enqueued_at: DateTime<Utc>,

    /// Number of failed delivery attempts, for diagnostics only
    #[serde(default)]
    pub attempts: u32,

    #[serde(default)]
    pub last_error: Option<String>,
}

impl OutboxEntry {
    /// Creates a new entry stamped with the current time
    pub fn new(job_id: Uuid, mutation: OutboxMutation) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            mutation,
            enqueued_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    pub fn kind(&self) -> OutboxKind {
        self.mutation.kind()
    }

    /// Applies this mutation to a local copy of the job
    ///
    /// Used to rebuild the optimistic view from an authoritative snapshot:
    /// checklist states overwrite the matching items, and a queued photo shows
    /// up as a locally captured photo unless the job already has one of that
    /// kind. Entries for other jobs are ignored.
    pub fn apply_to(&self, job: &mut Job) {
        if job.id != self.job_id {
            return;
        }

        match &self.mutation {
            OutboxMutation::ChecklistBulk { items } => {
                for state in items {
                    if let Some(item) = job.checklist_item_mut(state.id) {
                        item.is_completed = state.is_completed;
                    }
                }
            }
            OutboxMutation::PhotoUpload {
                photo_type,
                local_handle,
            } => {
                if !job.has_photo(*photo_type) {
                    job.put_photo(Photo::captured(*photo_type, local_handle.clone()));
                }
            }
        }
    }
}

/// The mutation carried by an outbox entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum OutboxMutation {
    /// Full checklist state snapshot for the job
    ChecklistBulk { items: Vec<ChecklistItemState> },

    /// A photo captured on the device
    PhotoUpload {
        photo_type: PhotoKind,
        local_handle: PathBuf,
    },
}

impl OutboxMutation {
    pub fn kind(&self) -> OutboxKind {
        match self {
            OutboxMutation::ChecklistBulk { .. } => OutboxKind::ChecklistBulk,
            OutboxMutation::PhotoUpload { .. } => OutboxKind::PhotoUpload,
        }
    }
}

/// Discriminant of [`OutboxMutation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxKind {
    ChecklistBulk,
    PhotoUpload,
}

impl std::fmt::Display for OutboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboxKind::ChecklistBulk => write!(f, "checklist_bulk"),
            OutboxKind::PhotoUpload => write!(f, "photo_upload"),
        }
    }
}
