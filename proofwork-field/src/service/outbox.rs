//! Outbox queue service
//!
//! Durable FIFO of mutations that were applied locally but not yet confirmed
//! by the backend. Delivery is two-phase: the reconciler `peek`s the head,
//! applies it remotely, and only then `shift`s it off. A crash between the
//! two phases resends the head on the next drain (at-least-once).

use proofwork_core::domain::outbox::OutboxEntry;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::service::persist::write_atomic;

/// Service trait for the pending-mutation queue
///
/// The queue exclusively owns its entries. Consumers only read the head and
/// remove it after confirmed delivery; they never edit or reorder entries.
///
/// Methods are synchronous: a durable implementation flushes to disk before
/// returning, and callers on the async runtime accept that short block.
pub trait OutboxQueue: Send + Sync {
    /// Appends an entry at the tail
    ///
    /// Returns only after the entry is durable.
    fn enqueue(&self, entry: OutboxEntry) -> Result<(), OutboxError>;

    /// Returns a copy of the head without removing it
    fn peek(&self) -> Option<OutboxEntry>;

    /// Removes the head after its delivery was confirmed
    ///
    /// # Arguments
    /// * `entry_id` - ID of the entry the caller delivered; must be the head
    fn shift(&self, entry_id: Uuid) -> Result<OutboxEntry, OutboxError>;

    /// Records a failed delivery attempt on an entry, leaving it in place
    fn record_failure(&self, entry_id: Uuid, error: &str) -> Result<(), OutboxError>;

    /// All pending entries in delivery order
    fn entries(&self) -> Vec<OutboxEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock(entries: &Mutex<VecDeque<OutboxEntry>>) -> MutexGuard<'_, VecDeque<OutboxEntry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

fn check_head(entries: &VecDeque<OutboxEntry>, entry_id: Uuid) -> Result<(), OutboxError> {
    match entries.front() {
        Some(head) if head.id == entry_id => Ok(()),
        other => Err(OutboxError::HeadMismatch {
            expected: entry_id,
            actual: other.map(|e| e.id),
        }),
    }
}

fn mark_failed(entries: &mut VecDeque<OutboxEntry>, entry_id: Uuid, error: &str) -> bool {
    match entries.iter_mut().find(|e| e.id == entry_id) {
        Some(entry) => {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
            true
        }
        None => false,
    }
}

/// In-memory implementation of OutboxQueue
///
/// Not durable; used in tests and for throwaway sessions.
#[derive(Default)]
pub struct InMemoryOutbox {
    entries: Mutex<VecDeque<OutboxEntry>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutboxQueue for InMemoryOutbox {
    fn enqueue(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        lock(&self.entries).push_back(entry);
        Ok(())
    }

    fn peek(&self) -> Option<OutboxEntry> {
        lock(&self.entries).front().cloned()
    }

    fn shift(&self, entry_id: Uuid) -> Result<OutboxEntry, OutboxError> {
        let mut entries = lock(&self.entries);
        check_head(&entries, entry_id)?;
        entries.pop_front().ok_or(OutboxError::HeadMismatch {
            expected: entry_id,
            actual: None,
        })
    }

    fn record_failure(&self, entry_id: Uuid, error: &str) -> Result<(), OutboxError> {
        mark_failed(&mut lock(&self.entries), entry_id, error);
        Ok(())
    }

    fn entries(&self) -> Vec<OutboxEntry> {
        lock(&self.entries).iter().cloned().collect()
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// File-backed implementation of OutboxQueue
///
/// The whole queue is stored as one JSON array. Every mutation rewrites the
/// file atomically before returning, so the queue survives the process being
/// killed at any point. The in-memory copy is only updated once the write
/// succeeded.
pub struct FileOutbox {
    path: PathBuf,
    entries: Mutex<VecDeque<OutboxEntry>>,
}

impl FileOutbox {
    /// Opens the queue stored at `path`, creating an empty one if missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, OutboxError> {
        let path = path.into();

        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<VecDeque<OutboxEntry>>(&bytes).map_err(
                |source| OutboxError::Corrupt {
                    path: path.clone(),
                    source,
                },
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(source) => return Err(OutboxError::Io { path, source }),
        };

        info!(
            "Opened outbox at {} ({} pending entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the queue, persists it, then publishes it
    fn update<T>(
        &self,
        change: impl FnOnce(&mut VecDeque<OutboxEntry>) -> Result<T, OutboxError>,
    ) -> Result<T, OutboxError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        let value = change(&mut next)?;

        let bytes = serde_json::to_vec_pretty(&next).map_err(|source| OutboxError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &bytes).map_err(|source| OutboxError::Io {
            path: self.path.clone(),
            source,
        })?;

        *entries = next;
        Ok(value)
    }
}

impl OutboxQueue for FileOutbox {
    fn enqueue(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        debug!(
            "Enqueueing {} for job {} (entry {})",
            entry.kind(),
            entry.job_id,
            entry.id
        );
        self.update(|entries| {
            entries.push_back(entry);
            Ok(())
        })
    }

    fn peek(&self) -> Option<OutboxEntry> {
        lock(&self.entries).front().cloned()
    }

    fn shift(&self, entry_id: Uuid) -> Result<OutboxEntry, OutboxError> {
        self.update(|entries| {
            check_head(entries, entry_id)?;
            entries.pop_front().ok_or(OutboxError::HeadMismatch {
                expected: entry_id,
                actual: None,
            })
        })
    }

    fn record_failure(&self, entry_id: Uuid, error: &str) -> Result<(), OutboxError> {
        self.update(|entries| {
            mark_failed(entries, entry_id, error);
            Ok(())
        })
    }

    fn entries(&self) -> Vec<OutboxEntry> {
        lock(&self.entries).iter().cloned().collect()
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofwork_core::domain::checklist::ChecklistItemState;
    use proofwork_core::domain::outbox::OutboxMutation;
    use proofwork_core::domain::photo::PhotoKind;

    fn checklist_entry(job_id: Uuid) -> OutboxEntry {
        OutboxEntry::new(
            job_id,
            OutboxMutation::ChecklistBulk {
                items: vec![ChecklistItemState {
                    id: Uuid::new_v4(),
                    is_completed: true,
                }],
            },
        )
    }

    fn temp_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("proofwork-outbox-{}", Uuid::new_v4()))
            .join("outbox.json")
    }

    fn assert_fifo(queue: &dyn OutboxQueue) {
        let job = Uuid::new_v4();
        let a = checklist_entry(job);
        let b = checklist_entry(job);
        let c = checklist_entry(job);
        let expected = vec![a.id, b.id, c.id];

        for entry in [a, b, c] {
            queue.enqueue(entry).unwrap();
        }

        let mut drained = Vec::new();
        while let Some(head) = queue.peek() {
            drained.push(queue.shift(head.id).unwrap().id);
        }

        assert_eq!(drained, expected);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_in_memory_fifo() {
        assert_fifo(&InMemoryOutbox::new());
    }

    #[test]
    fn test_file_fifo() {
        let path = temp_file();
        assert_fifo(&FileOutbox::open(&path).unwrap());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_peek_does_not_remove() {
        let queue = InMemoryOutbox::new();
        let entry = checklist_entry(Uuid::new_v4());
        queue.enqueue(entry.clone()).unwrap();

        assert_eq!(queue.peek().map(|e| e.id), Some(entry.id));
        assert_eq!(queue.peek().map(|e| e.id), Some(entry.id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_shift_refuses_non_head_entry() {
        let queue = InMemoryOutbox::new();
        let job = Uuid::new_v4();
        let first = checklist_entry(job);
        let second = checklist_entry(job);
        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second.clone()).unwrap();

        let err = queue.shift(second.id).unwrap_err();
        assert!(matches!(err, OutboxError::HeadMismatch { .. }));
        assert_eq!(queue.len(), 2);

        let empty = InMemoryOutbox::new();
        assert!(empty.shift(first.id).is_err());
    }

    #[test]
    fn test_file_outbox_survives_reopen() {
        let path = temp_file();
        let job = Uuid::new_v4();
        let first = checklist_entry(job);
        let second = OutboxEntry::new(
            job,
            OutboxMutation::PhotoUpload {
                photo_type: PhotoKind::Before,
                local_handle: PathBuf::from("/data/photos/before.jpg"),
            },
        );

        {
            let queue = FileOutbox::open(&path).unwrap();
            queue.enqueue(first.clone()).unwrap();
            queue.enqueue(second.clone()).unwrap();
            queue.record_failure(first.id, "503 Service Unavailable").unwrap();
        }

        let reopened = FileOutbox::open(&path).unwrap();
        let entries = reopened.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, first.id);
        assert_eq!(entries[0].attempts, 1);
        assert_eq!(entries[0].last_error.as_deref(), Some("503 Service Unavailable"));
        assert_eq!(entries[1], second);

        reopened.shift(first.id).unwrap();
        drop(reopened);

        let again = FileOutbox::open(&path).unwrap();
        assert_eq!(again.peek().map(|e| e.id), Some(second.id));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let path = temp_file();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let result = FileOutbox::open(&path);
        assert!(matches!(result, Err(OutboxError::Corrupt { .. })));

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
