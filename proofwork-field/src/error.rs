//! Error types for the field engine

use proofwork_client::ClientError;
use proofwork_core::rules::gates::Blocker;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by an outbox implementation
#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Outbox I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Outbox file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A caller tried to remove an entry that is not at the head
    #[error("Outbox head is {actual:?}, refusing to remove entry {expected}")]
    HeadMismatch { expected: Uuid, actual: Option<Uuid> },
}

/// Errors raised by a job snapshot cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cached job {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that abort a reconciliation pass
///
/// A failed delivery is not an error: it halts the drain and is reported in
/// the outcome. These are the failures of the local machinery itself.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Outbox(#[from] OutboxError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Refetch of job {job_id} failed: {source}")]
    Refetch {
        job_id: Uuid,
        #[source]
        source: ClientError,
    },
}

/// Errors surfaced by a job session action
#[derive(Debug, Error)]
pub enum SessionError {
    /// The action's preconditions are not met; nothing was sent
    #[error("Action not allowed: {}", describe_blockers(.0))]
    Blocked(Vec<Blocker>),

    /// The backend rejected or could not be reached for the request
    #[error("Request failed: {0}")]
    Remote(#[from] ClientError),

    #[error(transparent)]
    Outbox(#[from] OutboxError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Job {0} has never been downloaded and the device is offline")]
    NotAvailableOffline(Uuid),

    #[error("Checklist item {0} does not exist on this job")]
    UnknownChecklistItem(Uuid),

    #[error("Photo file {} does not exist", .0.display())]
    PhotoNotFound(PathBuf),

    /// The session was abandoned while the request was in flight
    #[error("Session was closed before the result arrived")]
    Abandoned,
}

impl SessionError {
    /// Returns the unmet preconditions if this is a guard violation
    pub fn blockers(&self) -> Option<&[Blocker]> {
        match self {
            SessionError::Blocked(blockers) => Some(blockers),
            _ => None,
        }
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

fn describe_blockers(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
