//! Proofwork Field Engine
//!
//! Offline-first execution of field jobs on the worker's device.
//!
//! Architecture:
//! - Configuration: backend URL, token and local data directory
//! - Services: durable outbox, job snapshot cache, sync reconciler
//! - Scheduler: connectivity probe and reconnect loops
//! - Session: the per-job state machine the UI talks to
//!
//! Mutations the worker makes while offline are applied to the local view at
//! once and queued in the outbox. When the device comes back online the
//! reconciler replays the queue in order and then refetches the job, so the
//! backend's state always wins in the end.
//!
//! A job is edited by one worker on one device at a time; concurrent remote
//! edits are never merged.

pub mod config;
pub mod context;
pub mod error;
pub mod scheduler;
pub mod service;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use context::FieldContext;
pub use error::{CacheError, OutboxError, Result, SessionError, SyncError};
pub use session::{JobSession, PhotoOutcome, SessionView, ToggleOutcome};
