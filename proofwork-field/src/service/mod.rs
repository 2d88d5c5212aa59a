//! Service layer
//!
//! Services hold the device-side state of the field engine: the durable
//! outbox of unsent mutations, the cache of authoritative job snapshots, and
//! the reconciler that replays one against the backend.
//!
//! Storage services are trait-based so tests can swap in memory-backed ones.

mod cache;
mod outbox;
mod persist;
mod reconciler;

// Re-export traits
pub use cache::JobCache;
pub use outbox::OutboxQueue;

// Re-export implementations
pub use cache::{FileJobCache, InMemoryJobCache};
pub use outbox::{FileOutbox, InMemoryOutbox};
pub use reconciler::{ReconcileOutcome, SyncReconciler};

pub(crate) use reconciler::fetch_authoritative;
