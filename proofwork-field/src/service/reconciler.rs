//! Sync reconciler
//!
//! Drains the outbox head-to-tail once connectivity returns, then refetches
//! the authoritative state of every job it touched.

use async_trait::async_trait;
use proofwork_client::{ClientError, JobApi};
use proofwork_core::domain::job::Job;
use proofwork_core::domain::outbox::{OutboxEntry, OutboxKind, OutboxMutation};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::scheduler::OnlineHandler;
use crate::service::cache::JobCache;
use crate::service::outbox::OutboxQueue;

/// Result of one reconciliation pass
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Another pass was already draining; nothing was touched
    AlreadyRunning,

    /// Delivery of the head failed; it and everything behind it stay queued
    Halted {
        entry_id: Uuid,
        kind: OutboxKind,
        error: ClientError,
        remaining: usize,
    },

    /// The queue is empty and the touched jobs were refetched
    Completed { applied: usize, refreshed: Vec<Job> },
}

/// Fetches job detail and photos together and merges them into one snapshot
pub(crate) async fn fetch_authoritative(
    api: &dyn JobApi,
    job_id: Uuid,
) -> proofwork_client::Result<Job> {
    let (mut job, photos) =
        tokio::try_join!(api.fetch_job_detail(job_id), api.fetch_job_photos(job_id))?;
    job.replace_photos(photos);
    Ok(job)
}

/// Clears the syncing flag when a pass ends, however it ends
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncReconciler {
    api: Arc<dyn JobApi>,
    outbox: Arc<dyn OutboxQueue>,
    cache: Arc<dyn JobCache>,
    syncing: AtomicBool,
    sync_incomplete: AtomicBool,
}

impl SyncReconciler {
    /// Creates a reconciler over the given queue
    ///
    /// If the queue already holds entries that failed before (e.g. in a
    /// previous run), the sync-incomplete indicator starts raised.
    pub fn new(
        api: Arc<dyn JobApi>,
        outbox: Arc<dyn OutboxQueue>,
        cache: Arc<dyn JobCache>,
    ) -> Self {
        let failed_before = outbox.entries().iter().any(|e| e.attempts > 0);

        Self {
            api,
            outbox,
            cache,
            syncing: AtomicBool::new(false),
            sync_incomplete: AtomicBool::new(failed_before),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Whether the last drain halted on a failed entry
    pub fn sync_incomplete(&self) -> bool {
        self.sync_incomplete.load(Ordering::Acquire)
    }

    /// Runs one reconciliation pass
    ///
    /// # Arguments
    /// * `focus` - Job to refetch even if the queue holds nothing for it
    pub async fn reconcile(&self, focus: Option<Uuid>) -> Result<ReconcileOutcome, SyncError> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync already running, skipping");
            return Ok(ReconcileOutcome::AlreadyRunning);
        }
        let _guard = SyncingGuard(&self.syncing);

        let mut touched: BTreeSet<Uuid> = focus.into_iter().collect();
        let mut applied = 0;

        while let Some(entry) = self.outbox.peek() {
            touched.insert(entry.job_id);

            if let Err(e) = self.deliver(&entry).await {
                warn!(
                    "Delivery of {} {} for job {} failed: {}",
                    entry.kind(),
                    entry.id,
                    entry.job_id,
                    e
                );
                self.outbox.record_failure(entry.id, &e.to_string())?;
                self.sync_incomplete.store(true, Ordering::Release);

                return Ok(ReconcileOutcome::Halted {
                    entry_id: entry.id,
                    kind: entry.kind(),
                    error: e,
                    remaining: self.outbox.len(),
                });
            }

            self.outbox.shift(entry.id)?;
            applied += 1;
            debug!("Delivered {} {}", entry.kind(), entry.id);
        }

        self.sync_incomplete.store(false, Ordering::Release);
        if applied > 0 {
            info!("Outbox drained ({} entries delivered)", applied);
        }

        let mut refreshed = Vec::with_capacity(touched.len());
        for job_id in touched {
            let job = fetch_authoritative(self.api.as_ref(), job_id)
                .await
                .map_err(|source| SyncError::Refetch { job_id, source })?;
            self.cache.store(&job)?;
            refreshed.push(job);
        }

        Ok(ReconcileOutcome::Completed { applied, refreshed })
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), ClientError> {
        match &entry.mutation {
            OutboxMutation::ChecklistBulk { items } => {
                self.api.bulk_update_checklist(entry.job_id, items).await
            }
            OutboxMutation::PhotoUpload {
                photo_type,
                local_handle,
            } => self
                .api
                .upload_photo(entry.job_id, *photo_type, local_handle)
                .await
                .map(|_| ()),
        }
    }
}

#[async_trait]
impl OnlineHandler for SyncReconciler {
    async fn on_online(&self) {
        match self.reconcile(None).await {
            Ok(ReconcileOutcome::Completed { applied, .. }) => {
                debug!("Reconnect sync finished ({} delivered)", applied)
            }
            Ok(ReconcileOutcome::Halted { remaining, .. }) => {
                warn!("Reconnect sync halted, {} entries still pending", remaining)
            }
            Ok(ReconcileOutcome::AlreadyRunning) => {}
            Err(e) => error!("Reconnect sync failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutboxError;
    use crate::service::cache::InMemoryJobCache;
    use crate::service::outbox::InMemoryOutbox;
    use crate::testing::{ApiCall, ApiOp, FakeApi, in_progress_job};
    use proofwork_core::domain::checklist::ChecklistItemState;
    use proofwork_core::domain::photo::PhotoKind;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn bulk(job: &Job, completed: bool) -> OutboxEntry {
        OutboxEntry::new(
            job.id,
            OutboxMutation::ChecklistBulk {
                items: job
                    .checklist
                    .iter()
                    .map(|item| ChecklistItemState {
                        id: item.id,
                        is_completed: completed,
                    })
                    .collect(),
            },
        )
    }

    fn photo(job: &Job, kind: PhotoKind) -> OutboxEntry {
        OutboxEntry::new(
            job.id,
            OutboxMutation::PhotoUpload {
                photo_type: kind,
                local_handle: PathBuf::from(format!("/photos/{}.jpg", kind)),
            },
        )
    }

    struct Harness {
        api: Arc<FakeApi>,
        outbox: Arc<InMemoryOutbox>,
        cache: Arc<InMemoryJobCache>,
        reconciler: SyncReconciler,
    }

    fn harness(job: &Job) -> Harness {
        let api = Arc::new(FakeApi::with_job(job.clone()));
        let outbox = Arc::new(InMemoryOutbox::new());
        let cache = Arc::new(InMemoryJobCache::new());
        let reconciler = SyncReconciler::new(api.clone(), outbox.clone(), cache.clone());
        Harness {
            api,
            outbox,
            cache,
            reconciler,
        }
    }

    #[tokio::test]
    async fn test_drains_in_enqueue_order_then_refetches() {
        let job = in_progress_job();
        let h = harness(&job);

        let entries = [
            photo(&job, PhotoKind::Before),
            bulk(&job, true),
            photo(&job, PhotoKind::After),
        ];
        for entry in &entries {
            h.outbox.enqueue(entry.clone()).unwrap();
        }

        let outcome = h.reconciler.reconcile(None).await.unwrap();

        let (applied, refreshed) = match outcome {
            ReconcileOutcome::Completed { applied, refreshed } => (applied, refreshed),
            other => panic!("expected a completed pass, got {:?}", other),
        };
        assert_eq!(applied, 3);
        assert_eq!(refreshed.len(), 1);
        assert!(refreshed[0].has_photo(PhotoKind::Before));
        assert!(refreshed[0].has_photo(PhotoKind::After));
        assert!(refreshed[0].checklist.iter().all(|i| i.is_completed));

        let mutations: Vec<ApiCall> = h
            .api
            .calls()
            .into_iter()
            .filter(ApiCall::is_mutation)
            .collect();
        assert_eq!(
            mutations,
            vec![
                ApiCall::UploadPhoto(job.id, PhotoKind::Before),
                ApiCall::BulkChecklist(job.id),
                ApiCall::UploadPhoto(job.id, PhotoKind::After),
            ]
        );

        assert!(h.outbox.is_empty());
        assert!(h.cache.load(job.id).unwrap().is_some());
        assert!(!h.reconciler.sync_incomplete());
    }

    #[tokio::test]
    async fn test_failure_halts_and_keeps_the_tail() {
        let job = in_progress_job();
        let h = harness(&job);

        let first = photo(&job, PhotoKind::Before);
        let second = bulk(&job, true);
        let third = photo(&job, PhotoKind::After);
        for entry in [&first, &second, &third] {
            h.outbox.enqueue(entry.clone()).unwrap();
        }
        h.api.fail_next(ApiOp::BulkChecklist, 503);

        let outcome = h.reconciler.reconcile(None).await.unwrap();
        match outcome {
            ReconcileOutcome::Halted {
                entry_id,
                kind,
                remaining,
                ..
            } => {
                assert_eq!(entry_id, second.id);
                assert_eq!(kind, OutboxKind::ChecklistBulk);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected a halted pass, got {:?}", other),
        }

        let pending = h.outbox.entries();
        assert_eq!(
            pending.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, third.id]
        );
        assert_eq!(pending[0].attempts, 1);
        assert!(h.reconciler.sync_incomplete());
        assert!(!h.api.calls().contains(&ApiCall::UploadPhoto(job.id, PhotoKind::After)));
        assert!(!h.api.calls().contains(&ApiCall::FetchDetail(job.id)));

        let retry = h.reconciler.reconcile(None).await.unwrap();
        assert!(matches!(retry, ReconcileOutcome::Completed { applied: 2, .. }));
        assert!(!h.reconciler.sync_incomplete());
    }

    /// Outbox that loses the first `shift` as if the process died right after
    /// the remote call succeeded
    struct CrashOnShift {
        inner: InMemoryOutbox,
        crashes_left: AtomicUsize,
    }

    impl OutboxQueue for CrashOnShift {
        fn enqueue(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
            self.inner.enqueue(entry)
        }

        fn peek(&self) -> Option<OutboxEntry> {
            self.inner.peek()
        }

        fn shift(&self, entry_id: Uuid) -> Result<OutboxEntry, OutboxError> {
            if self
                .crashes_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(OutboxError::Io {
                    path: PathBuf::from("outbox.json"),
                    source: std::io::Error::other("killed"),
                });
            }
            self.inner.shift(entry_id)
        }

        fn record_failure(&self, entry_id: Uuid, error: &str) -> Result<(), OutboxError> {
            self.inner.record_failure(entry_id, error)
        }

        fn entries(&self) -> Vec<OutboxEntry> {
            self.inner.entries()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[tokio::test]
    async fn test_replay_after_lost_shift_is_idempotent() {
        let job = in_progress_job();
        let api = Arc::new(FakeApi::with_job(job.clone()));
        let outbox = Arc::new(CrashOnShift {
            inner: InMemoryOutbox::new(),
            crashes_left: AtomicUsize::new(1),
        });
        let reconciler =
            SyncReconciler::new(api.clone(), outbox.clone(), Arc::new(InMemoryJobCache::new()));

        outbox.enqueue(bulk(&job, true)).unwrap();

        let first = reconciler.reconcile(None).await;
        assert!(matches!(first, Err(SyncError::Outbox(_))));
        assert_eq!(outbox.len(), 1);
        assert!(!reconciler.is_syncing());

        let server_after_first = api.job(job.id).unwrap();

        let second = reconciler.reconcile(None).await.unwrap();
        assert!(matches!(second, ReconcileOutcome::Completed { applied: 1, .. }));
        assert!(outbox.is_empty());

        let deliveries = api
            .calls()
            .into_iter()
            .filter(|c| *c == ApiCall::BulkChecklist(job.id))
            .count();
        assert_eq!(deliveries, 2);
        assert_eq!(api.job(job.id).unwrap().checklist, server_after_first.checklist);
    }

    #[tokio::test]
    async fn test_concurrent_pass_returns_already_running() {
        let job = in_progress_job();
        let h = harness(&job);
        h.outbox.enqueue(bulk(&job, true)).unwrap();
        h.outbox.enqueue(bulk(&job, false)).unwrap();
        h.api.set_delay(Duration::from_millis(50));

        let (a, b) = tokio::join!(h.reconciler.reconcile(None), h.reconciler.reconcile(None));
        let outcomes = [a.unwrap(), b.unwrap()];

        let running = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::AlreadyRunning))
            .count();
        assert_eq!(running, 1);

        let deliveries = h
            .api
            .calls()
            .into_iter()
            .filter(|c| *c == ApiCall::BulkChecklist(job.id))
            .count();
        assert_eq!(deliveries, 2);
        assert!(h.outbox.is_empty());
    }

    #[tokio::test]
    async fn test_prior_failures_raise_indicator_on_startup() {
        let job = in_progress_job();
        let outbox = Arc::new(InMemoryOutbox::new());
        let entry = bulk(&job, true);
        outbox.enqueue(entry.clone()).unwrap();
        outbox.record_failure(entry.id, "timeout").unwrap();

        let reconciler = SyncReconciler::new(
            Arc::new(FakeApi::with_job(job)),
            outbox,
            Arc::new(InMemoryJobCache::new()),
        );
        assert!(reconciler.sync_incomplete());
    }

    #[tokio::test]
    async fn test_empty_queue_refetches_focus_job() {
        let job = in_progress_job();
        let h = harness(&job);

        let outcome = h.reconciler.reconcile(Some(job.id)).await.unwrap();
        match outcome {
            ReconcileOutcome::Completed { applied, refreshed } => {
                assert_eq!(applied, 0);
                assert_eq!(refreshed[0].id, job.id);
            }
            other => panic!("expected a completed pass, got {:?}", other),
        }
        assert!(h.api.calls().contains(&ApiCall::FetchPhotos(job.id)));
    }
}
