//! Job execution session
//!
//! One open job on the device. The session holds the local view of the job
//! (authoritative snapshot plus every pending outbox entry replayed on top),
//! evaluates action gates before any network call, and commits results back
//! into the view.
//!
//! State lives behind a short-lived mutex that is never held across an
//! `.await`, so independent actions (e.g. toggles of different checklist
//! items) interleave freely.

use async_trait::async_trait;
use proofwork_client::JobApi;
use proofwork_core::domain::checklist::ChecklistItemState;
use proofwork_core::domain::connectivity::Connectivity;
use proofwork_core::domain::geo::GeoPoint;
use proofwork_core::domain::job::Job;
use proofwork_core::domain::outbox::{OutboxEntry, OutboxMutation};
use proofwork_core::domain::photo::PhotoKind;
use proofwork_core::rules::checklist::ChecklistSummary;
use proofwork_core::rules::gates::{ActionGates, ActivityFlags, Blocker, Gate, GateInputs};
use proofwork_core::rules::progress::{JobProgress, ProgressInputs};
use proofwork_core::rules::timeline::{TimelineEntry, normalize_timeline};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::FieldContext;
use crate::error::{Result, SessionError};
use crate::scheduler::OnlineHandler;
use crate::service::{JobCache, OutboxQueue, ReconcileOutcome, SyncReconciler, fetch_authoritative};

/// How a captured photo was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// The backend stored the photo
    Uploaded,
    /// The photo is shown locally and waits in the outbox
    Queued,
}

/// How a checklist toggle was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Saved,
    Queued,
}

/// Everything a screen needs to render one job
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub job: Job,
    pub progress: JobProgress,
    pub checklist: ChecklistSummary,
    pub gates: ActionGates,
    pub connectivity: Connectivity,
    pub activity: ActivityFlags,
    /// Outbox entries still waiting for this job
    pub pending: usize,
    pub sync_incomplete: bool,
    /// Last failure per checklist item, cleared by the next toggle of that item
    pub item_errors: BTreeMap<Uuid, String>,
    pub timeline: Vec<TimelineEntry>,
}

struct SessionState {
    job: Job,
    activity: ActivityFlags,
    item_errors: BTreeMap<Uuid, String>,
}

impl SessionState {
    fn gates(&self, connectivity: Connectivity, pending: usize) -> ActionGates {
        let checklist = ChecklistSummary::from_items(&self.job.checklist);
        ActionGates::evaluate(GateInputs {
            status: self.job.status,
            connectivity,
            has_before_photo: self.job.has_photo(PhotoKind::Before),
            has_after_photo: self.job.has_photo(PhotoKind::After),
            checklist,
            pending,
            activity: &self.activity,
        })
    }
}

fn blocked(gate: Gate) -> Result<()> {
    gate.check().map_err(SessionError::Blocked)
}

/// Replays every pending entry for the job on top of `job`, in queue order
fn overlay(mut job: Job, outbox: &dyn OutboxQueue) -> Job {
    for entry in outbox.entries() {
        entry.apply_to(&mut job);
    }
    job
}

pub struct JobSession {
    job_id: Uuid,
    api: Arc<dyn JobApi>,
    outbox: Arc<dyn OutboxQueue>,
    cache: Arc<dyn JobCache>,
    reconciler: Arc<SyncReconciler>,
    connectivity: watch::Receiver<Connectivity>,
    state: Mutex<SessionState>,
    abandoned: AtomicBool,
}

impl JobSession {
    /// Opens a job
    ///
    /// Online, the job is fetched and cached; if the request never reaches
    /// the backend the cached snapshot is used instead. Offline, only the
    /// cached snapshot is available.
    pub async fn open(ctx: &FieldContext, job_id: Uuid) -> Result<Self> {
        let connectivity = ctx.monitor.subscribe();
        let online = connectivity.borrow().is_online();

        let authoritative = if online {
            match fetch_authoritative(ctx.api.as_ref(), job_id).await {
                Ok(job) => {
                    ctx.cache.store(&job)?;
                    job
                }
                Err(e) if e.is_transport() => {
                    warn!("Could not reach backend for job {}, using cache: {}", job_id, e);
                    ctx.cache
                        .load(job_id)?
                        .ok_or(SessionError::NotAvailableOffline(job_id))?
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            ctx.cache
                .load(job_id)?
                .ok_or(SessionError::NotAvailableOffline(job_id))?
        };

        let job = overlay(authoritative, ctx.outbox.as_ref());
        info!("Opened job {} ({})", job_id, job.status);

        Ok(Self {
            job_id,
            api: Arc::clone(&ctx.api),
            outbox: Arc::clone(&ctx.outbox),
            cache: Arc::clone(&ctx.cache),
            reconciler: Arc::clone(&ctx.reconciler),
            connectivity,
            state: Mutex::new(SessionState {
                job,
                activity: ActivityFlags::default(),
                item_errors: BTreeMap::new(),
            }),
            abandoned: AtomicBool::new(false),
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connectivity(&self) -> Connectivity {
        *self.connectivity.borrow()
    }

    /// Outbox entries of this job still waiting for delivery
    fn pending(&self) -> usize {
        self.outbox
            .entries()
            .iter()
            .filter(|e| e.job_id == self.job_id)
            .count()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.abandoned.load(Ordering::Acquire) {
            debug!("Dropping late result for abandoned job {}", self.job_id);
            return Err(SessionError::Abandoned);
        }
        Ok(())
    }

    /// Stops committing results; requests already in flight still complete
    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    /// Snapshot of the current local view
    pub fn view(&self) -> SessionView {
        let connectivity = self.connectivity();
        let pending = self.pending();

        let state = self.lock();
        let timeline = normalize_timeline(&state.job.check_events);
        let checklist = ChecklistSummary::from_items(&state.job.checklist);
        let progress = JobProgress::derive(ProgressInputs {
            status: state.job.status,
            timeline: &timeline,
            has_before_photo: state.job.has_photo(PhotoKind::Before),
            has_after_photo: state.job.has_photo(PhotoKind::After),
            checklist,
        });

        SessionView {
            job: state.job.clone(),
            progress,
            checklist,
            gates: state.gates(connectivity, pending),
            connectivity,
            activity: state.activity.clone(),
            pending,
            sync_incomplete: self.reconciler.sync_incomplete(),
            item_errors: state.item_errors.clone(),
            timeline,
        }
    }

    // =============================================================================
    // Check-in / Check-out
    // =============================================================================

    /// Checks in at the given position, then refetches the job
    ///
    /// The status is never flipped locally; a rejection leaves it unchanged.
    pub async fn check_in(&self, point: GeoPoint) -> Result<()> {
        self.begin_submit(|gates| gates.check_in)?;
        let result = self.api.check_in(self.job_id, point).await;
        self.lock().activity.submitting = false;
        self.ensure_live()?;

        result?;
        info!("Checked in to job {} at {}", self.job_id, point);
        self.refresh().await
    }

    /// Checks out at the given position, then refetches the job
    pub async fn check_out(&self, point: GeoPoint) -> Result<()> {
        self.begin_submit(|gates| gates.check_out)?;
        let result = self.api.check_out(self.job_id, point).await;
        self.lock().activity.submitting = false;
        self.ensure_live()?;

        result?;
        info!("Checked out of job {} at {}", self.job_id, point);
        self.refresh().await
    }

    /// Evaluates a submit gate and raises the submitting flag in one step
    fn begin_submit(&self, gate: impl FnOnce(ActionGates) -> Gate) -> Result<()> {
        let connectivity = self.connectivity();
        let pending = self.pending();
        let mut state = self.lock();
        blocked(gate(state.gates(connectivity, pending)))?;
        state.activity.submitting = true;
        Ok(())
    }

    // =============================================================================
    // Photos
    // =============================================================================

    /// Records a photo captured at `local_handle`
    ///
    /// Online, the photo is uploaded right away; a backend rejection leaves
    /// the job unchanged, while a request that never reached the backend
    /// falls back to the outbox. Offline, the photo shows up immediately and
    /// is queued for upload.
    pub async fn capture_photo(&self, kind: PhotoKind, local_handle: PathBuf) -> Result<PhotoOutcome> {
        let connectivity = self.connectivity();
        let pending = self.pending();
        {
            let mut state = self.lock();
            blocked(state.gates(connectivity, pending).capture(kind).clone())?;
            state.activity.set_uploading(kind, true);
        }

        if tokio::fs::metadata(&local_handle).await.is_err() {
            self.lock().activity.set_uploading(kind, false);
            return Err(SessionError::PhotoNotFound(local_handle));
        }

        if !connectivity.is_online() {
            let queued = self.enqueue_photo(kind, local_handle);
            self.lock().activity.set_uploading(kind, false);
            return queued;
        }

        let result = self.api.upload_photo(self.job_id, kind, &local_handle).await;
        self.lock().activity.set_uploading(kind, false);
        self.ensure_live()?;

        match result {
            Ok(photo) => {
                info!("Uploaded {} photo for job {}", kind, self.job_id);
                self.lock().job.put_photo(photo.clone());
                self.update_cached(|job| job.put_photo(photo));
                Ok(PhotoOutcome::Uploaded)
            }
            Err(e) if e.is_transport() => {
                warn!("Upload of {} photo did not reach backend, queueing: {}", kind, e);
                self.enqueue_photo(kind, local_handle)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn enqueue_photo(&self, kind: PhotoKind, local_handle: PathBuf) -> Result<PhotoOutcome> {
        let entry = OutboxEntry::new(
            self.job_id,
            OutboxMutation::PhotoUpload {
                photo_type: kind,
                local_handle,
            },
        );
        self.outbox.enqueue(entry.clone())?;
        entry.apply_to(&mut self.lock().job);

        info!("Queued {} photo for job {}", kind, self.job_id);
        Ok(PhotoOutcome::Queued)
    }

    // =============================================================================
    // Checklist
    // =============================================================================

    /// Sets one checklist item, applying it locally before the backend answers
    ///
    /// Online, a failure rolls that single item back and records an error
    /// for it. Offline, the full checklist state is queued. While earlier
    /// changes of this job still sit in the outbox the toggle is queued
    /// behind them, and the queue is drained if the device is online.
    pub async fn toggle_checklist(&self, item_id: Uuid, value: bool) -> Result<ToggleOutcome> {
        let connectivity = self.connectivity();
        let pending = self.pending();
        let direct = connectivity.is_online() && pending == 0;

        let (previous, snapshot) = {
            let mut state = self.lock();
            blocked(state.gates(connectivity, pending).toggle_checklist)?;
            if state.activity.checklist_saving.contains(&item_id) {
                return Err(SessionError::Blocked(vec![Blocker::Busy]));
            }

            let item = state
                .job
                .checklist_item_mut(item_id)
                .ok_or(SessionError::UnknownChecklistItem(item_id))?;
            let previous = item.is_completed;
            item.is_completed = value;

            state.item_errors.remove(&item_id);
            if direct {
                state.activity.checklist_saving.insert(item_id);
            }

            let snapshot: Vec<ChecklistItemState> = state
                .job
                .checklist
                .iter()
                .map(ChecklistItemState::from)
                .collect();
            (previous, snapshot)
        };

        if !direct {
            let entry = OutboxEntry::new(self.job_id, OutboxMutation::ChecklistBulk { items: snapshot });
            if let Err(e) = self.outbox.enqueue(entry) {
                error!("Failed to queue checklist change for job {}: {}", self.job_id, e);
                self.rollback_item(item_id, previous, e.to_string());
                return Err(e.into());
            }
            debug!("Queued checklist state for job {}", self.job_id);

            if !connectivity.is_online() {
                return Ok(ToggleOutcome::Queued);
            }
            return match self.sync().await {
                Ok(ReconcileOutcome::Completed { .. }) => Ok(ToggleOutcome::Saved),
                Ok(_) => Ok(ToggleOutcome::Queued),
                Err(SessionError::Abandoned) => Err(SessionError::Abandoned),
                Err(e) => {
                    warn!("Checklist change for job {} stays queued: {}", self.job_id, e);
                    Ok(ToggleOutcome::Queued)
                }
            };
        }

        let result = self
            .api
            .toggle_checklist_item(self.job_id, item_id, value)
            .await;
        self.lock().activity.checklist_saving.remove(&item_id);
        self.ensure_live()?;

        match result {
            Ok(()) => {
                self.update_cached(|job| {
                    if let Some(item) = job.checklist_item_mut(item_id) {
                        item.is_completed = value;
                    }
                });
                Ok(ToggleOutcome::Saved)
            }
            Err(e) => {
                warn!("Checklist item {} rolled back: {}", item_id, e);
                self.rollback_item(item_id, previous, e.to_string());
                Err(e.into())
            }
        }
    }

    fn rollback_item(&self, item_id: Uuid, previous: bool, reason: String) {
        let mut state = self.lock();
        if let Some(item) = state.job.checklist_item_mut(item_id) {
            item.is_completed = previous;
        }
        state.item_errors.insert(item_id, reason);
    }

    // =============================================================================
    // Report, refresh and sync
    // =============================================================================

    /// Downloads the report PDF of a completed job
    pub async fn share_report(&self) -> Result<Vec<u8>> {
        let connectivity = self.connectivity();
        let pending = self.pending();
        blocked(self.lock().gates(connectivity, pending).share_report)?;

        let pdf = self.api.fetch_job_report_pdf(self.job_id).await;
        self.ensure_live()?;
        Ok(pdf?)
    }

    /// Replaces the local view with the backend's state
    pub async fn refresh(&self) -> Result<()> {
        let fetched = fetch_authoritative(self.api.as_ref(), self.job_id).await;
        self.ensure_live()?;

        let job = fetched?;
        self.cache.store(&job)?;
        self.commit_authoritative(job);
        Ok(())
    }

    /// Drains the outbox and refreshes this job
    pub async fn sync(&self) -> Result<ReconcileOutcome> {
        self.lock().activity.syncing = true;
        let outcome = self.reconciler.reconcile(Some(self.job_id)).await;
        self.lock().activity.syncing = false;
        self.ensure_live()?;

        let outcome = outcome?;
        if let ReconcileOutcome::Completed { refreshed, .. } = &outcome {
            if let Some(job) = refreshed.iter().find(|j| j.id == self.job_id) {
                self.commit_authoritative(job.clone());
            }
        }
        Ok(outcome)
    }

    /// Overwrites the local job, then replays what is still pending on top
    fn commit_authoritative(&self, job: Job) {
        let job = overlay(job, self.outbox.as_ref());
        let mut state = self.lock();

        let (from, to) = (state.job.status, job.status);
        if !from.can_transition_to(to) {
            warn!("Job {} went from {} to {} on the backend", self.job_id, from, to);
        }
        state.job = job;
    }

    /// Applies a confirmed change to the cached snapshot
    fn update_cached(&self, change: impl FnOnce(&mut Job)) {
        let result = self.cache.load(self.job_id).and_then(|cached| match cached {
            Some(mut job) => {
                change(&mut job);
                self.cache.store(&job)
            }
            None => Ok(()),
        });

        if let Err(e) = result {
            warn!("Failed to update cached job {}: {}", self.job_id, e);
        }
    }
}

#[async_trait]
impl OnlineHandler for JobSession {
    async fn on_online(&self) {
        match self.sync().await {
            Ok(ReconcileOutcome::Halted { remaining, .. }) => {
                warn!("Sync of job {} halted, {} entries pending", self.job_id, remaining)
            }
            Ok(_) => {}
            Err(SessionError::Abandoned) => {}
            Err(e) => error!("Sync of job {} failed: {}", self.job_id, e),
        }
    }
}
