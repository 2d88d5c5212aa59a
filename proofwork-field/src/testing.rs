//! In-memory backend used by the engine tests

use async_trait::async_trait;
use chrono::Utc;
use proofwork_client::{ClientError, JobApi};
use proofwork_core::domain::check_event::RawCheckEvent;
use proofwork_core::domain::checklist::{ChecklistItem, ChecklistItemState};
use proofwork_core::domain::geo::GeoPoint;
use proofwork_core::domain::job::{Job, JobStatus, LocationRef, ScheduleWindow};
use proofwork_core::domain::photo::{Photo, PhotoKind};
use proofwork_core::rules::checklist::ChecklistSummary;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

type ApiResult<T> = proofwork_client::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiOp {
    CheckIn,
    CheckOut,
    UploadPhoto,
    BulkChecklist,
    ToggleItem,
    FetchDetail,
    FetchPhotos,
    FetchReport,
    Ping,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    CheckIn(Uuid),
    CheckOut(Uuid),
    UploadPhoto(Uuid, PhotoKind),
    BulkChecklist(Uuid),
    ToggleItem(Uuid, Uuid, bool),
    FetchDetail(Uuid),
    FetchPhotos(Uuid),
    FetchReport(Uuid),
    Ping,
}

impl ApiCall {
    pub(crate) fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApiCall::CheckIn(_)
                | ApiCall::CheckOut(_)
                | ApiCall::UploadPhoto(..)
                | ApiCall::BulkChecklist(_)
                | ApiCall::ToggleItem(..)
        )
    }
}

enum Failure {
    Rejected(u16),
    Transport,
}

/// Backend double that enforces the same rules as the real server
#[derive(Default)]
pub(crate) struct FakeApi {
    jobs: Mutex<HashMap<Uuid, Job>>,
    calls: Mutex<Vec<ApiCall>>,
    failures: Mutex<Vec<(ApiOp, Failure)>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeApi {
    pub(crate) fn with_job(job: Job) -> Self {
        let api = Self::default();
        api.put_job(job);
        api
    }

    pub(crate) fn put_job(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id, job);
    }

    pub(crate) fn job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&job_id).cloned()
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes the next call of `op` answer with an HTTP error status
    pub(crate) fn fail_next(&self, op: ApiOp, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .push((op, Failure::Rejected(status)));
    }

    /// Makes the next call of `op` fail before reaching the server
    pub(crate) fn drop_next(&self, op: ApiOp) {
        self.failures.lock().unwrap().push((op, Failure::Transport));
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn enter(&self, op: ApiOp, call: ApiCall) -> ApiResult<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = {
            let mut failures = self.failures.lock().unwrap();
            failures
                .iter()
                .position(|(o, _)| *o == op)
                .map(|i| failures.remove(i).1)
        };

        match failure {
            Some(Failure::Transport) => Err(transport_error()),
            Some(Failure::Rejected(status)) => {
                self.calls.lock().unwrap().push(call);
                Err(ClientError::api_error(status, "injected failure"))
            }
            None => {
                self.calls.lock().unwrap().push(call);
                Ok(())
            }
        }
    }

    fn with_stored<T>(&self, job_id: Uuid, f: impl FnOnce(&mut Job) -> ApiResult<T>) -> ApiResult<T> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| ClientError::api_error(404, "job not found"))?;
        f(job)
    }
}

/// A request error that never reached a server
pub(crate) fn transport_error() -> ClientError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err();
    ClientError::RequestFailed(err)
}

fn record_event(job: &mut Job, event_type: &str, point: GeoPoint) {
    job.check_events.push(RawCheckEvent(json!({
        "event_type": event_type,
        "occurred_at": Utc::now().to_rfc3339(),
        "lat": point.lat,
        "lng": point.lng,
    })));
}

#[async_trait]
impl JobApi for FakeApi {
    async fn check_in(&self, job_id: Uuid, point: GeoPoint) -> ApiResult<Job> {
        self.enter(ApiOp::CheckIn, ApiCall::CheckIn(job_id)).await?;
        self.with_stored(job_id, |job| {
            if job.status != JobStatus::Scheduled {
                return Err(ClientError::api_error(409, "job already started"));
            }
            job.status = JobStatus::InProgress;
            record_event(job, "check_in", point);
            Ok(job.clone())
        })
    }

    async fn check_out(&self, job_id: Uuid, point: GeoPoint) -> ApiResult<Job> {
        self.enter(ApiOp::CheckOut, ApiCall::CheckOut(job_id)).await?;
        self.with_stored(job_id, |job| {
            let checklist = ChecklistSummary::from_items(&job.checklist);
            if job.status != JobStatus::InProgress
                || !job.has_photo(PhotoKind::Before)
                || !job.has_photo(PhotoKind::After)
                || !checklist.checklist_ok()
            {
                return Err(ClientError::api_error(422, "job is not ready for check-out"));
            }
            job.status = JobStatus::Completed;
            record_event(job, "check_out", point);
            Ok(job.clone())
        })
    }

    async fn upload_photo(
        &self,
        job_id: Uuid,
        kind: PhotoKind,
        _local_handle: &Path,
    ) -> ApiResult<Photo> {
        self.enter(ApiOp::UploadPhoto, ApiCall::UploadPhoto(job_id, kind))
            .await?;
        self.with_stored(job_id, |job| {
            let photo = Photo {
                id: Some(Uuid::new_v4()),
                kind,
                url: Some(format!("https://cdn.test/{}/{}.jpg", job_id, kind)),
                local_handle: None,
                uploaded_at: Some(Utc::now()),
            };
            job.put_photo(photo.clone());
            Ok(photo)
        })
    }

    async fn bulk_update_checklist(
        &self,
        job_id: Uuid,
        items: &[ChecklistItemState],
    ) -> ApiResult<()> {
        self.enter(ApiOp::BulkChecklist, ApiCall::BulkChecklist(job_id))
            .await?;
        self.with_stored(job_id, |job| {
            for state in items {
                if let Some(item) = job.checklist_item_mut(state.id) {
                    item.is_completed = state.is_completed;
                }
            }
            Ok(())
        })
    }

    async fn toggle_checklist_item(&self, job_id: Uuid, item_id: Uuid, value: bool) -> ApiResult<()> {
        self.enter(ApiOp::ToggleItem, ApiCall::ToggleItem(job_id, item_id, value))
            .await?;
        self.with_stored(job_id, |job| {
            let item = job
                .checklist_item_mut(item_id)
                .ok_or_else(|| ClientError::api_error(404, "checklist item not found"))?;
            item.is_completed = value;
            Ok(())
        })
    }

    async fn fetch_job_detail(&self, job_id: Uuid) -> ApiResult<Job> {
        self.enter(ApiOp::FetchDetail, ApiCall::FetchDetail(job_id))
            .await?;
        self.with_stored(job_id, |job| Ok(job.clone()))
    }

    async fn fetch_job_photos(&self, job_id: Uuid) -> ApiResult<Vec<Photo>> {
        self.enter(ApiOp::FetchPhotos, ApiCall::FetchPhotos(job_id))
            .await?;
        self.with_stored(job_id, |job| Ok(job.photos.clone()))
    }

    async fn fetch_job_report_pdf(&self, job_id: Uuid) -> ApiResult<Vec<u8>> {
        self.enter(ApiOp::FetchReport, ApiCall::FetchReport(job_id))
            .await?;
        self.with_stored(job_id, |job| {
            if job.status != JobStatus::Completed {
                return Err(ClientError::api_error(409, "report not available"));
            }
            Ok(b"%PDF-1.4 proofwork".to_vec())
        })
    }

    async fn ping(&self) -> ApiResult<()> {
        self.enter(ApiOp::Ping, ApiCall::Ping).await
    }
}

pub(crate) const REQUIRED_ITEM: Uuid = Uuid::from_u128(0x11);
pub(crate) const OPTIONAL_ITEM: Uuid = Uuid::from_u128(0x22);

/// A scheduled job with one required and one optional checklist item
pub(crate) fn scheduled_job() -> Job {
    Job {
        id: Uuid::new_v4(),
        status: JobStatus::Scheduled,
        window: ScheduleWindow {
            starts_at: Utc::now(),
            ends_at: None,
        },
        location: LocationRef {
            id: Uuid::new_v4(),
            name: Some("Depot 4".to_string()),
            address: Some("12 Harbour Road".to_string()),
        },
        worker_id: Some(Uuid::new_v4()),
        check_events: vec![],
        photos: vec![],
        checklist: vec![
            ChecklistItem {
                id: REQUIRED_ITEM,
                text: "Isolate the mains".to_string(),
                is_required: true,
                is_completed: false,
            },
            ChecklistItem {
                id: OPTIONAL_ITEM,
                text: "Note meter reading".to_string(),
                is_required: false,
                is_completed: false,
            },
        ],
    }
}

pub(crate) fn in_progress_job() -> Job {
    let mut job = scheduled_job();
    job.status = JobStatus::InProgress;
    record_event(&mut job, "check_in", GeoPoint { lat: 51.5, lng: -0.12 });
    job
}

/// Writes an empty file standing in for a captured photo
pub(crate) fn photo_file(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("proofwork-photos-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, b"\xFF\xD8\xFF").unwrap();
    path
}
