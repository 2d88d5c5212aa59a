//! Backend contract used by the field engine

use async_trait::async_trait;
use proofwork_core::domain::checklist::ChecklistItemState;
use proofwork_core::domain::geo::GeoPoint;
use proofwork_core::domain::job::Job;
use proofwork_core::domain::photo::{Photo, PhotoKind};
use std::path::Path;
use uuid::Uuid;

use crate::FieldApiClient;
use crate::error::Result;

/// Operations the field engine needs from the backend
///
/// Every mutation must be idempotent under retry: the outbox delivers at least
/// once, so the same checklist state or photo may arrive twice.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Checks in; the backend rejects a second check-in
    async fn check_in(&self, job_id: Uuid, point: GeoPoint) -> Result<Job>;

    /// Checks out; the backend re-validates photos and checklist
    async fn check_out(&self, job_id: Uuid, point: GeoPoint) -> Result<Job>;

    /// Uploads a photo; the same kind twice overwrites
    async fn upload_photo(&self, job_id: Uuid, kind: PhotoKind, local_handle: &Path)
    -> Result<Photo>;

    async fn bulk_update_checklist(&self, job_id: Uuid, items: &[ChecklistItemState])
    -> Result<()>;

    async fn toggle_checklist_item(&self, job_id: Uuid, item_id: Uuid, value: bool) -> Result<()>;

    /// Authoritative job state
    async fn fetch_job_detail(&self, job_id: Uuid) -> Result<Job>;

    async fn fetch_job_photos(&self, job_id: Uuid) -> Result<Vec<Photo>>;

    /// Report PDF of a completed job
    async fn fetch_job_report_pdf(&self, job_id: Uuid) -> Result<Vec<u8>>;

    /// Reachability check
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl JobApi for FieldApiClient {
    async fn check_in(&self, job_id: Uuid, point: GeoPoint) -> Result<Job> {
        FieldApiClient::check_in(self, job_id, point).await
    }

    async fn check_out(&self, job_id: Uuid, point: GeoPoint) -> Result<Job> {
        FieldApiClient::check_out(self, job_id, point).await
    }

    async fn upload_photo(
        &self,
        job_id: Uuid,
        kind: PhotoKind,
        local_handle: &Path,
    ) -> Result<Photo> {
        self.upload_photo_file(job_id, kind, local_handle).await
    }

    async fn bulk_update_checklist(
        &self,
        job_id: Uuid,
        items: &[ChecklistItemState],
    ) -> Result<()> {
        self.put_checklist(job_id, items.to_vec()).await
    }

    async fn toggle_checklist_item(&self, job_id: Uuid, item_id: Uuid, value: bool) -> Result<()> {
        self.patch_checklist_item(job_id, item_id, value).await
    }

    async fn fetch_job_detail(&self, job_id: Uuid) -> Result<Job> {
        self.get_job(job_id).await
    }

    async fn fetch_job_photos(&self, job_id: Uuid) -> Result<Vec<Photo>> {
        self.list_photos(job_id).await
    }

    async fn fetch_job_report_pdf(&self, job_id: Uuid) -> Result<Vec<u8>> {
        self.get_job_report_pdf(job_id).await
    }

    async fn ping(&self) -> Result<()> {
        self.health().await
    }
}
