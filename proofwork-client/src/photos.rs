//! Photo endpoints

use crate::FieldApiClient;
use crate::error::{ClientError, Result};
use proofwork_core::domain::photo::{Photo, PhotoKind};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use uuid::Uuid;

impl FieldApiClient {
    // =============================================================================
    // Photos
    // =============================================================================

    /// List the photos attached to a job
    pub async fn list_photos(&self, job_id: Uuid) -> Result<Vec<Photo>> {
        let url = self.url(&format!("/api/jobs/{}/photos", job_id));
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Upload a captured photo
    ///
    /// Uploading a second photo of the same kind replaces the first one, so
    /// retrying an upload never creates a duplicate.
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    /// * `kind` - Before or after photo
    /// * `local_handle` - Path of the captured image on the device
    pub async fn upload_photo_file(
        &self,
        job_id: Uuid,
        kind: PhotoKind,
        local_handle: &Path,
    ) -> Result<Photo> {
        let bytes = tokio::fs::read(local_handle)
            .await
            .map_err(|source| ClientError::LocalFile {
                path: local_handle.display().to_string(),
                source,
            })?;

        let file_name = local_handle
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.jpg", kind));

        let form = Form::new()
            .text("type", kind.as_str())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let url = self.url(&format!("/api/jobs/{}/photos", job_id));
        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
