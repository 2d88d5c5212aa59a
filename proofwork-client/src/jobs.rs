//! Job lifecycle endpoints

use crate::FieldApiClient;
use crate::error::Result;
use proofwork_core::domain::geo::GeoPoint;
use proofwork_core::domain::job::Job;
use proofwork_core::dto::job::CheckRequest;
use uuid::Uuid;

impl FieldApiClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Get the authoritative state of a job
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = self.url(&format!("/api/jobs/{}", job_id));
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await
    }

    /// Check the worker in at the job site
    ///
    /// The backend rejects a second check-in for the same job.
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    /// * `point` - GPS fix taken at check-in time
    ///
    /// # Returns
    /// The job as the backend sees it after the check-in
    pub async fn check_in(&self, job_id: Uuid, point: GeoPoint) -> Result<Job> {
        let url = self.url(&format!("/api/jobs/{}/check-in", job_id));
        let response = self
            .authorize(self.client.post(&url))
            .json(&CheckRequest::from(point))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Check the worker out of the job site
    ///
    /// The backend re-validates photo and checklist completeness and rejects a
    /// second check-out.
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    /// * `point` - GPS fix taken at check-out time
    pub async fn check_out(&self, job_id: Uuid, point: GeoPoint) -> Result<Job> {
        let url = self.url(&format!("/api/jobs/{}/check-out", job_id));
        let response = self
            .authorize(self.client.post(&url))
            .json(&CheckRequest::from(point))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Download the proof-of-work report of a completed job
    ///
    /// # Returns
    /// The PDF document bytes
    pub async fn get_job_report_pdf(&self, job_id: Uuid) -> Result<Vec<u8>> {
        let url = self.url(&format!("/api/jobs/{}/report.pdf", job_id));
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_bytes_response(response).await
    }

    // =============================================================================
    // Health
    // =============================================================================

    /// Check that the backend is reachable
    pub async fn health(&self) -> Result<()> {
        let url = self.url("/api/health");
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
