//! Checklist endpoints

use crate::FieldApiClient;
use crate::error::Result;
use proofwork_core::domain::checklist::ChecklistItemState;
use proofwork_core::dto::checklist::{BulkChecklistUpdate, ChecklistItemUpdate};
use uuid::Uuid;

impl FieldApiClient {
    // =============================================================================
    // Checklist
    // =============================================================================

    /// Set the completion state of several items at once
    ///
    /// Idempotent by item ID.
    pub async fn put_checklist(&self, job_id: Uuid, items: Vec<ChecklistItemState>) -> Result<()> {
        let url = self.url(&format!("/api/jobs/{}/checklist", job_id));
        let response = self
            .authorize(self.client.put(&url))
            .json(&BulkChecklistUpdate { items })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Set one item to a completion value
    pub async fn patch_checklist_item(&self, job_id: Uuid, item_id: Uuid, value: bool) -> Result<()> {
        let url = self.url(&format!("/api/jobs/{}/checklist/{}", job_id, item_id));
        let response = self
            .authorize(self.client.patch(&url))
            .json(&ChecklistItemUpdate {
                is_completed: value,
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
