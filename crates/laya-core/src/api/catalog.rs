//! Read-only lookups: technologies, domains and contributors.

use crate::client::{ApiClient, RequestOptions};
use crate::error::{ClientError, Result};
use crate::models::{Contributor, Domain, Technology};

impl ApiClient {
    /// All technologies, or only those attached to `project_id`.
    pub async fn list_technologies(&self, project_id: Option<&str>) -> Result<Vec<Technology>> {
        let path = match project_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => format!("/technologies/project/{}", id),
            None => "/technologies/".to_string(),
        };
        self.request(&path, RequestOptions::get()).await
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.request("/domains/", RequestOptions::get()).await
    }

    /// People attached to one project. The backend has no global listing.
    pub async fn list_contributors(&self, project_id: &str) -> Result<Vec<Contributor>> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(ClientError::validation("A project id is required."));
        }
        self.request(&format!("/contributors/project/{}", project_id), RequestOptions::get())
            .await
    }
}
