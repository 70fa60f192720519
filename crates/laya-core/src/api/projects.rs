//! `/projects/` CRUD.

use crate::client::{ApiClient, RequestOptions};
use crate::error::{ClientError, Result};
use crate::models::{NewProject, Project};

impl ApiClient {
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.request("/projects/", RequestOptions::get()).await
    }

    pub async fn get_project(&self, id: &str) -> Result<Project> {
        let id = require_id(id)?;
        self.request(&format!("/projects/{}", id), RequestOptions::get()).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project> {
        validate_new_project(project)?;
        let options = RequestOptions::post_json(project)?;
        let created: Project = self.request("/projects/", options).await?;
        tracing::info!(id = %created.id, slug = %created.slug, "project created");
        Ok(created)
    }

    pub async fn delete_project(&self, id: &str) -> Result<Project> {
        let id = require_id(id)?;
        self.request(&format!("/projects/{}", id), RequestOptions::delete()).await
    }
}

/// `name` and `slug` are the only fields the backend requires.
pub fn validate_new_project(project: &NewProject) -> Result<()> {
    let missing: Vec<&str> = [("name", &project.name), ("slug", &project.slug)]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();

    match missing.as_slice() {
        [] => Ok(()),
        [field] => Err(ClientError::validation(format!("The {} field is required.", field))),
        _ => Err(ClientError::validation("The name and slug fields are required.")),
    }
}

fn require_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::validation("Project id is empty"));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_slug() {
        let err = validate_new_project(&NewProject::new("Laya", " ")).unwrap_err();
        assert_eq!(err.to_string(), "The slug field is required.");
    }

    #[test]
    fn test_missing_both() {
        let err = validate_new_project(&NewProject::default()).unwrap_err();
        assert_eq!(err.to_string(), "The name and slug fields are required.");
    }

    #[tokio::test]
    async fn test_create_without_slug_sends_nothing() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.create_project(&NewProject::new("Laya", "")).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}
