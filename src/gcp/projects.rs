//! GCP Projects
//!
//! Project enumeration through the Resource Manager API.

use super::client::GcpClient;
use crate::resource::fetcher::{fetch_all, ListRequest};
use anyhow::Result;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Project information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub project_number: String,
    pub lifecycle_state: String,
}

impl From<&Value> for Project {
    fn from(value: &Value) -> Self {
        let field = |key: &str, default: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };

        Self {
            project_id: field("projectId", ""),
            name: field("name", ""),
            project_number: field("projectNumber", ""),
            lifecycle_state: field("lifecycleState", "UNKNOWN"),
        }
    }
}

/// List all accessible, active GCP projects
pub async fn list_projects(client: &GcpClient, cancel: &CancellationToken) -> Result<Vec<Project>> {
    let request = ListRequest::new(client.resourcemanager_url("projects"), "projects");
    let items = fetch_all(client, &request, cancel).await?;

    Ok(items
        .iter()
        .map(Project::from)
        .filter(|p| p.lifecycle_state == "ACTIVE")
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_from_json() {
        let project = Project::from(&json!({
            "projectId": "my-project",
            "name": "My Project",
            "projectNumber": "123456789012",
            "lifecycleState": "ACTIVE"
        }));
        assert_eq!(project.project_id, "my-project");
        assert_eq!(project.project_number, "123456789012");

        let sparse = Project::from(&json!({}));
        assert_eq!(sparse.lifecycle_state, "UNKNOWN");
        assert_eq!(sparse.project_id, "");
    }
}
