//! Name lookups backed by GCP list APIs

use super::clients::ClientSet;
use super::projects::list_projects;
use crate::resource::fetcher::{fetch_all, json_str, ListRequest};
use crate::resource::{NameKind, NameSource};
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// [`NameSource`] that enumerates networks, subnetworks and projects
pub struct GcpNameSource {
    clients: ClientSet,
}

impl GcpNameSource {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

/// Index Compute items by self link and numeric id
fn index_by_link_and_id(items: &[Value]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for item in items {
        let Some(name) = json_str(item, "name") else {
            continue;
        };
        for key in ["selfLink", "id"] {
            if let Some(id) = json_str(item, key) {
                names.insert(id.to_string(), name.to_string());
            }
        }
    }
    names
}

#[async_trait::async_trait]
impl NameSource for GcpNameSource {
    async fn list_names(
        &self,
        kind: NameKind,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, String>> {
        match kind {
            NameKind::Network => {
                let client = self.clients.home()?;
                let request = ListRequest::new(client.compute_global_url("networks"), "items");
                let items = fetch_all(client, &request, cancel).await?;
                Ok(index_by_link_and_id(&items))
            }
            NameKind::Subnetwork => {
                let client = self.clients.get(region)?;
                let request = ListRequest::new(client.compute_regional_url("subnetworks"), "items");
                let items = fetch_all(client, &request, cancel).await?;
                Ok(index_by_link_and_id(&items))
            }
            NameKind::Project => {
                let client = self.clients.home()?;
                let projects = list_projects(client, cancel).await?;
                Ok(projects
                    .into_iter()
                    .filter(|p| !p.project_number.is_empty())
                    .map(|p| (p.project_number, p.project_id))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_by_link_and_id() {
        let items = vec![
            json!({"name": "default", "id": "111", "selfLink": "https://x/global/networks/default"}),
            json!({"id": "222"}),
        ];
        let names = index_by_link_and_id(&items);
        assert_eq!(names.get("111").map(String::as_str), Some("default"));
        assert_eq!(
            names.get("https://x/global/networks/default").map(String::as_str),
            Some("default")
        );
        assert!(!names.contains_key("222"));
    }
}
