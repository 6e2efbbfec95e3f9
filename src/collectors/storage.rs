//! Cloud Storage buckets (global)

use super::standard_columns;
use crate::gcp::{ClientSet, GcpClient};
use crate::resource::fetcher::{add_query_param, fetch_all, fetch_one, json_path, json_str, ListRequest};
use crate::resource::normalize::{labels, timestamp_value};
use crate::resource::{
    BestEffort, Collected, Collector, Column, NameKind, Resource, RunContext, GLOBAL_REGION,
};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Members that make a bucket readable by anyone
const PUBLIC_MEMBERS: &[&str] = &["allUsers", "allAuthenticatedUsers"];

pub struct BucketsCollector {
    clients: ClientSet,
}

impl BucketsCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

/// Summary of a bucket IAM policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IamSummary {
    public: Option<bool>,
    bindings: Option<usize>,
}

impl From<&Value> for IamSummary {
    fn from(policy: &Value) -> Self {
        let bindings = policy
            .get("bindings")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let public = bindings.iter().any(|binding| {
            binding
                .get("members")
                .and_then(Value::as_array)
                .is_some_and(|members| {
                    members
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|m| PUBLIC_MEMBERS.contains(&m))
                })
        });

        Self {
            public: Some(public),
            bindings: Some(bindings.len()),
        }
    }
}

async fn bucket_iam(client: &GcpClient, bucket: &str, cancel: &CancellationToken) -> Result<IamSummary> {
    let url = format!("{}/iam", client.storage_bucket_url(bucket));
    let policy = fetch_one(client, &url, cancel).await?;
    Ok(IamSummary::from(&policy))
}

#[async_trait::async_trait]
impl Collector for BucketsCollector {
    fn name(&self) -> &str {
        "storage-buckets"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&[
            "Project",
            "Location",
            "LocationType",
            "StorageClass",
            "Versioning",
            "UniformAccess",
            "Public",
            "IamBindings",
            "Labels",
            "Created",
            "Updated",
        ])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        if !self.clients.is_home_region(region) {
            return Ok(Collected::not_applicable());
        }
        let client = self.clients.get(region)?;

        let url = add_query_param(&client.storage_url("b"), "project", &client.project_id);
        let buckets = fetch_all(client, &ListRequest::new(url, "items"), &ctx.cancel)
            .await
            .context("Failed to list buckets")?;

        let mut out = Collected::new();
        for bucket in &buckets {
            let name = json_str(bucket, "name").unwrap_or_default();

            let project = match bucket.get("projectNumber") {
                Some(Value::String(number)) => Some(number.clone()),
                Some(Value::Number(number)) => Some(number.to_string()),
                _ => None,
            };
            let project = match project {
                Some(number) => {
                    ctx.names
                        .resolve_name(&ctx.cancel, NameKind::Project, region, &number)
                        .await
                }
                None => String::new(),
            };

            let iam = BestEffort::from_result(
                bucket_iam(client, name, &ctx.cancel)
                    .await
                    .map_err(|e| format!("{:#}", e)),
                &format!("IAM policy of bucket {}", name),
            )
            .record(&mut out);

            out.push(
                Resource::new("storage", name, GLOBAL_REGION)
                    .sub1("Bucket")
                    .with_arn(json_str(bucket, "selfLink").unwrap_or_default())
                    .with("Project", project)
                    .with("Location", bucket.get("location"))
                    .with("LocationType", bucket.get("locationType"))
                    .with("StorageClass", bucket.get("storageClass"))
                    .with("Versioning", json_path(bucket, "versioning.enabled"))
                    .with(
                        "UniformAccess",
                        json_path(bucket, "iamConfiguration.uniformBucketLevelAccess.enabled"),
                    )
                    .with("Public", iam.public)
                    .with("IamBindings", iam.bindings)
                    .with("Labels", labels(bucket.get("labels")))
                    .with("Created", timestamp_value(bucket.get("timeCreated")))
                    .with("Updated", timestamp_value(bucket.get("updated"))),
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iam_summary_detects_public_members() {
        let policy = json!({
            "bindings": [
                {"role": "roles/storage.admin", "members": ["user:ops@example.com"]},
                {"role": "roles/storage.objectViewer", "members": ["allUsers"]}
            ]
        });
        assert_eq!(
            IamSummary::from(&policy),
            IamSummary {
                public: Some(true),
                bindings: Some(2)
            }
        );
    }

    #[test]
    fn test_iam_summary_private_bucket() {
        let summary = IamSummary::from(&json!({"bindings": []}));
        assert_eq!(summary.public, Some(false));
        assert_eq!(summary.bindings, Some(0));
    }

    #[test]
    fn test_default_summary_renders_empty() {
        let summary = IamSummary::default();
        let row = Resource::new("storage", "b", GLOBAL_REGION)
            .with("Public", summary.public)
            .with("IamBindings", summary.bindings);
        assert_eq!(row.get("Public"), "");
        assert_eq!(row.get("IamBindings"), "");
    }
}
