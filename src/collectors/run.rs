//! Cloud Run revisions
//!
//! Only the latest revision of each service is reported.

use super::{latest_revisions, standard_columns, Revision};
use crate::gcp::ClientSet;
use crate::resource::fetcher::{fetch_all, json_path, json_str, ListRequest, Pagination};
use crate::resource::normalize::timestamp_value;
use crate::resource::{Collected, Collector, Column, Resource, RunContext};
use anyhow::{Context, Result};
use serde_json::Value;

const SERVICE_LABEL: &str = "serving.knative.dev/service";
const GENERATION_LABEL: &str = "serving.knative.dev/configurationGeneration";

pub struct RevisionsCollector {
    clients: ClientSet,
}

impl RevisionsCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

fn label<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.get(key))
        .and_then(Value::as_str)
}

/// Service and configuration generation of a revision, when labelled
fn revision_of(item: &Value) -> Option<Revision<&Value>> {
    let service = label(item, SERVICE_LABEL)?;
    let generation = label(item, GENERATION_LABEL)?.parse().ok()?;
    Some(Revision::new(service, generation, item))
}

fn ready_status(item: &Value) -> Option<&str> {
    json_path(item, "status.conditions")
        .and_then(Value::as_array)?
        .iter()
        .find(|c| json_str(c, "type") == Some("Ready"))
        .and_then(|c| json_str(c, "status"))
}

fn revision_row(revision: &Revision<&Value>, region: &str) -> Resource {
    let item = revision.item;

    Resource::new("run", &revision.label(), region)
        .sub1("Revision")
        .with_arn(json_str(item, "metadata.selfLink").unwrap_or_default())
        .with("Service", revision.name.as_str())
        .with("Revision", json_path(item, "metadata.name"))
        .with("Generation", revision.revision)
        .with("Image", json_path(item, "spec.containers.0.image"))
        .with("Ready", ready_status(item))
        .with("Created", timestamp_value(json_path(item, "metadata.creationTimestamp")))
}

#[async_trait::async_trait]
impl Collector for RevisionsCollector {
    fn name(&self) -> &str {
        "run-revisions"
    }

    fn columns(&self) -> Vec<Column> {
        standard_columns(&["Service", "Revision", "Generation", "Image", "Ready", "Created"])
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        let client = self.clients.get(region)?;

        let request = ListRequest::new(client.run_url("revisions"), "items")
            .with_pagination(Pagination::Continue);
        let items = fetch_all(client, &request, &ctx.cancel)
            .await
            .with_context(|| format!("Failed to list Cloud Run revisions in {}", region))?;

        let mut out = Collected::new();
        let mut revisions = Vec::with_capacity(items.len());
        for item in &items {
            match revision_of(item) {
                Some(revision) => revisions.push(revision),
                None => out.warn(format!(
                    "revision {} has no service generation labels",
                    json_str(item, "metadata.name").unwrap_or("?")
                )),
            }
        }

        for revision in latest_revisions(revisions) {
            out.push(revision_row(&revision, region));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn revision(service: &str, generation: &str, name: &str) -> Value {
        json!({
            "metadata": {
                "name": name,
                "labels": {
                    SERVICE_LABEL: service,
                    GENERATION_LABEL: generation
                },
                "creationTimestamp": "2024-03-01T10:00:00Z"
            },
            "spec": {"containers": [{"image": "gcr.io/p/web:1"}]},
            "status": {"conditions": [
                {"type": "Active", "status": "True"},
                {"type": "Ready", "status": "True"}
            ]}
        })
    }

    #[test]
    fn test_revision_row() {
        let item = revision("web", "2", "web-00002-abc");
        let parsed = revision_of(&item).unwrap();
        let row = revision_row(&parsed, "us-central1");

        assert_eq!(row.name, "web:2");
        assert_eq!(row.get("Revision"), "web-00002-abc");
        assert_eq!(row.get("Generation"), "2");
        assert_eq!(row.get("Image"), "gcr.io/p/web:1");
        assert_eq!(row.get("Ready"), "True");
        assert_eq!(row.get("Created"), "2024-03-01T10:00:00Z");
    }

    #[test]
    fn test_unlabelled_revision_is_skipped() {
        assert!(revision_of(&json!({"metadata": {"name": "orphan"}})).is_none());
        assert!(revision_of(&revision("web", "not-a-number", "x")).is_none());
    }
}
