//! GKE clusters and their node pools
//!
//! Every cluster row is immediately followed by its node pool rows, so this
//! collector opts out of sorting.

use crate::gcp::{ClientSet, GcpClient};
use crate::resource::fetcher::{fetch_all, json_path, json_str, ListRequest, Pagination};
use crate::resource::normalize::{labels, timestamp_value};
use crate::resource::{BestEffort, Collected, Collector, Column, Resource, RunContext};
use anyhow::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const CATEGORY: &str = "gke";

const FIELDS: &[&str] = &[
    "Location",
    "Status",
    "Version",
    "NodePools",
    "MachineType",
    "NodeCount",
    "Autoscaling",
    "Network",
    "Subnetwork",
    "Endpoint",
    "Labels",
    "Created",
];

pub struct ClustersCollector {
    clients: ClientSet,
}

impl ClustersCollector {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

async fn list_node_pools(
    client: &GcpClient,
    location: &str,
    cluster: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Value>> {
    let url = client.container_location_url(location, &format!("clusters/{}/nodePools", cluster));
    let request = ListRequest::new(url, "nodePools").with_pagination(Pagination::None);
    fetch_all(client, &request, cancel).await
}

fn cluster_row(item: &Value, region: &str, node_pools: Option<usize>) -> Resource {
    let name = json_str(item, "name").unwrap_or_default();

    Resource::new(CATEGORY, name, region)
        .sub1(name)
        .with_arn(json_str(item, "selfLink").unwrap_or_default())
        .with("Location", item.get("location"))
        .with("Status", item.get("status"))
        .with("Version", item.get("currentMasterVersion"))
        .with("NodePools", node_pools)
        .with("Network", item.get("network"))
        .with("Subnetwork", item.get("subnetwork"))
        .with("Endpoint", item.get("endpoint"))
        .with("Labels", labels(item.get("resourceLabels")))
        .with("Created", timestamp_value(item.get("createTime")))
}

fn node_pool_row(cluster: &str, pool: &Value, region: &str) -> Resource {
    let name = json_str(pool, "name").unwrap_or_default();
    let autoscaling = json_path(pool, "autoscaling.enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Resource::new(CATEGORY, name, region)
        .sub1(cluster)
        .sub2(name)
        .with_arn(json_str(pool, "selfLink").unwrap_or_default())
        .with("Status", pool.get("status"))
        .with("Version", pool.get("version"))
        .with("MachineType", json_path(pool, "config.machineType"))
        .with("NodeCount", pool.get("initialNodeCount"))
        .with("Autoscaling", autoscaling)
}

#[async_trait::async_trait]
impl Collector for ClustersCollector {
    fn name(&self) -> &str {
        "gke-clusters"
    }

    fn should_sort(&self) -> bool {
        false
    }

    fn columns(&self) -> Vec<Column> {
        let mut columns = vec![
            Column::category(),
            Column::sub_category(1, "Cluster"),
            Column::sub_category(2, "NodePool"),
            Column::name(),
            Column::region(),
        ];
        columns.extend(FIELDS.iter().map(|field| Column::field(field, field)));
        columns.push(Column::arn());
        columns
    }

    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected> {
        let client = self.clients.get(region)?;

        let request = ListRequest::new(client.container_location_url(region, "clusters"), "clusters")
            .with_pagination(Pagination::None);
        let clusters = fetch_all(client, &request, &ctx.cancel)
            .await
            .with_context(|| format!("Failed to list GKE clusters in {}", region))?;

        let mut out = Collected::new();
        for cluster in &clusters {
            let name = json_str(cluster, "name").unwrap_or_default();
            let location = json_str(cluster, "location").unwrap_or(region);

            let pools = BestEffort::from_result(
                list_node_pools(client, location, name, &ctx.cancel)
                    .await
                    .map(Some)
                    .map_err(|e| format!("{:#}", e)),
                &format!("node pools of cluster {}", name),
            )
            .record(&mut out);

            out.push(cluster_row(cluster, region, pools.as_ref().map(Vec::len)));
            for pool in pools.iter().flatten() {
                out.push(node_pool_row(name, pool, region));
            }
        }

        Ok(out)
    }
}
