//! Built-in GCP collectors
//!
//! Each submodule implements [`Collector`] for one or more resource types.
//! Global services (networks, firewalls, buckets) only do work in the home
//! region and report [`GLOBAL_REGION`](crate::resource::GLOBAL_REGION) as
//! their region; everywhere else they return an empty result.

pub mod compute;
pub mod gke;
pub mod run;
pub mod storage;

use crate::gcp::ClientSet;
use crate::resource::{Collector, Column, Registry};
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry with every built-in collector, in a fixed order
pub fn default_registry(clients: &ClientSet) -> Registry {
    let collectors: Vec<Arc<dyn Collector>> = vec![
        Arc::new(compute::InstancesCollector::new(clients.clone())),
        Arc::new(compute::NetworksCollector::new(clients.clone())),
        Arc::new(compute::SubnetworksCollector::new(clients.clone())),
        Arc::new(compute::FirewallsCollector::new(clients.clone())),
        Arc::new(gke::ClustersCollector::new(clients.clone())),
        Arc::new(storage::BucketsCollector::new(clients.clone())),
        Arc::new(run::RevisionsCollector::new(clients.clone())),
    ];

    let mut registry = Registry::new();
    for collector in collectors {
        if let Err(e) = registry.register_collector(collector) {
            // Names above are literals; a clash is a programming error
            tracing::error!("{}", e);
        }
    }
    registry
}

/// Category, Name and Region, then one raw-data column per field (header and
/// key are the same), then the self link
pub fn standard_columns(fields: &[&str]) -> Vec<Column> {
    let mut columns = vec![Column::category(), Column::name(), Column::region()];
    columns.extend(fields.iter().map(|field| Column::field(field, field)));
    columns.push(Column::arn());
    columns
}

/// One revision of a named, versioned object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision<T> {
    pub name: String,
    pub revision: u64,
    pub item: T,
}

impl<T> Revision<T> {
    pub fn new(name: &str, revision: u64, item: T) -> Self {
        Self {
            name: name.to_string(),
            revision,
            item,
        }
    }

    /// `name:revision`
    pub fn label(&self) -> String {
        format!("{}:{}", self.name, self.revision)
    }
}

/// Keep only the highest revision of each name.
///
/// Names keep the position of their first appearance; on equal revisions the
/// later item wins.
pub fn latest_revisions<T>(items: impl IntoIterator<Item = Revision<T>>) -> Vec<Revision<T>> {
    let mut latest: IndexMap<String, Revision<T>> = IndexMap::new();

    for item in items {
        match latest.get_mut(&item.name) {
            Some(current) if current.revision > item.revision => {},
            Some(current) => *current = item,
            None => {
                latest.insert(item.name.clone(), item);
            },
        }
    }

    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::auth::GcpCredentials;
    use crate::gcp::{Endpoints, GcpClient};
    use crate::resource::Resource;

    #[test]
    fn test_latest_revision_wins() {
        let items = vec![Revision::new("job", 1, ()), Revision::new("job", 2, ())];
        let latest = latest_revisions(items);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].label(), "job:2");
    }

    #[test]
    fn test_latest_revisions_keeps_first_seen_order() {
        let items = vec![
            Revision::new("web", 3, "w3"),
            Revision::new("api", 1, "a1"),
            Revision::new("web", 1, "w1"),
            Revision::new("api", 4, "a4"),
        ];
        let latest = latest_revisions(items);
        let labels: Vec<String> = latest.iter().map(Revision::label).collect();
        assert_eq!(labels, vec!["web:3", "api:4"]);
        assert_eq!(latest[1].item, "a4");
    }

    #[test]
    fn test_default_registry_columns_are_safe_on_empty_resources() {
        let base = GcpClient::with_credentials(
            GcpCredentials::from_token("t"),
            "my-project",
            "us-central1",
            Endpoints::default(),
        )
        .unwrap();
        let clients = ClientSet::for_regions(&base, &["us-central1".to_string()]);
        let registry = default_registry(&clients);

        assert_eq!(
            registry.names(),
            vec![
                "compute-instances",
                "compute-networks",
                "compute-subnetworks",
                "compute-firewalls",
                "gke-clusters",
                "storage-buckets",
                "run-revisions"
            ]
        );

        let empty = Resource::default();
        for collector in registry.collectors().values() {
            let columns = collector.columns();
            assert!(!columns.is_empty(), "{} has no columns", collector.name());
            for column in columns {
                let _ = column.value(&empty);
            }
        }
    }
}
