//! Resource abstraction layer
//!
//! Everything a collector produces and everything the orchestrator and output
//! stage consume is expressed in the types of this module.
//!
//! # Architecture
//!
//! - [`normalize`] - Converts API values into canonical cell strings
//! - [`names`] - Per-run cache turning opaque identifiers into display names
//! - [`collector`] - The `Collector` trait every resource type implements
//! - [`registry`] - Name to collector mapping assembled at startup
//! - [`fetcher`] - Cancellable paginated fetches from GCP list APIs
//!
//! # Example
//!
//! ```ignore
//! use gcpinv::resource::{Column, Resource};
//!
//! let vm = Resource::new("compute", "web-1", "us-central1")
//!     .with("Status", "RUNNING")
//!     .with("Preemptible", false);
//! assert_eq!(Column::field("Status", "Status").value(&vm), "RUNNING");
//! ```

pub mod collector;
pub mod fetcher;
pub mod names;
pub mod normalize;
pub mod registry;

pub use collector::{BestEffort, Collected, Collector, RunContext};
pub use names::{NameKind, NameResolver, NameSource};
pub use normalize::Normalize;
pub use registry::{Registry, RegistryError};

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Region value used by collectors of global (non-regional) services
pub const GLOBAL_REGION: &str = "Global";

/// Rendered in the Name column when a resource has no name
pub const NAME_PLACEHOLDER: &str = "-";

/// One row of inventory output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub category: String,
    pub sub_category1: String,
    pub sub_category2: String,
    pub sub_category3: String,
    pub name: String,
    pub region: String,
    /// Unique identifier where the API exposes one (the resource self link on GCP)
    pub arn: String,
    raw_data: IndexMap<String, String>,
}

impl Resource {
    pub fn new(category: &str, name: &str, region: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            region: region.to_string(),
            ..Default::default()
        }
    }

    pub fn sub1(mut self, value: &str) -> Self {
        self.sub_category1 = value.to_string();
        self
    }

    pub fn sub2(mut self, value: &str) -> Self {
        self.sub_category2 = value.to_string();
        self
    }

    pub fn sub3(mut self, value: &str) -> Self {
        self.sub_category3 = value.to_string();
        self
    }

    pub fn with_arn(mut self, arn: &str) -> Self {
        self.arn = arn.to_string();
        self
    }

    /// Builder form of [`Resource::set`]
    pub fn with(mut self, key: &str, value: impl Normalize) -> Self {
        self.set(key, value);
        self
    }

    /// Store a raw data cell. The value is normalized on the way in, so raw
    /// data only ever holds canonical strings.
    pub fn set(&mut self, key: &str, value: impl Normalize) {
        self.raw_data.insert(key.to_string(), value.normalize());
    }

    /// Raw data cell for `key`, empty when the collector never set it
    pub fn get(&self, key: &str) -> &str {
        self.raw_data.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn raw_data(&self) -> &IndexMap<String, String> {
        &self.raw_data
    }

    /// Ordering used for sortable collectors
    pub fn sort_key(&self) -> (&str, &str, &str, &str, &str) {
        (
            self.category.as_str(),
            self.sub_category1.as_str(),
            self.sub_category2.as_str(),
            self.sub_category3.as_str(),
            self.name.as_str(),
        )
    }
}

type Accessor = Arc<dyn Fn(&Resource) -> String + Send + Sync>;

/// Report column: a header and the accessor producing its cell
#[derive(Clone)]
pub struct Column {
    header: String,
    accessor: Accessor,
}

impl Column {
    pub fn new<F>(header: &str, accessor: F) -> Self
    where
        F: Fn(&Resource) -> String + Send + Sync + 'static,
    {
        Self {
            header: header.to_string(),
            accessor: Arc::new(accessor),
        }
    }

    /// Column reading a raw data key
    pub fn field(header: &str, key: &str) -> Self {
        let key = key.to_string();
        Self::new(header, move |r| r.get(&key).to_string())
    }

    pub fn category() -> Self {
        Self::new("Category", |r| r.category.clone())
    }

    /// Column for one of the three sub-category levels (1-based)
    pub fn sub_category(level: u8, header: &str) -> Self {
        match level {
            1 => Self::new(header, |r| r.sub_category1.clone()),
            2 => Self::new(header, |r| r.sub_category2.clone()),
            _ => Self::new(header, |r| r.sub_category3.clone()),
        }
    }

    pub fn name() -> Self {
        Self::new("Name", |r| {
            if r.name.is_empty() {
                NAME_PLACEHOLDER.to_string()
            } else {
                r.name.clone()
            }
        })
    }

    pub fn region() -> Self {
        Self::new("Region", |r| r.region.clone())
    }

    pub fn arn() -> Self {
        Self::new("SelfLink", |r| r.arn.clone())
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn value(&self, resource: &Resource) -> String {
        (self.accessor)(resource)
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_raw_data_renders_empty() {
        let resource = Resource::new("compute", "vm", "us-east1");
        assert_eq!(Column::field("Status", "Status").value(&resource), "");
        assert_eq!(resource.get("anything"), "");
    }

    #[test]
    fn test_empty_name_uses_placeholder() {
        let resource = Resource::default();
        assert_eq!(Column::name().value(&resource), NAME_PLACEHOLDER);
        assert_eq!(Column::category().value(&resource), "");
    }

    #[test]
    fn test_raw_data_keeps_insertion_order() {
        let resource = Resource::new("gke", "c1", "europe-west1")
            .with("Zeta", 1)
            .with("Alpha", true)
            .with("Mid", Some("x"));
        let keys: Vec<&str> = resource.raw_data().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(resource.get("Alpha"), "true");
    }

    #[test]
    fn test_sub_category_columns() {
        let resource = Resource::new("gke", "pool-a", "us-central1")
            .sub1("cluster-1")
            .sub2("pool-a");
        assert_eq!(Column::sub_category(1, "Cluster").value(&resource), "cluster-1");
        assert_eq!(Column::sub_category(2, "Pool").value(&resource), "pool-a");
        assert_eq!(Column::sub_category(3, "Node").value(&resource), "");
    }
}
