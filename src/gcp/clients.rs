//! Per-region clients
//!
//! Collectors never build clients themselves; they look up the one for the
//! region they were asked to collect.

use super::client::GcpClient;
use crate::error::CollectError;
use anyhow::Result;
use indexmap::IndexMap;

/// Authenticated clients keyed by region, in configuration order
#[derive(Clone, Default)]
pub struct ClientSet {
    clients: IndexMap<String, GcpClient>,
}

impl ClientSet {
    /// One client per region, all sharing `base`'s credentials
    pub fn for_regions(base: &GcpClient, regions: &[String]) -> Self {
        let clients = regions
            .iter()
            .map(|region| (region.clone(), base.for_region(region)))
            .collect();
        Self { clients }
    }

    /// Client for `region`, or a configuration error for the pair
    pub fn get(&self, region: &str) -> Result<&GcpClient> {
        self.clients.get(region).ok_or_else(|| {
            CollectError::MissingClient {
                region: region.to_string(),
            }
            .into()
        })
    }

    /// The first configured region; global services are collected there only
    pub fn home_region(&self) -> Option<&str> {
        self.clients.keys().next().map(String::as_str)
    }

    /// Whether `region` is where global services should be collected
    pub fn is_home_region(&self, region: &str) -> bool {
        self.home_region() == Some(region)
    }

    /// Client for global APIs
    pub fn home(&self) -> Result<&GcpClient> {
        let region = self.home_region().unwrap_or_default();
        self.get(region)
    }

    pub fn regions(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}
