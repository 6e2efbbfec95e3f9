//! Collector Registry
//!
//! Maps collector names to collector instances. Built once at startup and
//! read-only afterwards; the orchestrator receives it by reference.

use super::collector::Collector;
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("collector '{0}' is already registered")]
    Duplicate(String),

    #[error("unknown collector '{name}' (available: {available})")]
    Unknown { name: String, available: String },
}

/// Name -> collector mapping, iterated in registration order
#[derive(Default, Clone)]
pub struct Registry {
    collectors: IndexMap<String, Arc<dyn Collector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector under an explicit name
    pub fn register(
        &mut self,
        name: &str,
        collector: Arc<dyn Collector>,
    ) -> Result<(), RegistryError> {
        if self.collectors.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.collectors.insert(name.to_string(), collector);
        Ok(())
    }

    /// Register a collector under its own name
    pub fn register_collector(&mut self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let name = collector.name().to_string();
        self.register(&name, collector)
    }

    /// Get a collector by exact name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Collector>> {
        self.collectors.get(name)
    }

    /// All collectors, in registration order
    pub fn collectors(&self) -> &IndexMap<String, Arc<dyn Collector>> {
        &self.collectors
    }

    /// Get all collector names (for --list-collectors and error messages)
    pub fn names(&self) -> Vec<&str> {
        self.collectors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Resolve a user selection. An empty selection means every collector.
    ///
    /// The result follows registration order regardless of the order names
    /// were given in, so output is reproducible.
    pub fn select(&self, names: &[String]) -> Result<Vec<Arc<dyn Collector>>, RegistryError> {
        if names.is_empty() {
            return Ok(self.collectors.values().cloned().collect());
        }

        if let Some(unknown) = names.iter().find(|n| !self.collectors.contains_key(n.as_str())) {
            return Err(RegistryError::Unknown {
                name: unknown.clone(),
                available: self.names().join(", "),
            });
        }

        Ok(self
            .collectors
            .iter()
            .filter(|(name, _)| names.contains(name))
            .map(|(_, collector)| collector.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Collected, Column, RunContext};

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl Collector for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn columns(&self) -> Vec<Column> {
            vec![Column::name()]
        }

        async fn collect(&self, _ctx: &RunContext, _region: &str) -> anyhow::Result<Collected> {
            Ok(Collected::new())
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["compute-instances", "gke-clusters", "storage-buckets"] {
            registry.register_collector(Arc::new(Named(name))).unwrap();
        }
        registry
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        assert_eq!(
            registry().names(),
            vec!["compute-instances", "gke-clusters", "storage-buckets"]
        );
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = registry();
        let err = registry
            .register("gke-clusters", Arc::new(Named("other")))
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("gke-clusters".to_string()));
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = registry();
        assert!(registry.get("gke-clusters").is_some());
        assert!(registry.get("gke").is_none());
        assert_eq!(registry.collectors().len(), 3);
    }

    #[test]
    fn test_select_follows_registry_order() {
        let selected = registry()
            .select(&["storage-buckets".to_string(), "compute-instances".to_string()])
            .unwrap();
        let names: Vec<&str> = selected.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["compute-instances", "storage-buckets"]);
    }

    #[test]
    fn test_select_empty_means_all_and_unknown_fails() {
        let registry = registry();
        assert_eq!(registry.select(&[]).unwrap().len(), 3);

        let err = registry.select(&["sql-instances".to_string()]).err().unwrap();
        assert!(matches!(err, RegistryError::Unknown { ref name, .. } if name == "sql-instances"));
    }
}
