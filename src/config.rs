//! Configuration Management
//!
//! Optional JSON defaults for gcpinv. Command-line flags override the file,
//! and the file overrides gcloud / environment defaults.

use crate::gcp::auth;
use crate::orchestrator::DEFAULT_CONCURRENCY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Region used when nothing else names one
pub const FALLBACK_REGION: &str = "us-central1";

/// Output directory used when nothing else names one
pub const DEFAULT_OUTPUT_DIR: &str = "inventory";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Project to inventory
    #[serde(default)]
    pub project_id: Option<String>,
    /// Regions to inventory; the first one also collects global services
    #[serde(default)]
    pub regions: Vec<String>,
    /// Collectors to run (empty = all)
    #[serde(default)]
    pub collectors: Vec<String>,
    /// Maximum (collector, region) pairs in flight
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcpinv").join("config.json"))
    }

    /// Load configuration from the default location.
    ///
    /// A missing file is an empty configuration; an unreadable one is logged
    /// and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    /// Effective project (CLI > config > gcloud default), empty when unknown
    pub fn effective_project(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.project_id.clone())
            .or_else(auth::get_default_project)
            .unwrap_or_default()
    }

    /// Effective regions (CLI > config > gcloud default > us-central1).
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn effective_regions(&self, cli: &[String]) -> Vec<String> {
        let configured = if !cli.is_empty() {
            cli.to_vec()
        } else if !self.regions.is_empty() {
            self.regions.clone()
        } else {
            vec![auth::get_default_region().unwrap_or_else(|| FALLBACK_REGION.to_string())]
        };

        let mut regions: Vec<String> = Vec::with_capacity(configured.len());
        for region in configured {
            let region = region.trim().to_string();
            if !region.is_empty() && !regions.contains(&region) {
                regions.push(region);
            }
        }
        regions
    }

    /// Effective collector selection (CLI > config); empty means all
    pub fn effective_collectors(&self, cli: &[String]) -> Vec<String> {
        if cli.is_empty() {
            self.collectors.clone()
        } else {
            cli.to_vec()
        }
    }

    pub fn effective_concurrency(&self, cli: Option<usize>) -> usize {
        cli.or(self.concurrency).unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }

    pub fn effective_output_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}
