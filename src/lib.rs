//! gcpinv: multi-region GCP resource inventory
//!
//! Collectors enumerate one resource type per region, the orchestrator runs
//! them across regions with bounded concurrency, and every value is
//! normalized to a string before it reaches a report.

pub mod collectors;
pub mod config;
pub mod error;
pub mod gcp;
pub mod orchestrator;
pub mod output;
pub mod resource;

/// Version injected at compile time via GCPINV_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("GCPINV_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
