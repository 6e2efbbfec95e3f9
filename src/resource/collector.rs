//! Collector contract
//!
//! One [`Collector`] per resource type. The orchestrator only ever talks to
//! collectors through this trait.

use super::names::NameResolver;
use super::{Column, Resource};
use anyhow::Result;
use std::fmt::Display;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-run state handed to every `collect` call
#[derive(Clone)]
pub struct RunContext {
    pub cancel: CancellationToken,
    pub names: Arc<NameResolver>,
}

impl RunContext {
    pub fn new(cancel: CancellationToken, names: Arc<NameResolver>) -> Self {
        Self { cancel, names }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Output of one `collect` call
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub resources: Vec<Resource>,
    /// Recoverable enrichment failures, one message each
    pub warnings: Vec<String>,
}

impl Collected {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing to collect (global collectors outside their home region)
    pub fn not_applicable() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("enrichment warning: {}", message);
        self.warnings.push(message);
    }
}

impl From<Vec<Resource>> for Collected {
    fn from(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            warnings: Vec::new(),
        }
    }
}

/// A value from an auxiliary call that may have been degraded.
///
/// Enrichment failures never fail a collection; they produce a fallback value
/// and a warning that ends up in the run report.
#[derive(Debug, Clone, PartialEq)]
pub struct BestEffort<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> BestEffort<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn degraded(value: T, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }

    /// Take the value, moving any warning into `out`
    pub fn record(self, out: &mut Collected) -> T {
        if let Some(warning) = self.warning {
            out.warn(warning);
        }
        self.value
    }
}

impl<T: Default> BestEffort<T> {
    /// Fall back to `T::default()` when the enrichment call failed
    pub fn from_result<E: Display>(result: std::result::Result<T, E>, what: &str) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::degraded(T::default(), format!("{}: {}", what, e)),
        }
    }
}

/// A resource-type collector
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Stable identifier, used for registry lookup and CLI selection
    fn name(&self) -> &str;

    /// Whether output may be reordered. Collectors emitting parent rows
    /// immediately followed by their children return false.
    fn should_sort(&self) -> bool {
        true
    }

    /// Report columns; static and independent of any run
    fn columns(&self) -> Vec<Column>;

    /// Enumerate this resource type in one region
    async fn collect(&self, ctx: &RunContext, region: &str) -> Result<Collected>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_effort_records_warning() {
        let mut out = Collected::new();
        let failed: std::result::Result<String, &str> = Err("403 Forbidden");
        let value = BestEffort::from_result(failed, "bucket 'logs' IAM policy").record(&mut out);

        assert_eq!(value, "");
        assert_eq!(out.warnings, vec!["bucket 'logs' IAM policy: 403 Forbidden"]);
    }

    #[test]
    fn test_best_effort_ok_records_nothing() {
        let mut out = Collected::new();
        let enriched = BestEffort::ok(3usize);
        assert!(!enriched.is_degraded());
        assert_eq!(enriched.record(&mut out), 3);
        assert!(out.warnings.is_empty());
    }
}
