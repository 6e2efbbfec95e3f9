//! Multi-region orchestration
//!
//! Runs every selected collector in every configured region with bounded
//! concurrency. A failing (collector, region) pair is recorded and the rest
//! of the run carries on; only cancellation stops the run early.

use crate::error::CollectError;
use crate::resource::{Collected, Collector, Registry, RegistryError, Resource, RunContext};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pairs in flight when no concurrency is configured
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A (collector, region) pair that produced no resources
#[derive(Debug)]
pub struct PairError {
    pub collector: String,
    pub region: String,
    pub error: CollectError,
}

/// A recoverable problem a pair reported alongside its resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairWarning {
    pub collector: String,
    pub region: String,
    pub message: String,
}

/// Merged output of one collector across all regions
#[derive(Debug)]
pub struct CollectorReport {
    pub name: String,
    pub resources: Vec<Resource>,
    pub errors: Vec<PairError>,
    pub warnings: Vec<PairWarning>,
}

/// Output of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per selected collector, in selection order
    pub collectors: Vec<CollectorReport>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn get(&self, name: &str) -> Option<&CollectorReport> {
        self.collectors.iter().find(|c| c.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairError> {
        self.collectors.iter().flat_map(|c| c.errors.iter())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &PairWarning> {
        self.collectors.iter().flat_map(|c| c.warnings.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn total_resources(&self) -> usize {
        self.collectors.iter().map(|c| c.resources.len()).sum()
    }
}

/// Drives collectors across regions
#[derive(Debug, Clone)]
pub struct Orchestrator {
    regions: Vec<String>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(regions: Vec<String>) -> Self {
        Self {
            regions,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum pairs in flight (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Run the collectors `selection` names (all when empty)
    pub async fn run_registry(
        &self,
        registry: &Registry,
        selection: &[String],
        ctx: RunContext,
    ) -> Result<RunReport, RegistryError> {
        let collectors = registry.select(selection)?;
        Ok(self.run(&collectors, ctx).await)
    }

    /// Run `collectors` in every region
    pub async fn run(&self, collectors: &[Arc<dyn Collector>], ctx: RunContext) -> RunReport {
        let started = Instant::now();
        let region_count = self.regions.len();
        let total = collectors.len() * region_count;

        tracing::info!(
            "Collecting {} collectors x {} regions ({} pairs, {} in flight)",
            collectors.len(),
            region_count,
            total,
            self.concurrency
        );

        // Slot per pair, indexed collector-major so regrouping ignores completion order
        let mut outcomes: Vec<Option<Result<Collected, CollectError>>> =
            (0..total).map(|_| None).collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for index in 0..total {
            let permit = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                tracing::warn!("Run cancelled, {} pairs not started", total - index);
                break;
            };

            let collector = collectors[index / region_count].clone();
            let region = self.regions[index % region_count].clone();
            let ctx = ctx.clone();

            tasks.spawn(async move {
                let _permit = permit;
                (index, collect_pair(collector.as_ref(), &ctx, &region).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::error!("Collector task did not complete: {}", e),
            }
        }

        let cancelled = ctx.cancel.is_cancelled();
        let mut outcomes = outcomes.into_iter();
        let reports = collectors
            .iter()
            .map(|collector| {
                let pairs = outcomes.by_ref().take(region_count);
                merge(collector.as_ref(), &self.regions, pairs, cancelled)
            })
            .collect::<Vec<_>>();

        let report = RunReport {
            collectors: reports,
            cancelled,
        };

        tracing::info!(
            "Run finished in {:.1}s: {} resources, {} failed pairs, {} warnings{}",
            started.elapsed().as_secs_f64(),
            report.total_resources(),
            report.failures().count(),
            report.warnings().count(),
            if cancelled { " (cancelled)" } else { "" }
        );

        report
    }
}

/// Collect one pair, turning errors and panics into a [`CollectError`]
async fn collect_pair(
    collector: &dyn Collector,
    ctx: &RunContext,
    region: &str,
) -> Result<Collected, CollectError> {
    if ctx.is_cancelled() {
        return Err(CollectError::Cancelled);
    }

    let started = Instant::now();
    tracing::debug!("{} [{}]: collecting", collector.name(), region);

    let result = AssertUnwindSafe(collector.collect(ctx, region))
        .catch_unwind()
        .await;

    let outcome = match result {
        Ok(Ok(collected)) => Ok(collected),
        Ok(Err(e)) => Err(CollectError::classify(e)),
        Err(panic) => Err(CollectError::Panicked(panic_message(panic.as_ref()))),
    };

    match &outcome {
        Ok(collected) => tracing::debug!(
            "{} [{}]: {} resources, {} warnings in {}ms",
            collector.name(),
            region,
            collected.resources.len(),
            collected.warnings.len(),
            started.elapsed().as_millis()
        ),
        Err(e) => tracing::warn!("{} [{}]: {}", collector.name(), region, e),
    }

    outcome
}

/// Concatenate one collector's pairs in region order and apply its sort policy
fn merge(
    collector: &dyn Collector,
    regions: &[String],
    pairs: impl Iterator<Item = Option<Result<Collected, CollectError>>>,
    cancelled: bool,
) -> CollectorReport {
    let name = collector.name().to_string();
    let mut resources = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (region, outcome) in regions.iter().zip(pairs) {
        let outcome = outcome.unwrap_or_else(|| {
            Err(if cancelled {
                CollectError::Cancelled
            } else {
                CollectError::Panicked("task did not complete".to_string())
            })
        });

        match outcome {
            Ok(collected) => {
                resources.extend(collected.resources);
                warnings.extend(collected.warnings.into_iter().map(|message| PairWarning {
                    collector: name.clone(),
                    region: region.clone(),
                    message,
                }));
            }
            Err(error) => errors.push(PairError {
                collector: name.clone(),
                region: region.clone(),
                error,
            }),
        }
    }

    if collector.should_sort() {
        sort_resources(&mut resources);
    }

    CollectorReport {
        name,
        resources,
        errors,
        warnings,
    }
}

/// Sort by (category, sub categories, name), byte order. Stable.
pub fn sort_resources(resources: &mut [Resource]) {
    resources.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_resources_is_bytewise() {
        let mut resources = vec![
            Resource::new("compute", "b", "r1"),
            Resource::new("compute", "B", "r1"),
            Resource::new("compute", "a", "r2").sub1("x"),
            Resource::new("Compute", "z", "r1"),
        ];
        sort_resources(&mut resources);
        let order: Vec<(&str, &str)> = resources
            .iter()
            .map(|r| (r.category.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("Compute", "z"), ("compute", "B"), ("compute", "b"), ("compute", "a")]
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let orchestrator = Orchestrator::new(vec!["r1".to_string()]).with_concurrency(0);
        assert_eq!(orchestrator.concurrency, 1);
    }
}
