//! Name Resolution
//!
//! Turns opaque identifiers (self links, numeric ids, project numbers) into
//! display names. Each (kind, scope) mapping is built by one bulk list call
//! the first time anyone asks for it and then shared by every collector for
//! the rest of the run.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;

/// Scope key used for kinds that are not regional
const GLOBAL_SCOPE: &str = "global";

/// Identifier families the resolver knows how to enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// VPC networks, keyed by self link and numeric id
    Network,
    /// Subnetworks of one region, keyed by self link and numeric id
    Subnetwork,
    /// Projects, keyed by project number
    Project,
}

impl NameKind {
    pub fn is_global(self) -> bool {
        matches!(self, NameKind::Network | NameKind::Project)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NameKind::Network => "network",
            NameKind::Subnetwork => "subnetwork",
            NameKind::Project => "project",
        }
    }
}

/// Bulk enumeration backing the resolver
#[async_trait::async_trait]
pub trait NameSource: Send + Sync {
    /// Every id -> name pair of `kind` visible in `region`
    async fn list_names(
        &self,
        kind: NameKind,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, String>>;
}

/// Source that knows no names; every lookup falls back to the identifier
pub struct NoNames;

#[async_trait::async_trait]
impl NameSource for NoNames {
    async fn list_names(
        &self,
        _kind: NameKind,
        _region: &str,
        _cancel: &CancellationToken,
    ) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

type NameMap = Arc<HashMap<String, String>>;

/// Per-run, concurrency-safe id -> name cache
pub struct NameResolver {
    source: Arc<dyn NameSource>,
    cache: Mutex<HashMap<(NameKind, String), Arc<OnceCell<NameMap>>>>,
    populations: AtomicUsize,
}

impl NameResolver {
    pub fn new(source: Arc<dyn NameSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
            populations: AtomicUsize::new(0),
        }
    }

    /// Resolver that never calls out
    pub fn empty() -> Self {
        Self::new(Arc::new(NoNames))
    }

    fn scope(kind: NameKind, region: &str) -> String {
        if kind.is_global() {
            GLOBAL_SCOPE.to_string()
        } else {
            region.to_string()
        }
    }

    /// Full mapping for `kind` in `region`, populated at most once per run.
    ///
    /// Concurrent callers on a cold entry wait for the single population call.
    /// A failed population is cached as an empty mapping.
    pub async fn get_all(&self, cancel: &CancellationToken, kind: NameKind, region: &str) -> NameMap {
        let scope = Self::scope(kind, region);
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry((kind, scope.clone())).or_default().clone()
        };

        let source = &self.source;
        let populations = &self.populations;
        let scope = scope.as_str();
        cell.get_or_init(|| async move {
            populations.fetch_add(1, Ordering::SeqCst);
            match source.list_names(kind, region, cancel).await {
                Ok(names) => {
                    tracing::debug!(
                        "Cached {} {} names for scope {}",
                        names.len(),
                        kind.as_str(),
                        scope
                    );
                    Arc::new(names)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to list {} names in {}: {:#}; ids will be shown as-is",
                        kind.as_str(),
                        scope,
                        e
                    );
                    Arc::new(HashMap::new())
                }
            }
        })
        .await
        .clone()
    }

    /// Display name for `id`, or `id` itself when no name is known
    pub async fn resolve_name(
        &self,
        cancel: &CancellationToken,
        kind: NameKind,
        region: &str,
        id: &str,
    ) -> String {
        if id.is_empty() {
            return String::new();
        }

        self.get_all(cancel, kind, region)
            .await
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Number of bulk population calls started so far
    pub fn population_count(&self) -> usize {
        self.populations.load(Ordering::SeqCst)
    }
}
