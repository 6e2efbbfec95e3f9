//! Collection error taxonomy
//!
//! Collectors propagate with `anyhow`; the orchestrator classifies whatever
//! comes back into a [`CollectError`] so failure summaries can say what kind
//! of failure each (collector, region) pair hit.

use thiserror::Error;

/// Why a (collector, region) pair produced no resources
#[derive(Debug, Error)]
pub enum CollectError {
    /// No API client is configured for the region
    #[error("no client configured for region '{region}'")]
    MissingClient { region: String },

    /// The run was cancelled before or while the pair was collecting
    #[error("collection cancelled")]
    Cancelled,

    /// The collector task panicked
    #[error("collector panicked: {0}")]
    Panicked(String),

    /// A primary enumeration call failed
    #[error("{0:#}")]
    Upstream(anyhow::Error),
}

impl CollectError {
    /// Classify an error returned by a collector.
    ///
    /// Typed errors raised with `anyhow::Error::new(CollectError::..)` keep
    /// their variant; anything else is an upstream API failure.
    pub fn classify(error: anyhow::Error) -> Self {
        match error.downcast::<CollectError>() {
            Ok(typed) => typed,
            Err(other) => {
                if other
                    .chain()
                    .any(|cause| matches!(cause.downcast_ref::<CollectError>(), Some(CollectError::Cancelled)))
                {
                    CollectError::Cancelled
                } else {
                    CollectError::Upstream(other)
                }
            }
        }
    }

    /// Short label for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::MissingClient { .. } => "configuration",
            CollectError::Cancelled => "cancelled",
            CollectError::Panicked(_) => "panic",
            CollectError::Upstream(_) => "upstream",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollectError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_typed_errors_keep_their_variant() {
        let err = anyhow::Error::new(CollectError::MissingClient {
            region: "asia-east1".to_string(),
        });
        let classified = CollectError::classify(err);
        assert_eq!(classified.kind(), "configuration");
        assert!(classified.to_string().contains("asia-east1"));
    }

    #[test]
    fn test_cancellation_is_found_under_context() {
        let err: anyhow::Result<()> = Err(CollectError::Cancelled.into());
        let err = err.context("Failed to list instances").unwrap_err();
        assert!(CollectError::classify(err).is_cancelled());
    }

    #[test]
    fn test_other_errors_are_upstream() {
        let err = anyhow::anyhow!("API request failed: 503 Service Unavailable");
        let classified = CollectError::classify(err);
        assert_eq!(classified.kind(), "upstream");
        assert!(classified.to_string().contains("503"));
    }
}
