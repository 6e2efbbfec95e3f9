//! CSV output
//!
//! One file per collector (header row from its columns, one row per
//! resource), plus `errors.csv` and `warnings.csv` when the run had any.

use crate::error::CollectError;
use crate::gcp::http::format_gcp_error;
use crate::orchestrator::{PairError, PairWarning, RunReport};
use crate::resource::{Collector, Column, Resource};
use anyhow::{Context, Result};
use csv::Writer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ERRORS_FILE: &str = "errors.csv";
pub const WARNINGS_FILE: &str = "warnings.csv";

/// Write `resources` as CSV using `columns`
pub fn write_resources<W: Write>(writer: W, columns: &[Column], resources: &[Resource]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    wtr.write_record(columns.iter().map(Column::header))?;
    for resource in resources {
        wtr.write_record(columns.iter().map(|c| c.value(resource)))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render `resources` to a CSV string
pub fn render(columns: &[Column], resources: &[Resource]) -> Result<String> {
    let mut buffer = Vec::new();
    write_resources(&mut buffer, columns, resources)?;
    String::from_utf8(buffer).context("CSV output is not valid UTF-8")
}

/// Message shown for a failed pair
pub fn error_message(error: &CollectError) -> String {
    match error {
        CollectError::Upstream(e) => format_gcp_error(e),
        other => other.to_string(),
    }
}

fn write_errors<W: Write>(writer: W, errors: &[&PairError]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["Collector", "Region", "Kind", "Message"])?;
    for e in errors {
        wtr.write_record([
            e.collector.as_str(),
            e.region.as_str(),
            e.error.kind(),
            error_message(&e.error).as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_warnings<W: Write>(writer: W, warnings: &[&PairWarning]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["Collector", "Region", "Message"])?;
    for w in warnings {
        wtr.write_record([w.collector.as_str(), w.region.as_str(), w.message.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// Write every collector's CSV, plus error and warning files, into `dir`.
///
/// Returns the paths written, in order.
pub fn write_run(dir: &Path, collectors: &[Arc<dyn Collector>], report: &RunReport) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = Vec::new();

    for collector in collectors {
        let Some(collected) = report.get(collector.name()) else {
            continue;
        };

        let path = dir.join(format!("{}.csv", collector.name()));
        write_resources(create(&path)?, &collector.columns(), &collected.resources)?;
        tracing::debug!("Wrote {} rows to {}", collected.resources.len(), path.display());
        written.push(path);
    }

    let errors: Vec<&PairError> = report.failures().collect();
    if !errors.is_empty() {
        let path = dir.join(ERRORS_FILE);
        write_errors(create(&path)?, &errors)?;
        written.push(path);
    }

    let warnings: Vec<&PairWarning> = report.warnings().collect();
    if !warnings.is_empty() {
        let path = dir.join(WARNINGS_FILE);
        write_warnings(create(&path)?, &warnings)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::CollectorReport;
    use crate::resource::{Collected, RunContext};

    struct Fixed;

    #[async_trait::async_trait]
    impl Collector for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn columns(&self) -> Vec<Column> {
            vec![Column::name(), Column::region(), Column::field("Size", "size")]
        }

        async fn collect(&self, _ctx: &RunContext, _region: &str) -> Result<Collected> {
            Ok(Collected::new())
        }
    }

    #[test]
    fn test_render_header_and_placeholder_name() {
        let resources = vec![
            Resource::new("disk", "", "us-east1").with("size", 10u32),
            Resource::new("disk", "data", "us-east1"),
        ];
        let csv = render(&Fixed.columns(), &resources).unwrap();
        assert_eq!(csv, "Name,Region,Size\n-,us-east1,10\ndata,us-east1,\n");
    }

    #[test]
    fn test_render_quotes_multiline_cells() {
        let resources = vec![Resource::new("vm", "a", "r").with("size", vec!["1", "2"])];
        let csv = render(&Fixed.columns(), &resources).unwrap();
        assert_eq!(csv, "Name,Region,Size\na,r,\"1\n2\"\n");
    }

    #[test]
    fn test_write_run_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = RunReport {
            collectors: vec![CollectorReport {
                name: "fixed".to_string(),
                resources: vec![Resource::new("disk", "d1", "r1")],
                errors: vec![PairError {
                    collector: "fixed".to_string(),
                    region: "r2".to_string(),
                    error: CollectError::MissingClient {
                        region: "r2".to_string(),
                    },
                }],
                warnings: vec![],
            }],
            cancelled: false,
        };
        let collectors: Vec<Arc<dyn Collector>> = vec![Arc::new(Fixed)];

        let written = write_run(dir.path(), &collectors, &report).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("fixed.csv"), dir.path().join(ERRORS_FILE)]
        );

        let errors = std::fs::read_to_string(dir.path().join(ERRORS_FILE)).unwrap();
        assert_eq!(
            errors,
            "Collector,Region,Kind,Message\nfixed,r2,configuration,no client configured for region 'r2'\n"
        );
        assert!(!dir.path().join(WARNINGS_FILE).exists());
    }
}
