use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gcpinv::collectors::default_registry;
use gcpinv::config::Config;
use gcpinv::gcp::{auth, ClientSet, GcpClient, GcpNameSource};
use gcpinv::orchestrator::{Orchestrator, RunReport};
use gcpinv::output;
use gcpinv::resource::{NameResolver, RunContext};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Inventory GCP resources across regions into CSV reports
#[derive(Parser, Debug)]
#[command(name = "gcpinv", version = gcpinv::VERSION, about, long_about = None)]
struct Args {
    /// GCP project to inventory
    #[arg(short, long)]
    project: Option<String>,

    /// Regions to inventory (comma separated); the first also collects global services
    #[arg(short, long, value_delimiter = ',')]
    regions: Vec<String>,

    /// Collectors to run (comma separated, default: all)
    #[arg(short, long, value_delimiter = ',')]
    collectors: Vec<String>,

    /// Maximum (collector, region) pairs in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory the CSV files are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Cancel the run after this many seconds; partial results are still written
    #[arg(long)]
    timeout: Option<u64>,

    /// Exit with status 1 when any (collector, region) pair failed
    #[arg(long)]
    fail_on_error: bool,

    /// Print the available collectors and exit
    #[arg(long)]
    list_collectors: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

/// File logging under the config dir. `RUST_LOG`, when set, wins over `--log-level`.
fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match level.directive() {
            Some(directive) => EnvFilter::new(directive),
            None => return Ok(None),
        },
    };

    let log_path = get_log_path();
    let file = open_log_file(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcpinv {} started with log level: {:?}", gcpinv::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

/// Open `path` for appending, creating missing parent directories
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcpinv").join("gcpinv.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcpinv").join("gcpinv.log");
    }
    PathBuf::from("gcpinv.log")
}

/// Cancel `cancel` on Ctrl-C or after `timeout`
fn spawn_cancel_triggers(cancel: &CancellationToken, timeout: Option<Duration>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    eprintln!("Interrupted, finishing in-flight requests...");
                    tracing::warn!("Ctrl-C received, cancelling run");
                    token.cancel();
                }
            }
        }
    });

    if let Some(timeout) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    eprintln!("Timeout of {}s reached, cancelling run", timeout.as_secs());
                    tracing::warn!("Run timed out after {:?}", timeout);
                    token.cancel();
                }
            }
        });
    }
}

fn print_summary(report: &RunReport, written: &[PathBuf]) {
    for collector in &report.collectors {
        eprintln!(
            "{:<22} {:>6} resources {:>3} errors {:>3} warnings",
            collector.name,
            collector.resources.len(),
            collector.errors.len(),
            collector.warnings.len()
        );
    }

    for failure in report.failures() {
        eprintln!(
            "  error   {} [{}] ({}): {}",
            failure.collector,
            failure.region,
            failure.error.kind(),
            output::error_message(&failure.error)
        );
    }
    for warning in report.warnings() {
        eprintln!("  warning {} [{}]: {}", warning.collector, warning.region, warning.message);
    }

    if report.cancelled {
        eprintln!("Run was cancelled; results are partial");
    }
    eprintln!(
        "{} resources written to {} files",
        report.total_resources(),
        written.len()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let config = Config::load();

    if args.list_collectors {
        let registry = default_registry(&ClientSet::default());
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let project = config.effective_project(args.project.as_deref());
    if project.is_empty() {
        bail!("No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag");
    }
    if !auth::validate_project_id(&project) {
        bail!("Invalid project ID: {}", project);
    }

    let regions = config.effective_regions(&args.regions);
    if regions.is_empty() {
        bail!("No regions configured. Use --regions or set CLOUDSDK_COMPUTE_REGION");
    }
    if let Some(invalid) = regions.iter().find(|r| !auth::validate_region(r)) {
        bail!("Invalid region: {}", invalid);
    }

    tracing::info!("Using project: {}, regions: {}", project, regions.join(","));

    let client = GcpClient::new(&project, &regions[0]).await?;
    let clients = ClientSet::for_regions(&client, &regions);

    let registry = default_registry(&clients);
    let collectors = registry.select(&config.effective_collectors(&args.collectors))?;

    let names = Arc::new(NameResolver::new(Arc::new(GcpNameSource::new(clients.clone()))));
    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, args.timeout.map(Duration::from_secs));

    let orchestrator = Orchestrator::new(regions)
        .with_concurrency(config.effective_concurrency(args.concurrency));
    let report = orchestrator
        .run(&collectors, RunContext::new(cancel.clone(), names.clone()))
        .await;

    // Releases the Ctrl-C and timeout tasks
    cancel.cancel();

    tracing::debug!("Name lookups populated: {}", names.population_count());

    let output_dir = config.effective_output_dir(args.output_dir.as_deref());
    let written = output::write_run(&output_dir, &collectors, &report)?;

    print_summary(&report, &written);

    if args.fail_on_error && report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("gcpinv.log");

        open_log_file(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_reports_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = open_log_file(&blocker.join("sub").join("gcpinv.log")).unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.starts_with("Failed to create log directory"), "{}", message);
        assert!(message.contains("blocker"), "{}", message);
    }
}
