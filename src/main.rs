//! Command-line front end: load a manifest, run one batch, exit.

use clap::Parser;
use patch_dl::{BatchReport, CONSOLE_TARGET, Catalog, Collaborators, Config, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Exit status after SIGINT/SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "patch-dl", version, about = "Download, decode and store a patch set")]
struct Cli {
    /// JSON manifest listing the files to fetch
    manifest: PathBuf,

    /// TOML config file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root of the local destination tree
    #[arg(short = 'o', long, value_name = "DIR")]
    download_path: Option<PathBuf>,

    /// Run each stage on its own worker pool
    #[arg(long)]
    thread_usage: bool,

    /// Download workers (with --thread-usage)
    #[arg(long, value_name = "N")]
    parallel_download: Option<usize>,

    /// Decode workers (with --thread-usage)
    #[arg(long, value_name = "N")]
    parallel_decode: Option<usize>,

    /// Store workers (with --thread-usage)
    #[arg(long, value_name = "N")]
    parallel_store: Option<usize>,

    /// Print `<path>: OK` per file instead of progress percentages
    #[arg(long)]
    compact_logging: bool,

    /// Skip the length check
    #[arg(long)]
    no_check_file_size: bool,

    /// Skip the hash check
    #[arg(long)]
    no_check_hash_sum: bool,

    /// Process only these catalog keys (repeatable)
    #[arg(long = "only-key", value_name = "KEY")]
    only_keys: Vec<String>,

    /// Process only paths matching this regex (repeatable)
    #[arg(long = "include", value_name = "REGEX")]
    include_patterns: Vec<String>,

    /// Skip paths matching this regex (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    exclude_patterns: Vec<String>,
}

impl Cli {
    /// Layer the flags over a loaded config
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.download_path {
            config.download_path = path.clone();
        }
        if self.thread_usage {
            config.concurrency.thread_usage = true;
        }
        if let Some(n) = self.parallel_download {
            config.concurrency.parallel_download = n;
        }
        if let Some(n) = self.parallel_decode {
            config.concurrency.parallel_decode = n;
        }
        if let Some(n) = self.parallel_store {
            config.concurrency.parallel_store = n;
        }
        if self.compact_logging {
            config.compact_logging = true;
        }
        if self.no_check_file_size {
            config.verification.check_file_size = false;
        }
        if self.no_check_hash_sum {
            config.verification.check_hash_sum = false;
        }
        config.filter.only_keys.extend(self.only_keys.iter().cloned());
        config
            .filter
            .include_patterns
            .extend(self.include_patterns.iter().cloned());
        config
            .filter
            .exclude_patterns
            .extend(self.exclude_patterns.iter().cloned());
    }
}

/// Console lines go to stdout bare; diagnostics go to stderr under RUST_LOG
fn init_tracing() {
    let console = fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(CONSOLE_TARGET, tracing::Level::INFO));

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Ok(directive) = format!("{CONSOLE_TARGET}=off").parse() {
        filter = filter.add_directive(directive);
    }
    let diagnostics = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console)
        .with(diagnostics)
        .try_init()
        .ok();
}

async fn run(cli: Cli) -> patch_dl::Result<Option<BatchReport>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    cli.apply(&mut config);

    let catalog = Catalog::from_manifest_file(&cli.manifest).await?;
    let pipeline = Pipeline::new(config, Collaborators::standard())?;

    patch_dl::run_with_shutdown(pipeline, catalog).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(Some(report)) if report.is_success() => ExitCode::SUCCESS,
        Ok(Some(report)) => {
            tracing::warn!(
                stored = report.stored,
                failed = report.failed,
                "batch finished with failures"
            );
            ExitCode::FAILURE
        }
        Ok(None) => {
            tracing::warn!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            tracing::error!(error = %e, "patch-dl failed");
            ExitCode::FAILURE
        }
    }
}
