use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use webscrape_common::ScrapeError;
use webscrape_common::observability::{LogFormat, init_logging};
use webscrape_config::{ScrapeConfigLoader, ScrapeSettings};
use webscrape_core::config::DEFAULT_TIMEOUT_MS;
use webscrape_core::{ExtractionConfig, Extractor};
use webscrape_drivers::WebDriverBackend;

use runner::{Job, emit, exit_status, jobs_from_settings, run_round};
mod runner;

/// Extract a single text value from a web page by CSS selector.
#[derive(Parser, Debug)]
#[command(name = "webscrape", version)]
struct Cli {
    /// YAML/TOML/JSON settings file listing jobs.
    #[arg(short, long, env = "WEBSCRAPE_CONFIG", conflicts_with = "url")]
    config: Option<PathBuf>,

    /// Page to load (single-job mode).
    #[arg(long)]
    url: Option<String>,

    /// CSS selector of the element to read.
    #[arg(long, default_value = "")]
    selector: String,

    /// Driver executable path or WebDriver endpoint URL.
    #[arg(long, env = "WEBSCRAPE_DRIVER", default_value = "")]
    driver: String,

    /// How long to wait for the selector to match, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Re-run all jobs every N seconds until interrupted.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Log encoding (text or json); overrides the settings file.
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Mirror debug logs to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{e:#}"), "webscrape aborted");
            eprintln!("webscrape: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    // 1) Settings (env wins over file)
    let settings: ScrapeSettings = match &cli.config {
        Some(path) => ScrapeConfigLoader::new().with_file(path).load(),
        None => ScrapeConfigLoader::new().load(),
    }
    .context("failed to load settings")?;

    // 2) Logging, with CLI overrides on top of the settings file
    let mut log_config = settings.logging.to_log_config();
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    if cli.verbose {
        log_config.emit_stderr = true;
        log_config.default_filter = "debug".to_string();
    }
    let log_path = init_logging(log_config)?;
    info!(log = %log_path.display(), "webscrape starting");

    let jobs = resolve_jobs(&cli, &settings)?;

    let mut options = settings.backend.to_webdriver_options();
    if cli.headed {
        options.headless = false;
    }
    let extractor = Extractor::new(WebDriverBackend::new(options));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling extractions");
            on_interrupt.cancel();
        }
    });

    let status = loop {
        let records = run_round(
            &extractor,
            &jobs,
            settings.max_concurrent_sessions,
            &cancel,
        )
        .await;

        let mut stdout = std::io::stdout().lock();
        for (job, record) in &records {
            emit(&mut stdout, job, record)?;
        }
        drop(stdout);
        let status = exit_status(&records);

        let Some(secs) = cli.interval_secs else {
            break status;
        };
        tokio::select! {
            _ = cancel.cancelled() => break status,
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
        }
    };

    Ok(status)
}

/// Jobs come from the settings file, or from flags when `--url` is given.
fn resolve_jobs(cli: &Cli, settings: &ScrapeSettings) -> webscrape_common::Result<Vec<Job>> {
    match &cli.url {
        Some(url) => Ok(vec![Job {
            id: "cli".to_string(),
            config: ExtractionConfig::new(url, &cli.selector, &cli.driver)
                .with_timeout_ms(cli.timeout_ms),
        }]),
        None if cli.config.is_some() => jobs_from_settings(settings),
        None => Err(ScrapeError::Config(
            "either --config or --url/--selector/--driver is required".into(),
        )),
    }
}
