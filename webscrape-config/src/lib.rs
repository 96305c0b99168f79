//! Loader for `webscrape.yaml` with environment overlays.
//!
//! Sources are merged in the order they are added, then
//! `WEBSCRAPE__`-prefixed environment variables win (`__` separates nested
//! keys, e.g. `WEBSCRAPE__BACKEND__HEADLESS=false`). After merging, every
//! string value has `${VAR}` placeholders expanded, recursively, so secrets
//! and machine-specific driver paths can stay out of the file.
//!
//! ```yaml
//! version: "1"
//! max_concurrent_sessions: 2
//! logging: { format: json, emit_stderr: true, filter: "webscrape=debug" }
//! backend: { headless: true, launch_timeout_ms: 20000 }
//! jobs:
//!   - id: blog-title
//!     target_url: "https://blog.example"
//!     css_selector: "h1 > a"
//!     driver_locator: "${CHROMEDRIVER}"
//!     timeout_ms: 5000
//! ```
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use webscrape_common::observability::{LogConfig, LogFormat};
use webscrape_core::ExtractionConfig;
use webscrape_drivers::WebDriverOptions;
use webscrape_drivers::browser::BrowserFlavor;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct ScrapeSettings {
    pub version: Option<String>,
    /// Cap on browser sessions open at the same time.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: default_log_filter(),
            dir: None,
        }
    }
}

impl LoggingSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub browser_args: Vec<String>,
    /// `chrome` or `firefox`; needed for remote endpoints whose URL does not
    /// name the browser.
    #[serde(default)]
    pub browser: Option<BrowserFlavor>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            headless: true,
            launch_timeout_ms: default_launch_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            browser_args: Vec::new(),
            browser: None,
        }
    }
}

impl BackendSettings {
    pub fn to_webdriver_options(&self) -> WebDriverOptions {
        WebDriverOptions {
            headless: self.headless,
            launch_timeout: Duration::from_millis(self.launch_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            browser_args: self.browser_args.clone(),
            browser: self.browser,
        }
    }
}

/// One extraction to run; the extraction fields sit inline next to `id`.
#[derive(Debug, Deserialize)]
pub struct JobSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extraction: ExtractionConfig,
}

impl JobSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn to_extraction_config(&self) -> ExtractionConfig {
        self.extraction.clone()
    }
}

impl ScrapeSettings {
    pub fn enabled_jobs(&self) -> impl Iterator<Item = &JobSpec> {
        self.jobs.iter().filter(|job| job.is_enabled())
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_sessions == 0 {
            return Err(ConfigError::Message(
                "max_concurrent_sessions must be at least 1".into(),
            ));
        }
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.id.as_str()) {
                return Err(ConfigError::Message(format!("duplicate job id: {}", job.id)));
            }
        }
        Ok(())
    }
}

fn default_max_concurrent_sessions() -> usize {
    2
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}
fn default_launch_timeout_ms() -> u64 {
    20_000
}
fn default_poll_interval_ms() -> u64 {
    100
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (files + env overrides).
pub struct ScrapeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ScrapeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeConfigLoader {
    /// Start with no file sources; the `WEBSCRAPE__` environment overlay is
    /// applied last, in [`load`](Self::load), so it wins over every file.
    ///
    /// ```
    /// use webscrape_config::ScrapeConfigLoader;
    ///
    /// let settings = ScrapeConfigLoader::new()
    ///     .with_yaml_str("version: '1'\njobs: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.version.as_deref(), Some("1"));
    /// assert_eq!(settings.max_concurrent_sessions, 2);
    /// assert!(settings.jobs.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, for deployments configured purely
    /// through the environment.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use webscrape_config::ScrapeConfigLoader;
    ///
    /// let settings = ScrapeConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// jobs:
    ///   - id: "title"
    ///     target_url: "http://example.test"
    ///     css_selector: "h1"
    ///     driver_locator: "http://localhost:9515"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let job = &settings.jobs[0];
    /// assert_eq!(job.id, "title");
    /// assert!(job.is_enabled());
    /// assert_eq!(job.extraction.timeout_ms, 10_000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge the sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use webscrape_config::ScrapeConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_CHROMEDRIVER", "/opt/chromedriver"); }
    ///
    /// let settings = ScrapeConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// jobs:
    ///   - id: "title"
    ///     target_url: "http://example.test"
    ///     css_selector: "h1"
    ///     driver_locator: "${DOC_CHROMEDRIVER}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(settings.jobs[0].extraction.driver_locator, "/opt/chromedriver");
    ///
    /// unsafe { std::env::remove_var("DOC_CHROMEDRIVER"); }
    /// ```
    pub fn load(self) -> Result<ScrapeSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("WEBSCRAPE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ScrapeSettings =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.check()?;

        Ok(typed)
    }
}
