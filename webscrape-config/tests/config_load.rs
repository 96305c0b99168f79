use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use webscrape_common::observability::LogFormat;
use webscrape_config::ScrapeConfigLoader;
use webscrape_drivers::browser::BrowserFlavor;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r##"
version: "1"
max_concurrent_sessions: 3
logging:
  format: json
  emit_stderr: true
  filter: "webscrape=debug"
backend:
  headless: true
  launch_timeout_ms: 15000
  browser_args: ["--lang=en-GB"]
  browser: firefox
jobs:
  - id: blog-title
    enabled: true
    target_url: "http://blog.example.test"
    css_selector: "#masthead h1 > a"
    driver_locator: "${TEST_CHROMEDRIVER_PATH}"
    timeout_ms: 5000
  - id: disabled
    enabled: false
    target_url: "http://other.example.test"
    css_selector: "p"
    driver_locator: "http://localhost:9515"
"##;

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "webscrape.yaml", FILE_YAML);

    let settings = temp_env::with_var(
        "TEST_CHROMEDRIVER_PATH",
        Some("/usr/local/bin/chromedriver"),
        || ScrapeConfigLoader::new().with_file(&p).load(),
    )
    .expect("load settings");

    assert_eq!(settings.version.as_deref(), Some("1"));
    assert_eq!(settings.max_concurrent_sessions, 3);
    assert_eq!(settings.logging.format, LogFormat::Json);
    assert!(settings.logging.emit_stderr);
    assert_eq!(settings.backend.launch_timeout_ms, 15_000);
    assert_eq!(settings.backend.poll_interval_ms, 100);
    assert_eq!(settings.backend.browser, Some(BrowserFlavor::Firefox));

    let enabled: Vec<_> = settings.enabled_jobs().collect();
    assert_eq!(enabled.len(), 1);
    let job = enabled[0].to_extraction_config();
    assert_eq!(job.target_url, "http://blog.example.test");
    assert_eq!(job.css_selector, "#masthead h1 > a");
    assert_eq!(job.driver_locator, "/usr/local/bin/chromedriver");
    assert_eq!(job.timeout_ms, 5000);
    assert_eq!(job.navigation_timeout_ms, 30_000);
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "webscrape.yaml", FILE_YAML);

    let settings = temp_env::with_vars(
        [
            ("TEST_CHROMEDRIVER_PATH", Some("/opt/chromedriver")),
            ("WEBSCRAPE__MAX_CONCURRENT_SESSIONS", Some("7")),
            ("WEBSCRAPE__BACKEND__HEADLESS", Some("false")),
        ],
        || ScrapeConfigLoader::new().with_file(&p).load(),
    )
    .expect("load settings");

    assert_eq!(settings.max_concurrent_sessions, 7);
    assert!(!settings.backend.headless);
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = ScrapeConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");

    assert!(settings.jobs.is_empty());
    assert_eq!(settings.logging.format, LogFormat::Text);
    assert!(settings.backend.headless);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = ScrapeConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn environment_overrides_inline_yaml_regardless_of_order() {
    let settings = temp_env::with_vars(
        [
            ("WEBSCRAPE__LOGGING__FILTER", Some("webscrape=trace")),
            ("WEBSCRAPE__BACKEND__LAUNCH_TIMEOUT_MS", Some("2500")),
        ],
        || {
            ScrapeConfigLoader::new()
                .with_yaml_str("logging: { filter: info }\nbackend: { launch_timeout_ms: 9000 }")
                .with_yaml_str("max_concurrent_sessions: 4")
                .load()
        },
    )
    .expect("load settings");

    assert_eq!(settings.logging.filter, "webscrape=trace");
    assert_eq!(settings.backend.launch_timeout_ms, 2500);
    assert_eq!(settings.max_concurrent_sessions, 4);
}
