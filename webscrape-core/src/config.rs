use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on the element lookup.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default deadline wrapped around session launch and page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_navigation_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

/// What to extract, from where, with which driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub target_url: String,
    pub css_selector: String,
    /// Path to a driver executable, or a WebDriver endpoint URL.
    pub driver_locator: String,
    /// How long to poll for the selector.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl ExtractionConfig {
    pub fn new(
        target_url: impl Into<String>,
        css_selector: impl Into<String>,
        driver_locator: impl Into<String>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            css_selector: css_selector.into(),
            driver_locator: driver_locator.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_navigation_timeout_ms(mut self, navigation_timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = navigation_timeout_ms;
        self
    }

    /// Checks the required fields; whitespace-only counts as empty.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let required = [
            ("target_url", &self.target_url),
            ("css_selector", &self.css_selector),
            ("driver_locator", &self.driver_locator),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(name));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}
