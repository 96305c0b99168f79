//! Common types shared across the webscrape crates.
//!
//! This crate holds the failure taxonomy every stage reports into, the
//! workspace error type, and the centralised tracing setup. It stays
//! dependency-light so the driver, core and app crates can all depend on it.
//!
//! # Overview
//!
//! - [`ErrorKind`]: classification attached to every failed extraction
//! - [`observability`]: tracing/logging initialisation
//! - [`ScrapeError`] and [`Result`]: errors raised outside the extraction boundary
//!
//! # Examples
//!
//! ```rust
//! use webscrape_common::ErrorKind;
//!
//! assert_eq!(ErrorKind::SessionLaunchFailed.as_str(), "session_launch_failed");
//! assert!(ErrorKind::Timeout.is_retryable());
//! assert!(!ErrorKind::SessionLaunchFailed.is_retryable());
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// Which stage of an extraction failed.
///
/// Hosts branch on this to decide routing or retry policy; the core never
/// retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The browser-automation backend could not be started or reached.
    SessionLaunchFailed,
    /// The page could not be loaded.
    NavigationFailed,
    /// The backend rejected the selector query itself.
    ElementNotFound,
    /// A deadline elapsed before the stage completed.
    Timeout,
    /// Invalid configuration, or a backend error that fits no other kind.
    Unknown,
}

impl ErrorKind {
    /// Stable snake_case name, used for record attributes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SessionLaunchFailed => "session_launch_failed",
            ErrorKind::NavigationFailed => "navigation_failed",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a host could reasonably re-trigger after this failure.
    ///
    /// Launch failures point at the environment and invalid configuration will
    /// fail identically, so neither is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::NavigationFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised outside the extraction boundary (startup, configuration,
/// output). Extraction failures themselves are values, not errors.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing routed records failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Anything else surfaced by a collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;
