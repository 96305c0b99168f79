//! Single-value web extraction.
//!
//! An [`Extractor`] turns one [`ExtractionConfig`] into exactly one
//! [`ExtractionResult`]: it opens a browser session through a
//! [`BrowserBackend`](webscrape_drivers::BrowserBackend), navigates, reads the
//! first element matching a CSS selector and always closes the session
//! afterwards. Every failure is captured in the result, classified by the
//! stage that produced it; nothing escapes as an error or panic.
//!
//! Hosts that route records rather than results convert with
//! [`FlowRecord::from`], which yields the `success`/`failure` relationship and
//! the `webscraper.*` attributes.
//!
//! ```no_run
//! use webscrape_core::{ExtractionConfig, Extractor};
//! use webscrape_drivers::WebDriverBackend;
//!
//! # async fn run() {
//! let config = ExtractionConfig::new("https://example.com", "h1", "/usr/bin/chromedriver");
//! let result = Extractor::new(WebDriverBackend::default()).extract(&config).await;
//! println!("{}", serde_json::to_string(&result).unwrap());
//! # }
//! ```
pub mod config;
pub mod extract;
pub mod record;
pub mod result;

pub use config::{ConfigValidationError, ExtractionConfig};
pub use extract::Extractor;
pub use record::{FlowRecord, Relationship};
pub use result::ExtractionResult;
pub use webscrape_common::ErrorKind;
