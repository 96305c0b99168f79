//! Driver layer for browser automation.
//!
//! The extraction core only ever talks to the [`session`] traits, so tests can
//! swap in a deterministic stub while production runs a real WebDriver.
//!
//! - [`session::BrowserBackend`]: opens one session per extraction
//! - [`session::BrowserSession`]: navigate / find / read / close
//! - [`session::SessionError`]: classified failure carrying the backend's text
//! - [`browser::WebDriverBackend`]: `fantoccini` implementation that connects
//!   to a running WebDriver endpoint or spawns a local driver executable
pub mod session;
pub mod browser;

pub use session::{BrowserBackend, BrowserSession, SessionError};
pub use browser::{WebDriverBackend, WebDriverOptions, WebDriverSession};
