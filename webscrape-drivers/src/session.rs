use async_trait::async_trait;
use std::time::Duration;
use webscrape_common::ErrorKind;

/// A classified backend failure.
///
/// `Display` is the backend's message verbatim so it can be surfaced to hosts
/// unchanged; the [`ErrorKind`] is carried alongside for branching.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn launch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionLaunchFailed, message)
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NavigationFailed, message)
    }

    pub fn element_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ElementNotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }
}

/// Something that can start a controllable browser.
///
/// The driver locator is handed in per call; implementations must not read it
/// from process-wide state, so concurrent invocations stay independent.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    type Session: BrowserSession + 'static;

    /// Start a browser session. Any failure is `SessionLaunchFailed`.
    async fn open(&self, driver_locator: &str) -> Result<Self::Session, SessionError>;
}

/// A live handle to one browser, owned by exactly one extraction.
#[async_trait]
pub trait BrowserSession: Send {
    type Element: Send + Sync;

    /// Load `url`. Network, TLS and URL errors are `NavigationFailed`.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Poll for the first element matching `selector` until `timeout` elapses.
    ///
    /// Zero matches at the deadline is `Timeout`; a query the backend rejects
    /// outright (bad selector syntax) is `ElementNotFound`.
    async fn find_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Element, SessionError>;

    /// Rendered text of `element`. An empty string is a valid result.
    async fn read_text(&mut self, element: &Self::Element) -> Result<String, SessionError>;

    /// Release the browser. Must be idempotent.
    async fn close(&mut self) -> Result<(), SessionError>;
}
