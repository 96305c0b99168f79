use crate::browser::driver::DriverProcess;
use crate::session::{BrowserSession, SessionError};
use async_trait::async_trait;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::{elements::Element, Client, Locator};
use std::time::Duration;
use tracing::{debug, info};

/// One WebDriver session, plus the driver process if we spawned it.
pub struct WebDriverSession {
    client: Option<Client>,
    process: Option<DriverProcess>,
    poll_interval: Duration,
}

impl WebDriverSession {
    pub(crate) fn new(
        client: Client,
        process: Option<DriverProcess>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client: Some(client),
            process,
            poll_interval,
        }
    }

    fn client(&self) -> Result<&Client, SessionError> {
        self.client
            .as_ref()
            .ok_or_else(|| SessionError::unknown("session is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none() && self.process.is_none()
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = Element;

    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        debug!(target: "webscrape.driver", %url, "navigating");
        self.client()?
            .goto(url)
            .await
            .map_err(|e| SessionError::navigation(e.to_string()))
    }

    async fn find_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Element, SessionError> {
        let poll = self.poll_interval;
        self.client()?
            .wait()
            .at_most(timeout)
            .every(poll)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| classify_lookup_error(e, selector, timeout))
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, SessionError> {
        element
            .text()
            .await
            .map_err(|e| SessionError::unknown(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let mut outcome = Ok(());
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                outcome = Err(SessionError::unknown(e.to_string()));
            }
        }
        if let Some(process) = self.process.take() {
            process.shutdown().await;
        }
        info!(target: "webscrape.driver", "webdriver session closed");
        outcome
    }
}

/// Map a failed element wait onto the session taxonomy.
pub(crate) fn classify_lookup_error(
    err: CmdError,
    selector: &str,
    timeout: Duration,
) -> SessionError {
    match err {
        CmdError::WaitTimeout => SessionError::timeout(format!(
            "no element matched `{selector}` within {}ms",
            timeout.as_millis()
        )),
        CmdError::Standard(ref wd) if matches!(wd.error, ErrorStatus::InvalidSelector) => {
            SessionError::element_not_found(err.to_string())
        }
        other => SessionError::unknown(other.to_string()),
    }
}
