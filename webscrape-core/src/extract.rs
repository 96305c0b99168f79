use crate::config::ExtractionConfig;
use crate::record::FlowRecord;
use crate::result::ExtractionResult;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webscrape_common::ErrorKind;
use webscrape_drivers::{BrowserBackend, BrowserSession, SessionError};

pub(crate) const CANCELLED_MESSAGE: &str = "extraction cancelled";

/// Slack added on top of the selector timeout before the lookup is abandoned,
/// in case a backend overruns its own polling deadline.
const LOOKUP_GRACE: Duration = Duration::from_secs(1);

/// Upper bound on releasing a session.
const CLOSE_DEADLINE: Duration = Duration::from_secs(10);

/// Runs configurations through a browser backend, one fresh session each.
#[derive(Debug, Clone)]
pub struct Extractor<B> {
    backend: B,
}

impl<B: BrowserBackend> Extractor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Produce exactly one result for `config`. Never panics.
    pub async fn extract(&self, config: &ExtractionConfig) -> ExtractionResult {
        self.extract_with_cancel(config, &CancellationToken::new())
            .await
    }

    /// [`extract`](Self::extract), routed straight into a [`FlowRecord`].
    pub async fn extract_record(&self, config: &ExtractionConfig) -> FlowRecord {
        FlowRecord::from(self.extract(config).await)
    }

    /// Like [`extract`](Self::extract), but abandons the in-flight stage and
    /// force-closes the session once `cancel` fires.
    pub async fn extract_with_cancel(
        &self,
        config: &ExtractionConfig,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        let url = config.target_url.as_str();

        if let Err(e) = config.validate() {
            warn!(target: "webscrape.extract", %url, error = %e, "rejecting invalid configuration");
            return ExtractionResult::failure(
                url,
                ErrorKind::Unknown,
                format!("invalid configuration: {e}"),
            );
        }
        if cancel.is_cancelled() {
            return ExtractionResult::failure(url, ErrorKind::Unknown, CANCELLED_MESSAGE);
        }

        info!(
            target: "webscrape.extract",
            %url,
            selector = %config.css_selector,
            timeout_ms = config.timeout_ms,
            "starting extraction"
        );

        let launch_deadline = config.navigation_timeout();
        let launch = AssertUnwindSafe(self.backend.open(&config.driver_locator)).catch_unwind();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SessionError::unknown(CANCELLED_MESSAGE)),
            res = timeout(launch_deadline, launch) => match res {
                Ok(Ok(opened)) => opened,
                Ok(Err(panic)) => Err(panicked(panic)),
                Err(_) => Err(SessionError::timeout(format!(
                    "session launch timed out after {}ms",
                    launch_deadline.as_millis()
                ))),
            }
        };
        let session = match opened {
            Ok(session) => session,
            Err(e) => return finish(url, Err(e)),
        };

        let mut guard = SessionGuard::new(session);
        let outcome = match guard.session_mut() {
            Some(session) => {
                let stages = AssertUnwindSafe(run_stages(session, config)).catch_unwind();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(SessionError::unknown(CANCELLED_MESSAGE)),
                    res = stages => res.unwrap_or_else(|panic| Err(panicked(panic))),
                }
            }
            None => Err(SessionError::unknown("session released before use")),
        };
        guard.release().await;

        finish(url, outcome)
    }
}

/// Navigate, look up and read; the caller owns closing.
async fn run_stages<S: BrowserSession>(
    session: &mut S,
    config: &ExtractionConfig,
) -> Result<String, SessionError> {
    let nav_deadline = config.navigation_timeout();
    timeout(nav_deadline, session.navigate(&config.target_url))
        .await
        .unwrap_or_else(|_| {
            Err(SessionError::timeout(format!(
                "navigation timed out after {}ms",
                nav_deadline.as_millis()
            )))
        })?;
    debug!(target: "webscrape.extract", url = %config.target_url, "page loaded");

    let lookup = config.timeout();
    let element = timeout(
        lookup + LOOKUP_GRACE,
        session.find_element(&config.css_selector, lookup),
    )
    .await
    .unwrap_or_else(|_| {
        Err(SessionError::timeout(format!(
            "no element matched `{}` within {}ms",
            config.css_selector,
            lookup.as_millis()
        )))
    })?;

    session.read_text(&element).await
}

fn finish(url: &str, outcome: Result<String, SessionError>) -> ExtractionResult {
    match outcome {
        Ok(text) => {
            info!(target: "webscrape.extract", %url, chars = text.chars().count(), "extraction succeeded");
            ExtractionResult::success(url, text)
        }
        Err(e) => {
            warn!(target: "webscrape.extract", %url, kind = %e.kind, error = %e.message, "extraction failed");
            ExtractionResult::from_session_error(url, e)
        }
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> SessionError {
    SessionError::unknown(format!(
        "extraction panicked: {}",
        panic_message(payload.as_ref())
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owns an open session and makes sure it is closed exactly once.
///
/// The normal path is [`release`](Self::release). If the guard is dropped
/// first (the whole extraction future was dropped by its caller), the close is
/// handed to the current tokio runtime instead.
struct SessionGuard<S: BrowserSession + 'static> {
    session: Option<S>,
}

impl<S: BrowserSession + 'static> SessionGuard<S> {
    fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session_mut(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            close_session(&mut session).await;
        }
    }
}

impl<S: BrowserSession + 'static> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        warn!(target: "webscrape.extract", "extraction dropped mid-flight; closing session in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    close_session(&mut session).await;
                });
            }
            Err(_) => {
                warn!(target: "webscrape.extract", "no runtime available; session dropped without close")
            }
        }
    }
}

/// Close within [`CLOSE_DEADLINE`]. Errors and panics from the backend are
/// logged; the result has already been decided.
async fn close_session<S: BrowserSession>(session: &mut S) {
    let closing = AssertUnwindSafe(session.close()).catch_unwind();
    match timeout(CLOSE_DEADLINE, closing).await {
        Ok(Ok(Ok(()))) => debug!(target: "webscrape.extract", "session closed"),
        Ok(Ok(Err(e))) => {
            warn!(target: "webscrape.extract", error = %e, "session close reported an error")
        }
        Ok(Err(panic)) => warn!(
            target: "webscrape.extract",
            panic = %panic_message(panic.as_ref()),
            "session close panicked"
        ),
        Err(_) => warn!(
            target: "webscrape.extract",
            deadline_ms = CLOSE_DEADLINE.as_millis() as u64,
            "session close timed out; dropping handle"
        ),
    }
}
