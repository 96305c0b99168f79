//! Deterministic in-memory browser backend for extraction tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use webscrape_core::ExtractionConfig;
use webscrape_drivers::{BrowserBackend, BrowserSession, SessionError};

/// How a scripted stage misbehaves.
#[derive(Debug, Clone)]
pub enum Fault {
    Fail(SessionError),
    Panic(&'static str),
    Hang,
}

impl Fault {
    async fn trigger<T>(&self) -> Result<T, SessionError> {
        match self {
            Fault::Fail(e) => Err(e.clone()),
            Fault::Panic(msg) => panic!("{msg}"),
            Fault::Hang => futures::future::pending().await,
        }
    }
}

/// Shared call counters, cloned into every session the backend opens.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    launches: Arc<AtomicUsize>,
    navigations: Arc<AtomicUsize>,
    lookups: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl Calls {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
    /// Every call to `close`, including repeats.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
    /// Closes that actually released something.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Scripted backend: a page is a map from selector to the texts of matching
/// elements in document order.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    pub calls: Calls,
    pub elements: HashMap<String, Vec<String>>,
    pub launch_fault: Option<Fault>,
    pub navigate_fault: Option<Fault>,
    pub find_fault: Option<Fault>,
    pub read_fault: Option<Fault>,
    pub close_fault: Option<Fault>,
}

impl StubBackend {
    pub fn with_element(mut self, selector: &str, text: &str) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    pub fn failing_launch(mut self, err: SessionError) -> Self {
        self.launch_fault = Some(Fault::Fail(err));
        self
    }

    pub fn launch_fault(mut self, fault: Fault) -> Self {
        self.launch_fault = Some(fault);
        self
    }

    pub fn navigate_fault(mut self, fault: Fault) -> Self {
        self.navigate_fault = Some(fault);
        self
    }

    pub fn find_fault(mut self, fault: Fault) -> Self {
        self.find_fault = Some(fault);
        self
    }

    pub fn read_fault(mut self, fault: Fault) -> Self {
        self.read_fault = Some(fault);
        self
    }

    pub fn close_error(mut self, err: SessionError) -> Self {
        self.close_fault = Some(Fault::Fail(err));
        self
    }

    pub fn close_fault(mut self, fault: Fault) -> Self {
        self.close_fault = Some(fault);
        self
    }
}

#[async_trait]
impl BrowserBackend for StubBackend {
    type Session = StubSession;

    async fn open(&self, _driver_locator: &str) -> Result<StubSession, SessionError> {
        self.calls.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = &self.launch_fault {
            return fault.trigger().await;
        }
        Ok(StubSession {
            script: self.clone(),
            open: true,
        })
    }
}

pub struct StubSession {
    script: StubBackend,
    open: bool,
}

impl StubSession {
    fn calls(&self) -> &Calls {
        &self.script.calls
    }
}

#[async_trait]
impl BrowserSession for StubSession {
    type Element = String;

    async fn navigate(&mut self, _url: &str) -> Result<(), SessionError> {
        self.calls().navigations.fetch_add(1, Ordering::SeqCst);
        match &self.script.navigate_fault {
            Some(fault) => fault.trigger().await,
            None => Ok(()),
        }
    }

    async fn find_element(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        self.calls().lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = &self.script.find_fault {
            return fault.trigger().await;
        }
        match self.script.elements.get(selector).and_then(|m| m.first()) {
            Some(text) => Ok(text.clone()),
            None => {
                tokio::time::sleep(timeout).await;
                Err(SessionError::timeout(format!(
                    "no element matched `{selector}` within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    async fn read_text(&mut self, element: &String) -> Result<String, SessionError> {
        self.calls().reads.fetch_add(1, Ordering::SeqCst);
        match &self.script.read_fault {
            Some(fault) => fault.trigger().await,
            None => Ok(element.clone()),
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.calls().close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.calls().releases.fetch_add(1, Ordering::SeqCst);
        match &self.script.close_fault {
            Some(fault) => fault.trigger().await,
            None => Ok(()),
        }
    }
}

pub fn example_config() -> ExtractionConfig {
    ExtractionConfig::new("http://example.test", "h1", "stub").with_timeout_ms(5000)
}
