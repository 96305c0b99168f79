//! Exercises [`WebDriverBackend`] against real processes.
//!
//! The launch-failure tests need nothing installed. The smoke test is
//! `#[ignore]` because it requires `WEBSCRAPE_DRIVER` to point at a
//! chromedriver/geckodriver binary or a running WebDriver endpoint, plus
//! network access to `WEBSCRAPE_SMOKE_URL` (default `https://example.com`).

use std::time::Duration;

use anyhow::{Context, Result};
use webscrape_common::ErrorKind;
use webscrape_drivers::{BrowserBackend, BrowserSession, WebDriverBackend, WebDriverOptions};

fn quick_backend() -> WebDriverBackend {
    WebDriverBackend::new(WebDriverOptions {
        launch_timeout: Duration::from_secs(2),
        ..WebDriverOptions::default()
    })
}

#[tokio::test]
async fn missing_executable_fails_to_launch() {
    let err = match quick_backend()
        .open("/definitely/not/here/chromedriver")
        .await
    {
        Ok(_) => panic!("a missing binary must not produce a session"),
        Err(e) => e,
    };
    assert_eq!(err.kind, ErrorKind::SessionLaunchFailed);
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_fails_to_launch() {
    let err = match quick_backend().open("http://127.0.0.1:1").await {
        Ok(_) => panic!("nothing listens on port 1"),
        Err(e) => e,
    };
    assert_eq!(err.kind, ErrorKind::SessionLaunchFailed);
}

#[tokio::test]
#[ignore]
async fn reads_heading_from_live_page() -> Result<()> {
    let locator = std::env::var("WEBSCRAPE_DRIVER")
        .context("WEBSCRAPE_DRIVER must point at a driver binary or endpoint")?;
    let url = std::env::var("WEBSCRAPE_SMOKE_URL")
        .unwrap_or_else(|_| "https://example.com".to_string());

    let backend = WebDriverBackend::default();
    let mut session = backend.open(&locator).await?;
    session.navigate(&url).await?;
    let element = session.find_element("h1", Duration::from_secs(10)).await?;
    let text = session.read_text(&element).await?;
    assert!(!text.trim().is_empty());

    let missing = session
        .find_element("#no-such-element-anywhere", Duration::from_millis(500))
        .await;
    assert_eq!(missing.err().map(|e| e.kind), Some(ErrorKind::Timeout));

    let bad = session
        .find_element("h1[[[", Duration::from_millis(500))
        .await;
    assert_eq!(bad.err().map(|e| e.kind), Some(ErrorKind::ElementNotFound));

    session.close().await?;
    session.close().await?;
    assert!(session.is_closed());
    Ok(())
}
