use crate::browser::{
    capabilities::{build_capabilities, BrowserFlavor},
    page::WebDriverSession,
};
use crate::session::{BrowserBackend, SessionError};
use async_trait::async_trait;
use fantoccini::ClientBuilder;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

const READINESS_POLL: Duration = Duration::from_millis(50);
const SPAWN_ATTEMPTS: usize = 3;

static SPAWN_LOCK: Mutex<()> = Mutex::const_new(());

/// Where the WebDriver service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverLocator {
    /// An already-running endpoint such as `http://localhost:9515`.
    Remote(Url),
    /// A driver executable (chromedriver, geckodriver) to spawn per session.
    Executable(PathBuf),
}

impl DriverLocator {
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SessionError::launch("driver locator is empty"));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).map_err(|e| SessionError::launch(e.to_string()))?;
            return Ok(DriverLocator::Remote(url));
        }
        Ok(DriverLocator::Executable(expand_home(raw)))
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Tunables for sessions opened by [`WebDriverBackend`].
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// Run the browser without a visible window.
    pub headless: bool,
    /// How long a spawned driver has to start accepting connections.
    pub launch_timeout: Duration,
    /// Interval between element lookups while waiting for a selector.
    pub poll_interval: Duration,
    /// Extra arguments appended to the browser command line.
    pub browser_args: Vec<String>,
    /// Browser behind the driver; guessed from the locator when unset.
    pub browser: Option<BrowserFlavor>,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            headless: true,
            launch_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(100),
            browser_args: Vec::new(),
            browser: None,
        }
    }
}

impl WebDriverOptions {
    pub fn flavor_for(&self, driver_locator: &str) -> BrowserFlavor {
        self.browser
            .unwrap_or_else(|| BrowserFlavor::detect(driver_locator))
    }
}

/// Opens `fantoccini` sessions, spawning the driver executable when the
/// locator is a path.
#[derive(Debug, Clone, Default)]
pub struct WebDriverBackend {
    options: WebDriverOptions,
}

impl WebDriverBackend {
    pub fn new(options: WebDriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WebDriverOptions {
        &self.options
    }
}

#[async_trait]
impl BrowserBackend for WebDriverBackend {
    type Session = WebDriverSession;

    async fn open(&self, driver_locator: &str) -> Result<WebDriverSession, SessionError> {
        let flavor = self.options.flavor_for(driver_locator);
        let caps = build_capabilities(flavor, &self.options);

        let (endpoint, process) = match DriverLocator::parse(driver_locator)? {
            DriverLocator::Remote(url) => (url.to_string(), None),
            DriverLocator::Executable(path) => {
                let process = DriverProcess::spawn(&path, self.options.launch_timeout).await?;
                (process.endpoint(), Some(process))
            }
        };

        debug!(target: "webscrape.driver", %endpoint, ?flavor, "connecting to webdriver");
        // A failed connect drops `process`, which kills the spawned driver.
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&endpoint)
            .await
            .map_err(|e| SessionError::launch(e.to_string()))?;

        info!(target: "webscrape.driver", %endpoint, "webdriver session started");
        Ok(WebDriverSession::new(
            client,
            process,
            self.options.poll_interval,
        ))
    }
}

/// A driver executable started for one session.
#[derive(Debug)]
pub(crate) struct DriverProcess {
    child: Child,
    port: u16,
}

/// Why one spawn attempt did not produce a ready driver.
enum SpawnFailure {
    /// The driver exited before listening; usually its port was taken
    /// between probing and binding, so another port is worth a try.
    Exited(SessionError),
    Fatal(SessionError),
}

impl DriverProcess {
    async fn spawn(path: &Path, launch_timeout: Duration) -> Result<Self, SessionError> {
        // Probing and binding a port is not atomic; serialize it within the
        // process so concurrent sessions never pick the same one.
        let _reserve = SPAWN_LOCK.lock().await;
        let deadline = Instant::now() + launch_timeout;

        let mut attempt = 1;
        loop {
            match Self::try_spawn(path, deadline, launch_timeout).await {
                Ok(process) => return Ok(process),
                Err(SpawnFailure::Exited(e)) if attempt < SPAWN_ATTEMPTS => {
                    warn!(
                        target: "webscrape.driver",
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "driver exited during startup; retrying on a fresh port"
                    );
                    attempt += 1;
                }
                Err(SpawnFailure::Exited(e) | SpawnFailure::Fatal(e)) => return Err(e),
            }
        }
    }

    async fn try_spawn(
        path: &Path,
        deadline: Instant,
        launch_timeout: Duration,
    ) -> Result<Self, SpawnFailure> {
        let port = free_local_port().map_err(SpawnFailure::Fatal)?;
        debug!(
            target: "webscrape.driver",
            path = %path.display(),
            port,
            "spawning driver executable"
        );

        let mut child = Command::new(path)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpawnFailure::Fatal(SessionError::launch(e.to_string())))?;

        loop {
            // Check our own child first: a connection could also reach some
            // other listener that won the port.
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(SpawnFailure::Exited(SessionError::launch(format!(
                        "driver exited with {status} before accepting connections"
                    ))));
                }
                Ok(None) => {}
                Err(e) => return Err(SpawnFailure::Fatal(SessionError::launch(e.to_string()))),
            }
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return Ok(Self { child, port });
            }
            if Instant::now() >= deadline {
                return Err(SpawnFailure::Fatal(SessionError::launch(format!(
                    "driver did not accept connections on port {port} within {}ms",
                    launch_timeout.as_millis()
                ))));
            }
            sleep(READINESS_POLL).await;
        }
    }

    fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Kill the process and reap it.
    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(target: "webscrape.driver", error = %e, "failed to stop driver process");
        }
    }
}

fn free_local_port() -> Result<u16, SessionError> {
    let listener =
        TcpListener::bind(("127.0.0.1", 0)).map_err(|e| SessionError::launch(e.to_string()))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| SessionError::launch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webscrape_common::ErrorKind;

    #[test]
    fn http_locators_are_remote() {
        let loc = DriverLocator::parse("http://localhost:9515").unwrap();
        assert_eq!(
            loc,
            DriverLocator::Remote(Url::parse("http://localhost:9515").unwrap())
        );
    }

    #[test]
    fn paths_are_executables() {
        let loc = DriverLocator::parse(" /opt/drivers/chromedriver ").unwrap();
        assert_eq!(
            loc,
            DriverLocator::Executable(PathBuf::from("/opt/drivers/chromedriver"))
        );
    }

    #[test]
    fn blank_locator_is_a_launch_failure() {
        let err = DriverLocator::parse("   ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionLaunchFailed);
    }

    #[test]
    fn free_port_is_nonzero() {
        assert_ne!(free_local_port().unwrap(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_retried_on_fresh_ports() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let attempts = tmp.path().join("attempts");
        let script = tmp.path().join("fake-driver");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$1\" >> '{}'\nexit 3\n", attempts.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = DriverProcess::spawn(&script, Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SessionLaunchFailed);
        assert!(err.message.contains("before accepting connections"));
        let log = std::fs::read_to_string(&attempts).unwrap();
        let ports: Vec<&str> = log.lines().collect();
        assert_eq!(ports.len(), SPAWN_ATTEMPTS);
        assert!(ports.iter().all(|p| p.starts_with("--port=")));
    }

    #[tokio::test]
    async fn missing_executable_fails_without_waiting() {
        let started = std::time::Instant::now();
        let err = DriverProcess::spawn(
            Path::new("/definitely/not/here/chromedriver"),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionLaunchFailed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
