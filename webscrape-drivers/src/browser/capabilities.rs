use serde::Deserialize;
use serde_json::json;
use webdriver::capabilities::Capabilities;

use super::driver::WebDriverOptions;

/// Which browser the driver endpoint controls; decides the options key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFlavor {
    Chrome,
    Firefox,
}

impl BrowserFlavor {
    /// Guess the flavour from a locator: anything mentioning gecko or firefox
    /// is Firefox, everything else is treated as Chromedriver.
    pub fn detect(locator: &str) -> Self {
        let lower = locator.to_ascii_lowercase();
        if lower.contains("gecko") || lower.contains("firefox") {
            BrowserFlavor::Firefox
        } else {
            BrowserFlavor::Chrome
        }
    }

    fn options_key(&self) -> &'static str {
        match self {
            BrowserFlavor::Chrome => "goog:chromeOptions",
            BrowserFlavor::Firefox => "moz:firefoxOptions",
        }
    }
}

/// Command-line arguments passed to the browser itself.
pub fn build_browser_arguments(flavor: BrowserFlavor, options: &WebDriverOptions) -> Vec<String> {
    let mut args = Vec::new();
    if options.headless {
        match flavor {
            BrowserFlavor::Chrome => {
                args.push("--headless=new".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--no-sandbox".to_string());
                args.push("--disable-dev-shm-usage".to_string());
            }
            BrowserFlavor::Firefox => args.push("-headless".to_string()),
        }
    }
    args.extend(options.browser_args.iter().cloned());
    args
}

/// W3C capabilities for a new session.
pub fn build_capabilities(flavor: BrowserFlavor, options: &WebDriverOptions) -> Capabilities {
    let mut caps = Capabilities::new();
    let args = build_browser_arguments(flavor, options);
    caps.insert(flavor.options_key().to_string(), json!({ "args": args }));
    caps.insert("pageLoadStrategy".to_string(), json!("normal"));
    caps
}
