//! `fantoccini` WebDriver implementation of the session traits.
pub mod capabilities;
pub mod driver;
pub mod page;

pub use capabilities::{build_capabilities, BrowserFlavor};
pub use driver::{DriverLocator, WebDriverBackend, WebDriverOptions};
pub use page::WebDriverSession;
