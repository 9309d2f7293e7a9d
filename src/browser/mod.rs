//! Browser control used by login and marks extraction.
//!
//! Callers depend on the [`BrowserDriver`] trait only; [`WebDriverClient`]
//! implements it against chromedriver.

pub mod webdriver;

pub use webdriver::WebDriverClient;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::DriverError;

/// How to find an element on the page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Id(String),
    Name(String),
    ClassName(String),
    TagName(String),
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn name(value: &str) -> Self {
        Locator::Name(value.to_string())
    }

    pub fn id(value: &str) -> Self {
        Locator::Id(value.to_string())
    }

    pub fn class_name(value: &str) -> Self {
        Locator::ClassName(value.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::ClassName(v) => write!(f, "class={}", v),
            Locator::TagName(v) => write!(f, "tag={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// The browser capabilities the scraper needs.
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Blocks until `locator` matches, failing with [`DriverError::Timeout`].
    fn wait_for_element(&mut self, locator: &Locator, timeout: Duration) -> Result<(), DriverError>;

    /// Saves a PNG screenshot of one element.
    fn screenshot_element(&mut self, locator: &Locator, path: &Path) -> Result<(), DriverError>;

    /// Types `text` into a form field.
    fn fill_field(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError>;

    /// Cell texts of every `<tr>` in a table, header row included.
    fn table_rows(&mut self, table: &Locator) -> Result<Vec<Vec<String>>, DriverError>;

    /// Loads `url` and waits for `ready` to render.
    fn open(&mut self, url: &str, ready: &Locator, timeout: Duration) -> Result<(), DriverError> {
        self.navigate(url)?;
        self.wait_for_element(ready, timeout)
    }
}
