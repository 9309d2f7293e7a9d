//! Minimal W3C WebDriver client over blocking HTTP.
//!
//! Talks to a running chromedriver (default `http://localhost:9515`). Only the
//! endpoints the scraper needs are implemented: new/delete session, navigate,
//! find element(s), element screenshot, send keys, click and element text.

use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use super::{BrowserDriver, Locator};
use crate::config::WebDriverConfig;
use crate::error::DriverError;
use crate::logging::Logger;

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Shortest per-request timeout used inside a bounded wait.
const MIN_REQUEST_BUDGET: Duration = Duration::from_millis(50);

/// One browser session on a WebDriver server.
///
/// The session is deleted by [`WebDriverClient::quit`] or, failing that, on drop.
pub struct WebDriverClient {
    http: Client,
    base_url: String,
    session_id: Option<String>,
    request_timeout: Duration,
    poll_interval: Duration,
    logger: Logger,
}

impl WebDriverClient {
    /// Starts a new browser session.
    pub fn connect(
        config: &WebDriverConfig,
        poll_interval: Duration,
        logger: Logger,
    ) -> Result<Self, DriverError> {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let http = Client::builder().timeout(request_timeout).build()?;
        let base_url = config.url.trim_end_matches('/').to_string();

        logger.info(format!("Starting {} session via {}", config.browser, base_url));

        let value = read_response(
            http.post(format!("{}/session", base_url))
                .json(&new_session_payload(config)),
        )?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Response(format!("missing sessionId in {}", value)))?
            .to_string();

        logger.debug(format!("WebDriver session {}", session_id));

        Ok(Self {
            http,
            base_url,
            session_id: Some(session_id),
            request_timeout,
            poll_interval,
            logger,
        })
    }

    /// Closes the browser. Safe to call more than once.
    pub fn quit(&mut self) -> Result<(), DriverError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        read_response(
            self.http
                .delete(format!("{}/session/{}", self.base_url, session_id)),
        )?;
        self.logger.debug(format!("WebDriver session {} closed", session_id));
        Ok(())
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        self.command_within(method, path, body, None)
    }

    /// Sends a session command, overriding the client timeout when `timeout` is set.
    fn command_within(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, DriverError> {
        let session_id = self.session_id.as_deref().ok_or(DriverError::SessionClosed)?;
        let url = format!("{}/session/{}{}", self.base_url, session_id, path);
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        read_response(request)
    }

    fn find_element(&self, locator: &Locator) -> Result<String, DriverError> {
        self.find_element_within(locator, None)
    }

    fn find_element_within(&self, locator: &Locator, timeout: Option<Duration>) -> Result<String, DriverError> {
        let (using, value) = strategy(locator);
        let response = self.command_within(
            Method::POST,
            "/element",
            Some(json!({ "using": using, "value": value })),
            timeout,
        )?;
        element_id(&response)
    }

    fn find_children(&self, parent: &str, locator: &Locator) -> Result<Vec<String>, DriverError> {
        let (using, value) = strategy(locator);
        let response = self.command(
            Method::POST,
            &format!("/element/{}/elements", parent),
            Some(json!({ "using": using, "value": value })),
        )?;
        response
            .as_array()
            .ok_or_else(|| DriverError::Response(format!("expected element list, got {}", response)))?
            .iter()
            .map(element_id)
            .collect()
    }

    fn element_text(&self, element: &str) -> Result<String, DriverError> {
        let response = self.command(Method::GET, &format!("/element/{}/text", element), None)?;
        response
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Response(format!("expected element text, got {}", response)))
    }
}

impl Drop for WebDriverClient {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            self.logger.warn(format!("Failed to close browser session: {}", e));
        }
    }
}

impl BrowserDriver for WebDriverClient {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.logger.debug(format!("Navigating to {}", url));
        self.command(Method::POST, "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn wait_for_element(&mut self, locator: &Locator, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;

        loop {
            let budget = request_budget(
                deadline.saturating_duration_since(Instant::now()),
                self.request_timeout,
            );
            match self.find_element_within(locator, Some(budget)) {
                Ok(_) => return Ok(()),
                Err(DriverError::NoSuchElement(_)) => {}
                Err(DriverError::Http(e)) if e.is_timeout() => {}
                Err(e) => return Err(e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(DriverError::Timeout {
                    locator: locator.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }

    fn screenshot_element(&mut self, locator: &Locator, path: &Path) -> Result<(), DriverError> {
        let element = self.find_element(locator)?;
        let response = self.command(Method::GET, &format!("/element/{}/screenshot", element), None)?;
        let encoded = response
            .as_str()
            .ok_or_else(|| DriverError::Response(format!("expected base64 screenshot, got {}", response)))?;
        let png = general_purpose::STANDARD.decode(encoded)?;
        fs::write(path, png)?;
        Ok(())
    }

    fn fill_field(&mut self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let element = self.find_element(locator)?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element),
            Some(json!({ "text": text })),
        )?;
        Ok(())
    }

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        let element = self.find_element(locator)?;
        self.command(Method::POST, &format!("/element/{}/click", element), Some(json!({})))?;
        Ok(())
    }

    fn table_rows(&mut self, table: &Locator) -> Result<Vec<Vec<String>>, DriverError> {
        let table = self.find_element(table)?;
        let row_locator = Locator::TagName("tr".to_string());
        let cell_locator = Locator::TagName("td".to_string());

        let mut rows = Vec::new();
        for row in self.find_children(&table, &row_locator)? {
            let cells = self
                .find_children(&row, &cell_locator)?
                .iter()
                .map(|cell| self.element_text(cell))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }
        Ok(rows)
    }
}

/// Per-request timeout for one lookup of a wait with `remaining` time left.
fn request_budget(remaining: Duration, request_timeout: Duration) -> Duration {
    remaining.min(request_timeout).max(MIN_REQUEST_BUDGET)
}

/// Capabilities for a new session: browser name plus Chrome command-line args.
fn new_session_payload(config: &WebDriverConfig) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": config.browser,
                "goog:chromeOptions": { "args": config.args },
            }
        }
    })
}

/// Maps a locator to a W3C location strategy.
fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Id(v) => ("css selector", format!("[id=\"{}\"]", v)),
        Locator::Name(v) => ("css selector", format!("[name=\"{}\"]", v)),
        Locator::ClassName(v) => ("css selector", format!(".{}", v)),
        Locator::TagName(v) => ("tag name", v.clone()),
        Locator::Css(v) => ("css selector", v.clone()),
        Locator::XPath(v) => ("xpath", v.clone()),
    }
}

fn element_id(value: &Value) -> Result<String, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::Response(format!("expected element reference, got {}", value)))
}

fn read_response(request: RequestBuilder) -> Result<Value, DriverError> {
    let response = request.send()?;
    let ok = response.status().is_success();
    let body: Value = response.json()?;
    unwrap_value(ok, body)
}

/// Extracts `value` from a WebDriver response body, or the error it describes.
fn unwrap_value(ok: bool, body: Value) -> Result<Value, DriverError> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if ok {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if error == "no such element" {
        Err(DriverError::NoSuchElement(message))
    } else {
        Err(DriverError::Protocol { error, message })
    }
}
