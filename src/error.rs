//! Error types for captcha solving, browser control, login and marks extraction.

use std::io;

use thiserror::Error;

/// Errors raised by the captcha pipeline.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// Template set is empty or malformed. Never retried.
    #[error("template library misconfigured: {0}")]
    Configuration(String),

    /// Captcha image could not be read or decoded.
    #[error("failed to decode captcha image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("cannot extract cell {position}: columns {start}..{end} exceed matrix width {width}")]
    Segmentation {
        position: usize,
        start: u32,
        end: u32,
        width: u32,
    },

    #[error("cell shape {cell_height}x{cell_width} does not match template shape {template_height}x{template_width}")]
    ShapeMismatch {
        cell_height: u32,
        cell_width: u32,
        template_height: u32,
        template_width: u32,
    },
}

impl CaptchaError {
    /// Fatal errors escape the login retry loop instead of consuming an attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptchaError::Configuration(_))
    }
}

/// Errors reported by a browser driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("timed out after {timeout_ms}ms waiting for {locator}")]
    Timeout { locator: String, timeout_ms: u64 },

    #[error("no element matches {0}")]
    NoSuchElement(String),

    #[error("webdriver error `{error}`: {message}")]
    Protocol { error: String, message: String },

    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid screenshot payload: {0}")]
    Screenshot(#[from] base64::DecodeError),

    #[error("unexpected webdriver response: {0}")]
    Response(String),

    #[error("browser session already closed")]
    SessionClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why a single login attempt failed. Every variant leads to a retry.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("timed out after {timeout_ms}ms waiting for {stage}")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    #[error("could not load login page: {0}")]
    Navigate(#[source] DriverError),

    #[error("captcha capture failed: {0}")]
    Capture(#[source] DriverError),

    #[error("captcha solve failed: {0}")]
    Solve(#[source] CaptchaError),

    #[error("form submission failed: {0}")]
    Submit(#[source] DriverError),
}

impl AttemptError {
    /// Maps a bounded-wait failure to a timeout for `stage`, keeping other driver errors.
    pub fn from_wait(stage: &'static str, err: DriverError, wrap: fn(DriverError) -> Self) -> Self {
        match err {
            DriverError::Timeout { timeout_ms, .. } => AttemptError::Timeout { stage, timeout_ms },
            other => wrap(other),
        }
    }
}

/// Terminal login failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("captcha templates misconfigured: {0}")]
    Configuration(#[source] CaptchaError),

    #[error("login failed after {attempts} attempts: {last}")]
    RetryBudgetExhausted {
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

/// Errors while reading the marks table after login.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("marks table row {row} has {found} cells, expected {expected}")]
    Parse {
        row: usize,
        found: usize,
        expected: usize,
    },
}
