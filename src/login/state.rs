//! Login state machine.
//!
//! Each attempt runs: Navigate → Capture → Solve → Submit → AwaitResult.
//! Any step failure moves to Retry, which either starts the next attempt or
//! ends in Failed once the attempt budget is spent. The captcha screenshot of
//! an attempt is removed before the next attempt starts and before a terminal
//! state is reported.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Instant;
use tempfile::{Builder, TempPath};

use crate::browser::BrowserDriver;
use crate::captcha::{CaptchaImage, CaptchaSolver};
use crate::config::AppConfig;
use crate::error::{AttemptError, DriverError, LoginError};
use crate::logging::Logger;

/// Portal credentials. The password is never logged.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login state machine states.
#[derive(Debug)]
pub enum LoginState {
    /// Not started yet
    Start,
    /// Loading the login page and waiting for the form
    Navigate,
    /// Saving the captcha element to a temporary image
    CaptureCaptcha,
    /// Reading the captcha image
    Solve,
    /// Filling credentials and captcha, then submitting
    Submit,
    /// Waiting for the post-login marker
    AwaitResult,
    /// The current attempt failed
    Retry(AttemptError),
    /// Logged in
    Success,
    /// Attempt budget exhausted or fatal error
    Failed,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginState::Start => write!(f, "Start"),
            LoginState::Navigate => write!(f, "Navigating to login page"),
            LoginState::CaptureCaptcha => write!(f, "Capturing captcha"),
            LoginState::Solve => write!(f, "Solving captcha"),
            LoginState::Submit => write!(f, "Submitting login form"),
            LoginState::AwaitResult => write!(f, "Waiting for login result"),
            LoginState::Retry(reason) => write!(f, "Retry: {}", reason),
            LoginState::Success => write!(f, "Success"),
            LoginState::Failed => write!(f, "Failed"),
        }
    }
}

/// One login run: state, attempt counter and the current captcha capture.
pub struct LoginSession<'a, D: BrowserDriver> {
    state: LoginState,
    attempt: u32,
    max_attempts: u32,
    driver: &'a mut D,
    solver: &'a CaptchaSolver,
    config: &'a AppConfig,
    credentials: &'a Credentials,
    logger: Logger,
    capture_dir: PathBuf,
    /// Removed from disk when released or dropped
    capture: Option<TempPath>,
    solution: Option<String>,
    start_time: Instant,
}

impl<'a, D: BrowserDriver> LoginSession<'a, D> {
    pub fn new(
        driver: &'a mut D,
        solver: &'a CaptchaSolver,
        config: &'a AppConfig,
        credentials: &'a Credentials,
        logger: Logger,
    ) -> Self {
        Self {
            state: LoginState::Start,
            attempt: 0,
            max_attempts: config.login.max_attempts.max(1),
            driver,
            solver,
            config,
            credentials,
            logger,
            capture_dir: config.login.capture_dir(),
            capture: None,
            solution: None,
            start_time: Instant::now(),
        }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Attempt budget, at least 1.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current attempt number (1-based once started).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.start_time.elapsed().as_secs_f32()
    }

    /// Advances the state machine by one step.
    ///
    /// Returns `Ok(true)` to keep stepping and `Ok(false)` once logged in.
    /// Fatal errors and budget exhaustion are returned as `Err`.
    pub fn step(&mut self) -> Result<bool, LoginError> {
        match &self.state {
            LoginState::Start => {
                self.attempt = 1;
                self.logger.info(format!(
                    "Logging in as {} (up to {} attempts)",
                    self.credentials.username, self.max_attempts
                ));
                self.state = LoginState::Navigate;
                Ok(true)
            }

            LoginState::Navigate => {
                self.logger.info(format!(
                    "Login attempt {}/{}",
                    self.attempt, self.max_attempts
                ));

                let url = self.config.portal.login_url();
                match self.driver.open(
                    &url,
                    &self.config.selectors.username_field,
                    self.config.login.form_timeout(),
                ) {
                    Ok(()) => self.state = LoginState::CaptureCaptcha,
                    Err(e) => {
                        self.fail_attempt(AttemptError::from_wait("login form", e, AttemptError::Navigate))
                    }
                }
                Ok(true)
            }

            LoginState::CaptureCaptcha => {
                match self.new_capture() {
                    Ok(capture) => {
                        let path = capture.to_path_buf();
                        self.capture = Some(capture);

                        match self
                            .driver
                            .screenshot_element(&self.config.selectors.captcha_image, &path)
                        {
                            Ok(()) => self.state = LoginState::Solve,
                            Err(e) => self.fail_attempt(AttemptError::Capture(e)),
                        }
                    }
                    Err(e) => self.fail_attempt(AttemptError::Capture(DriverError::Io(e))),
                }
                Ok(true)
            }

            LoginState::Solve => {
                let path = self
                    .capture
                    .as_ref()
                    .map(|capture| capture.to_path_buf())
                    .unwrap_or_default();

                match self.solver.solve(CaptchaImage::File(&path)) {
                    Ok(solution) => {
                        self.logger.info(format!("Captcha solution: {}", solution));
                        self.solution = Some(solution.text());
                        self.state = LoginState::Submit;
                        Ok(true)
                    }
                    Err(e) if e.is_fatal() => {
                        self.release_capture();
                        self.state = LoginState::Failed;
                        self.logger.error(format!("Cannot solve captchas: {}", e));
                        Err(LoginError::Configuration(e))
                    }
                    Err(e) => {
                        self.fail_attempt(AttemptError::Solve(e));
                        Ok(true)
                    }
                }
            }

            LoginState::Submit => {
                match self.submit_form() {
                    Ok(()) => self.state = LoginState::AwaitResult,
                    Err(e) => self.fail_attempt(AttemptError::Submit(e)),
                }
                Ok(true)
            }

            LoginState::AwaitResult => {
                match self.driver.wait_for_element(
                    &self.config.selectors.success_marker,
                    self.config.login.result_timeout(),
                ) {
                    Ok(()) => {
                        self.release_capture();
                        self.logger.info(format!(
                            "Login successful on attempt {}/{} ({:.1}s)",
                            self.attempt,
                            self.max_attempts,
                            self.elapsed_secs()
                        ));
                        self.state = LoginState::Success;
                        Ok(false)
                    }
                    Err(e) => {
                        self.fail_attempt(AttemptError::from_wait("login result", e, AttemptError::Submit));
                        Ok(true)
                    }
                }
            }

            LoginState::Retry(_) => self.retry(),

            LoginState::Success | LoginState::Failed => Ok(false),
        }
    }

    /// Creates an empty, uniquely named capture file owned by this attempt.
    fn new_capture(&self) -> std::io::Result<TempPath> {
        let file = Builder::new()
            .prefix(&format!("captcha_attempt_{}_", self.attempt))
            .suffix(".png")
            .tempfile_in(&self.capture_dir)?;
        Ok(file.into_temp_path())
    }

    fn submit_form(&mut self) -> Result<(), DriverError> {
        let selectors = &self.config.selectors;
        let solution = self.solution.as_deref().unwrap_or_default();

        self.driver
            .fill_field(&selectors.username_field, &self.credentials.username)?;
        self.driver
            .fill_field(&selectors.password_field, &self.credentials.password)?;
        self.driver.fill_field(&selectors.captcha_field, solution)?;
        self.driver.click(&selectors.submit_button)
    }

    fn fail_attempt(&mut self, failure: AttemptError) {
        self.logger.warn(format!(
            "Login attempt {}/{} failed: {}",
            self.attempt, self.max_attempts, failure
        ));
        self.state = LoginState::Retry(failure);
    }

    fn retry(&mut self) -> Result<bool, LoginError> {
        self.release_capture();
        self.solution = None;

        if self.attempt < self.max_attempts {
            self.attempt += 1;
            self.state = LoginState::Navigate;
            return Ok(true);
        }

        let LoginState::Retry(last) = std::mem::replace(&mut self.state, LoginState::Failed) else {
            return Ok(false);
        };
        self.logger.error(format!(
            "Login failed after {} attempts: {}",
            self.attempt, last
        ));
        Err(LoginError::RetryBudgetExhausted {
            attempts: self.attempt,
            last,
        })
    }

    /// Deletes the current captcha capture, if any.
    fn release_capture(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let path = capture.to_path_buf();
        if let Err(e) = capture.close() {
            // Removed externally
            if e.kind() != ErrorKind::NotFound {
                self.logger.warn(format!(
                    "Failed to remove captcha image {}: {}",
                    path.display(),
                    e
                ));
            }
        }
    }
}
