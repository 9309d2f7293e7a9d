//! Drives the login state machine to completion.

use crate::browser::BrowserDriver;
use crate::captcha::CaptchaSolver;
use crate::config::AppConfig;
use crate::error::LoginError;
use crate::logging::Logger;
use crate::login::state::{Credentials, LoginSession};

/// Result of a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Logs in, retrying on transient failures.
///
/// On success the driver is left on the authenticated page. Captcha captures
/// are deleted on every exit path.
pub fn login<D: BrowserDriver>(
    driver: &mut D,
    solver: &CaptchaSolver,
    config: &AppConfig,
    credentials: &Credentials,
    logger: &Logger,
) -> Result<LoginOutcome, LoginError> {
    let mut session = LoginSession::new(driver, solver, config, credentials, logger.clone());

    while session.step()? {
        logger.debug(format!(
            "Login {}/{}: {}",
            session.attempt(),
            session.max_attempts(),
            session.state()
        ));
    }

    Ok(LoginOutcome {
        attempts: session.attempt(),
    })
}
