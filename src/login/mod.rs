//! Portal login with captcha solving.
//!
//! This module provides:
//! - The login state machine (navigate, capture, solve, submit, verify)
//! - A runner that retries attempts until success or the budget runs out

pub mod runner;
pub mod state;

pub use runner::{login, LoginOutcome};
pub use state::{Credentials, LoginSession, LoginState};
