//! AU Marks
//!
//! Logs into the Anna University COE portal, solving its image captcha with
//! template matching, and fetches the student's exam marks through a
//! WebDriver-controlled browser.

mod browser;
mod captcha;
mod config;
mod error;
mod logging;
mod login;
mod marks;
mod paths;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::browser::{BrowserDriver, WebDriverClient};
use crate::captcha::{CaptchaSolver, TemplateLibrary};
use crate::config::AppConfig;
use crate::logging::{FileSink, Logger, TracingSink};
use crate::login::{login, Credentials};
use crate::marks::{export_to_json, extract_marks, write_summary, MarkRecord};

/// Fetch exam marks from the Anna University COE portal.
#[derive(Parser, Debug)]
#[command(name = "au-marks", version)]
struct Cli {
    /// Your login username
    #[arg(long, env = "AU_USERNAME")]
    username: String,

    /// Your login password
    #[arg(long, env = "AU_PASSWORD", hide_env_values = true)]
    password: String,

    /// Specific semester to fetch marks for
    #[arg(long)]
    semester: Option<String>,

    /// Output file path for marks data (JSON)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Config file (defaults to config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Captcha template library (JSON)
    #[arg(long)]
    templates: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Console logging plus `<exe_dir>/logs/au_marks.log` when the directory is writable.
fn build_logger() -> Logger {
    let logger = Logger::new().with_sink(Arc::new(TracingSink));

    match paths::ensure_directories() {
        Ok(()) => logger.with_sink(Arc::new(FileSink::new(
            paths::get_logs_dir().join("au_marks.log"),
        ))),
        Err(e) => {
            logger.warn(format!("File logging disabled: {}", e));
            logger
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let logger = build_logger();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load_or_default(&paths::get_config_path(), &logger)?,
    };

    let library = match cli.templates.as_ref().or(config.templates_path.as_ref()) {
        Some(path) => TemplateLibrary::from_json_file(path)?,
        None => TemplateLibrary::seed()?,
    };
    logger.info(format!("Loaded {} captcha templates", library.len()));
    let solver = CaptchaSolver::new(library, logger.clone());

    let credentials = Credentials {
        username: cli.username.clone(),
        password: cli.password.clone(),
    };

    let mut driver = WebDriverClient::connect(
        &config.webdriver,
        config.login.poll_interval(),
        logger.clone(),
    )
    .with_context(|| format!("Failed to start browser session at {}", config.webdriver.url))?;

    let result = fetch_marks(
        &mut driver,
        &solver,
        &config,
        &credentials,
        cli.semester.as_deref(),
        &logger,
    );

    // The browser is closed whether or not extraction worked
    if let Err(e) = driver.quit() {
        logger.warn(format!("Failed to close browser session: {}", e));
    }

    let records = result?;
    if records.is_empty() {
        logger.warn("No marks found");
        return Ok(());
    }

    match &cli.output {
        Some(path) => {
            export_to_json(&records, path)?;
            logger.info(format!("Marks data saved to {}", path.display()));
        }
        None => {
            write_summary(&records, &mut io::stdout().lock())
                .context("Failed to print marks")?;
        }
    }

    Ok(())
}

/// Logs in and reads the marks table.
fn fetch_marks<D: BrowserDriver>(
    driver: &mut D,
    solver: &CaptchaSolver,
    config: &AppConfig,
    credentials: &Credentials,
    semester: Option<&str>,
    logger: &Logger,
) -> Result<Vec<MarkRecord>> {
    let outcome = login(driver, solver, config, credentials, logger)?;
    logger.info(format!("Logged in after {} attempt(s)", outcome.attempts));

    let records = extract_marks(driver, config, semester, logger)?;
    Ok(records)
}
