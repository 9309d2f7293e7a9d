//! Runtime configuration loaded from config.json.
//!
//! Every section falls back to defaults, so a partial file only needs the
//! values it changes. Without a file the built-in defaults target the Anna
//! University COE portal and a local chromedriver.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::Locator;
use crate::logging::Logger;

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub selectors: SelectorConfig,
    pub login: LoginConfig,
    pub webdriver: WebDriverConfig,
    /// Maximum time to wait for the marks table (milliseconds)
    pub marks_timeout_ms: u64,
    /// Template library to use instead of the embedded seed set
    pub templates_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portal: PortalConfig::default(),
            selectors: SelectorConfig::default(),
            login: LoginConfig::default(),
            webdriver: WebDriverConfig::default(),
            marks_timeout_ms: 10_000,
            templates_path: None,
        }
    }
}

impl AppConfig {
    pub fn marks_timeout(&self) -> Duration {
        Duration::from_millis(self.marks_timeout_ms)
    }
}

/// Portal URLs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_path: String,
    pub marks_path: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://coe.annauniv.edu".to_string(),
            login_path: "/login.php".to_string(),
            marks_path: "/student/marks.php".to_string(),
        }
    }
}

impl PortalConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }

    pub fn marks_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.marks_path)
    }
}

/// Page elements the scraper interacts with.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub username_field: Locator,
    pub password_field: Locator,
    pub captcha_field: Locator,
    pub captcha_image: Locator,
    pub submit_button: Locator,
    /// Present only after a successful login
    pub success_marker: Locator,
    pub semester_select: Locator,
    pub marks_table: Locator,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            username_field: Locator::name("username"),
            password_field: Locator::name("password"),
            captcha_field: Locator::name("captcha"),
            captcha_image: Locator::id("captchaImage"),
            submit_button: Locator::name("login"),
            success_marker: Locator::class_name("dashboard"),
            semester_select: Locator::name("semester"),
            marks_table: Locator::class_name("marks-table"),
        }
    }
}

/// Login retry policy and waits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Wait for the credential form to render (milliseconds)
    pub form_timeout_ms: u64,
    /// Wait for the post-login marker (milliseconds)
    pub result_timeout_ms: u64,
    /// Delay between element lookups while waiting (milliseconds)
    pub poll_interval_ms: u64,
    /// Where captcha screenshots are written; OS temp dir when unset
    pub capture_dir: Option<PathBuf>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            form_timeout_ms: 10_000,
            result_timeout_ms: 5_000,
            poll_interval_ms: 200,
            capture_dir: None,
        }
    }
}

impl LoginConfig {
    pub fn form_timeout(&self) -> Duration {
        Duration::from_millis(self.form_timeout_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn capture_dir(&self) -> PathBuf {
        self.capture_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// WebDriver server connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub url: String,
    pub browser: String,
    /// Browser command-line arguments
    pub args: Vec<String>,
    /// Per-request HTTP timeout (milliseconds)
    pub request_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            args: vec![
                "--headless=new".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
            ],
            request_timeout_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// Parses a config file. Missing or invalid files are errors.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads the default config file if present, otherwise returns defaults.
    pub fn load_or_default(path: &Path, logger: &Logger) -> Result<Self> {
        if !path.exists() {
            logger.info(format!("{} not found. Using default config.", path.display()));
            return Ok(Self::default());
        }

        let config = Self::from_file(path)?;
        logger.info(format!("Config loaded from {}", path.display()));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.login.max_attempts, 3);
        assert_eq!(config.login.form_timeout(), Duration::from_secs(10));
        assert_eq!(config.login.result_timeout(), Duration::from_secs(5));
        assert_eq!(config.portal.login_url(), "https://coe.annauniv.edu/login.php");
        assert_eq!(config.portal.marks_url(), "https://coe.annauniv.edu/student/marks.php");
        assert_eq!(config.selectors.captcha_image, Locator::id("captchaImage"));
        assert_eq!(config.marks_timeout_ms, 10_000);
        assert!(config.templates_path.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "login": { "max_attempts": 5 },
                "selectors": { "success_marker": { "by": "id", "value": "welcome" } }
            }"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.login.max_attempts, 5);
        assert_eq!(config.login.result_timeout_ms, 5_000);
        assert_eq!(config.selectors.success_marker, Locator::id("welcome"));
        assert_eq!(config.selectors.username_field, Locator::name("username"));
        assert_eq!(config.marks_timeout_ms, 10_000);
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("config.json"), &Logger::new()).unwrap();
        assert_eq!(config.webdriver.url, "http://localhost:9515");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(AppConfig::from_file(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(AppConfig::load_or_default(&path, &Logger::new()).is_err());
    }

    #[test]
    fn test_shipped_config_parses() {
        let shipped = include_str!("../config.json");
        let config: AppConfig = serde_json::from_str(shipped).unwrap();
        assert_eq!(config.login.max_attempts, 3);
    }
}
