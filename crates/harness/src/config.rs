//! Harness configuration.
//!
//! Every option can be given on the command line or through an environment
//! variable, and [`HarnessConfig::default`] provides the same values for
//! programmatic use.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APIFLOW_BASE_URL` | http://localhost:3000 | Service base URL |
//! | `APIFLOW_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `APIFLOW_FIXTURE_DIR` | fixtures | Fixture directory |
//! | `APIFLOW_EPHEMERAL` | false | Keep fixtures in memory only |
//! | `APIFLOW_LOG_LEVEL` | info | Log level |
//! | `APIFLOW_SEED_DB` | - | Path to the service's seed `db.json` |
//! | `APIFLOW_PROTECTED_RESOURCE` | 664 | Guarded route prefix for post creation |
//! | `APIFLOW_SCENARIO_FILE` | - | Scenario files to run instead of the built-in suite |
//! | `APIFLOW_ONLY` | - | Run only scenarios whose name contains this text |
//! | `APIFLOW_FORMAT` | text | Report format (text, json) |
//!
//! # Example
//!
//! ```rust
//! use apiflow_harness::HarnessConfig;
//!
//! let config = HarnessConfig {
//!     base_url: "http://localhost:4000".to_string(),
//!     ephemeral: true,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use url::Url;

/// Output format of the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Configuration for a harness run.
#[derive(Debug, Clone, Parser)]
#[command(name = "apiflow")]
#[command(about = "Sequential API-workflow test runner")]
pub struct HarnessConfig {
    /// Base URL of the service under test.
    #[arg(short, long, env = "APIFLOW_BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "APIFLOW_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Directory holding fixture files.
    #[arg(long, env = "APIFLOW_FIXTURE_DIR", default_value = "fixtures")]
    pub fixture_dir: PathBuf,

    /// Keep fixtures in memory instead of writing files.
    #[arg(long, env = "APIFLOW_EPHEMERAL", default_value = "false")]
    pub ephemeral: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "APIFLOW_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the service's seed `db.json`, used by the pagination scenario.
    #[arg(long, env = "APIFLOW_SEED_DB")]
    pub seed_db: Option<PathBuf>,

    /// Route prefix guarding authorized post creation.
    #[arg(long, env = "APIFLOW_PROTECTED_RESOURCE", default_value = "664")]
    pub protected_resource: String,

    /// Scenario files to run instead of the built-in suite (repeatable).
    #[arg(
        short = 'f',
        long = "scenario-file",
        env = "APIFLOW_SCENARIO_FILE",
        value_delimiter = ','
    )]
    pub scenario_files: Vec<PathBuf>,

    /// Only run scenarios whose name contains this text.
    #[arg(long, env = "APIFLOW_ONLY")]
    pub only: Option<String>,

    /// Report format.
    #[arg(long, env = "APIFLOW_FORMAT", value_enum, default_value = "text")]
    pub format: ReportFormat,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: 30,
            fixture_dir: PathBuf::from("fixtures"),
            ephemeral: false,
            log_level: "info".to_string(),
            seed_db: None,
            protected_resource: "664".to_string(),
            scenario_files: Vec::new(),
            only: None,
            format: ReportFormat::Text,
        }
    }
}

impl HarnessConfig {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "Base URL must use http or https, got `{}`",
                url.scheme()
            )),
            Err(e) => errors.push(format!("Base URL `{}` is invalid: {e}", self.base_url)),
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!("Unknown log level `{}`", self.log_level));
        }

        if !self.ephemeral && self.fixture_dir.as_os_str().is_empty() {
            errors.push("Fixture directory cannot be empty".to_string());
        }

        let resource = self.protected_resource.trim_matches('/');
        if resource.is_empty() || resource.contains('/') {
            errors.push("Protected resource must be a single path segment".to_string());
        }

        if self.only.as_deref().is_some_and(|only| only.trim().is_empty()) {
            errors.push("Scenario filter cannot be blank".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Fixtures stay in memory and the timeout is short.
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://127.0.0.1:0".to_string(),
            request_timeout: 5,
            ephemeral: true,
            log_level: "debug".to_string(),
            ..Self::default()
        }
    }
}
