//! # apiflow-harness - Sequential API-Workflow Testing
//!
//! This crate drives end-to-end workflows against a REST service: register a
//! user, keep the issued bearer token as a fixture, then create, read, update
//! and delete resources with it, checking statuses, bodies and headers along
//! the way.
//!
//! ## Features
//!
//! - **Sequential scenarios**: steps run strictly in order, later steps
//!   reference values captured from earlier responses
//! - **Explicit data flow**: steps declare the captures and fixtures they
//!   need, and scenarios are validated before they run
//! - **Acceptable-status sets**: a step may accept `{200, 404}` instead of
//!   branching on the status
//! - **Fixture stores**: file-backed or in-memory, scoped to one run
//! - **Aggregated assertions**: every mismatch of a step is reported, not only
//!   the first
//! - **Reports**: text for terminals, JSON for pipelines
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apiflow_harness::{
//!     HttpClient, MemoryFixtureStore, PostsSuite, RandomGenerator, SuiteOptions, TestRun,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpClient::new("http://localhost:3000", Duration::from_secs(30))?;
//!     let fixtures = MemoryFixtureStore::new();
//!     let generator = RandomGenerator::new();
//!
//!     let scenarios = PostsSuite::new(SuiteOptions::default()).scenarios();
//!     let report = TestRun::new(&client, &fixtures, &generator)
//!         .execute(&scenarios)
//!         .await;
//!
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See [`HarnessConfig`] for the command-line flags and `APIFLOW_*`
//! environment variables.

#![warn(missing_docs)]

pub mod assertions;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod generator;
pub mod loader;
pub mod path;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod status;
pub mod suite;
pub mod types;

pub use assertions::{Assertion, AssertionResult};
pub use client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use config::{HarnessConfig, ReportFormat};
pub use context::ScenarioContext;
pub use error::{
    ClientError, ConfigError, FixtureError, HarnessError, HarnessResult, LoaderError, StepFailure,
};
pub use fixtures::{FileFixtureStore, FixtureStore, FixtureStoreExt, MemoryFixtureStore};
pub use generator::{Generator, GeneratorKind, RandomGenerator};
pub use report::{RunReport, ScenarioReport, ScenarioState, StepOutcome, StepReport};
pub use runner::{ScenarioRunner, TestRun};
pub use scenario::{Capture, Iteration, RequestTemplate, Requirement, Scenario, Step};
pub use status::{StatusOutcome, StatusSet};
pub use suite::{PostsSuite, SuiteOptions, TOKEN_FIXTURE};
pub use types::{Credential, RegisteredUser, User};

use tracing::debug;

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("apiflow_harness={level},apiflow={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Builds the scenarios selected by the configuration: the listed scenario
/// files if any, otherwise the built-in posts suite.
pub fn scenarios_for(config: &HarnessConfig) -> HarnessResult<Vec<Scenario>> {
    if !config.scenario_files.is_empty() {
        return Ok(loader::load_scenario_files(&config.scenario_files)?);
    }

    let mut options = SuiteOptions::from_config(config);
    if let Some(seed_db) = &config.seed_db {
        options = options.with_seed_posts(loader::load_seed_posts(seed_db)?);
    }
    Ok(PostsSuite::new(options).scenarios())
}

/// Runs the configured scenarios against the configured service.
///
/// # Errors
///
/// Only setup problems are errors (invalid configuration, unreadable scenario
/// files, an unusable base URL). Failing scenarios are recorded in the
/// returned report.
pub async fn execute(config: &HarnessConfig) -> HarnessResult<RunReport> {
    config
        .validate()
        .map_err(|errors| ConfigError { errors })?;

    let client = HttpClient::from_config(config)?;
    let scenarios = scenarios_for(config)?;
    let fixtures: Box<dyn FixtureStore> = if config.ephemeral {
        Box::new(MemoryFixtureStore::new())
    } else {
        Box::new(FileFixtureStore::new(&config.fixture_dir))
    };
    let generator = RandomGenerator::new();

    debug!(
        files = config.scenario_files.len(),
        seed_db = ?config.seed_db,
        "Scenarios prepared"
    );

    let report = TestRun::new(&client, fixtures.as_ref(), &generator)
        .only(config.only.clone())
        .execute(&scenarios)
        .await;
    Ok(report)
}
