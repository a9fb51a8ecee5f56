//! Error types for the workflow harness.
//!
//! Library-level failures (building a client, touching the fixture store,
//! loading scenario files, validating configuration) are separated from
//! step-level failures, which are recorded in reports rather than returned.
//!
//! # Step Failure Taxonomy
//!
//! | Failure | Effect |
//! |---------|--------|
//! | `Transport` | Scenario aborted, remaining steps skipped |
//! | `InvalidRequest` | A rendered request is malformed, nothing is sent |
//! | `UnexpectedStatus` | Step failed, remaining steps skipped |
//! | `AssertionMismatch` | Every assertion of the step runs, then the step fails |
//! | `FixtureNotFound` | Step fails before any request is sent |
//! | `UnresolvedReference` | A template names a value nobody captured |
//! | `CaptureFailed` | A declared capture could not be extracted |
//! | `Fixture` | A capture could not be persisted |

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::report::ResponseSnapshot;
use crate::status::StatusSet;

/// The top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// HTTP client errors
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Fixture store errors
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// Scenario file errors
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the HTTP client.
///
/// HTTP status codes never produce a `ClientError`; only transport-level
/// failures and malformed requests do.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid base url `{url}`: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid request path `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header `{name}`: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("{method} {url} timed out")]
    Timeout { method: String, url: String },

    #[error("transport failure for {method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors raised by fixture stores.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("fixture `{name}` not found")]
    NotFound { name: String },

    #[error("invalid fixture name `{name}`")]
    InvalidName { name: String },

    #[error("fixture `{name}` i/o failure: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture `{name}` is not valid JSON: {source}")]
    Serialization {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fixture `{name}` has an unexpected shape: {message}")]
    InvalidShape { name: String, message: String },

    #[error("fixture `{name}` holds an empty token")]
    EmptyCredential { name: String },
}

/// Errors raised while loading scenario files or seed data.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scenario file {}: {}", path.display(), errors.join("; "))]
    Invalid { path: PathBuf, errors: Vec<String> },
}

/// Configuration validation failure.
#[derive(Error, Debug)]
#[error("invalid configuration: {}", errors.join("; "))]
pub struct ConfigError {
    pub errors: Vec<String>,
}

/// Why a step failed.
///
/// Carried inside step reports; serializes with a `kind` tag so JSON reports
/// stay machine-readable.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("unexpected status {status} (accepted: {accepted})")]
    UnexpectedStatus {
        status: u16,
        accepted: StatusSet,
        snapshot: Box<ResponseSnapshot>,
    },

    #[error(
        "{count} assertion(s) failed: {summary}",
        count = .mismatches.len(),
        summary = .mismatches.join("; ")
    )]
    AssertionMismatch {
        mismatches: Vec<String>,
        snapshot: Box<ResponseSnapshot>,
    },

    #[error("required fixture `{name}` not found")]
    FixtureNotFound { name: String },

    #[error("unresolved reference `{reference}`")]
    UnresolvedReference { reference: String },

    #[error("capture `{name}` failed: {message}")]
    CaptureFailed { name: String, message: String },

    #[error("fixture error: {message}")]
    Fixture { message: String },
}

impl StepFailure {
    /// Returns true for failures that abort the scenario because the
    /// service could not be reached at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepFailure::Transport { .. })
    }

    /// Returns the response snapshot attached to this failure, if any.
    pub fn snapshot(&self) -> Option<&ResponseSnapshot> {
        match self {
            StepFailure::UnexpectedStatus { snapshot, .. }
            | StepFailure::AssertionMismatch { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}

impl From<ClientError> for StepFailure {
    fn from(err: ClientError) -> Self {
        let message = err.to_string();
        match err {
            ClientError::InvalidBaseUrl { .. }
            | ClientError::InvalidPath { .. }
            | ClientError::InvalidHeader { .. } => StepFailure::InvalidRequest { message },
            ClientError::Build(_) | ClientError::Timeout { .. } | ClientError::Transport { .. } => {
                StepFailure::Transport { message }
            }
        }
    }
}

impl From<FixtureError> for StepFailure {
    fn from(err: FixtureError) -> Self {
        match err {
            FixtureError::NotFound { name } => StepFailure::FixtureNotFound { name },
            other => StepFailure::Fixture {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Result type for fixture store operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
