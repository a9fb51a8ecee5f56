//! Scenario files and seed data.
//!
//! A scenario file is a JSON document holding a named list of scenarios in the
//! same shape as the [`Scenario`] model. Every scenario is validated on load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LoaderError;
use crate::scenario::Scenario;

/// A scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Name of the file's suite.
    pub name: String,

    /// Description of the suite.
    #[serde(default)]
    pub description: String,

    /// Tags for filtering.
    #[serde(default)]
    pub tags: Vec<String>,

    /// The scenarios, in execution order.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

fn read(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads and validates a scenario file.
pub fn load_scenario_file(path: &Path) -> Result<ScenarioFile, LoaderError> {
    let content = read(path)?;
    let file: ScenarioFile = serde_json::from_str(&content).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let errors: Vec<String> = file
        .scenarios
        .iter()
        .filter_map(|scenario| scenario.validate().err())
        .flatten()
        .collect();
    if !errors.is_empty() {
        return Err(LoaderError::Invalid {
            path: path.to_path_buf(),
            errors,
        });
    }

    debug!(path = %path.display(), suite = %file.name, scenarios = file.scenarios.len(), "Loaded scenario file");
    Ok(file)
}

/// Loads every scenario from a list of files or directories, in order.
pub fn load_scenario_files(paths: &[PathBuf]) -> Result<Vec<Scenario>, LoaderError> {
    let mut scenarios = Vec::new();
    for path in paths {
        let files = if path.is_dir() {
            discover_scenario_files(path)
        } else {
            vec![path.clone()]
        };
        for file in files {
            scenarios.extend(load_scenario_file(&file)?.scenarios);
        }
    }
    Ok(scenarios)
}

/// Finds all `.json` files under a directory, sorted by path.
pub fn discover_scenario_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                found.push(path);
            } else if path.is_dir() {
                found.extend(discover_scenario_files(&path));
            }
        }
    }

    found.sort();
    found
}

/// Reads the `posts` array of a json-server `db.json`.
pub fn load_seed_posts(path: &Path) -> Result<Vec<Value>, LoaderError> {
    let content = read(path)?;
    let mut db: Value = serde_json::from_str(&content).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match db.get_mut("posts").map(Value::take) {
        Some(Value::Array(posts)) => Ok(posts),
        _ => Err(LoaderError::Invalid {
            path: path.to_path_buf(),
            errors: vec!["expected a `posts` array".to_string()],
        }),
    }
}
