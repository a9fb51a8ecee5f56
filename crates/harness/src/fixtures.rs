//! Fixture stores.
//!
//! A fixture is a small JSON blob (a bearer token, a registered user) written
//! by one step and read by later ones. The store is created once per run and
//! handed to the runner explicitly; nothing about it is global.
//!
//! Two backends are provided:
//!
//! - [`FileFixtureStore`] - one `<name>.json` file per fixture in a directory
//! - [`MemoryFixtureStore`] - an in-process map, nothing touches disk

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{FixtureError, FixtureResult};
use crate::types::Credential;

/// Storage for fixtures shared between steps of a run.
///
/// Implementations must make a `save` visible to every subsequent `load` in
/// the same process.
pub trait FixtureStore: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Persists a value under a logical name, replacing any previous value.
    ///
    /// # Errors
    ///
    /// * `FixtureError::InvalidName` - the name is empty or not file-safe
    /// * `FixtureError::Io` / `Serialization` - the value could not be written
    fn save(&self, name: &str, value: &Value) -> FixtureResult<()>;

    /// Loads a value by logical name.
    ///
    /// # Errors
    ///
    /// * `FixtureError::NotFound` - nothing was saved under this name
    fn load(&self, name: &str) -> FixtureResult<Value>;

    /// Returns true if a fixture exists under this name.
    fn contains(&self, name: &str) -> bool;

    /// Removes a fixture, returning whether it existed.
    fn remove(&self, name: &str) -> FixtureResult<bool>;
}

/// Typed helpers available on every [`FixtureStore`].
pub trait FixtureStoreExt: FixtureStore {
    /// Serializes and saves a value.
    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> FixtureResult<()> {
        let value = serde_json::to_value(value).map_err(|source| FixtureError::Serialization {
            name: name.to_string(),
            source,
        })?;
        self.save(name, &value)
    }

    /// Loads and deserializes a value.
    fn load_json<T: DeserializeOwned>(&self, name: &str) -> FixtureResult<T> {
        let value = self.load(name)?;
        serde_json::from_value(value).map_err(|source| FixtureError::Serialization {
            name: name.to_string(),
            source,
        })
    }

    /// Loads a bearer credential, accepting either fixture shape.
    fn load_credential(&self, name: &str) -> FixtureResult<Credential> {
        let value = self.load(name)?;
        Credential::from_fixture(name, &value)
    }
}

impl<S: FixtureStore + ?Sized> FixtureStoreExt for S {}

/// Checks that a fixture name is usable as a file stem.
fn validate_name(name: &str) -> FixtureResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(FixtureError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Fixture store writing one JSON file per fixture.
///
/// Writes go to a temporary file that is renamed into place, so a reader
/// never observes a half-written fixture.
#[derive(Debug)]
pub struct FileFixtureStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileFixtureStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the directory holding the fixtures.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path used for a fixture name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn io_error(name: &str, source: std::io::Error) -> FixtureError {
        FixtureError::Io {
            name: name.to_string(),
            source,
        }
    }
}

impl FixtureStore for FileFixtureStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn save(&self, name: &str, value: &Value) -> FixtureResult<()> {
        validate_name(name)?;
        let _guard = self.lock.lock();

        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(name, e))?;
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|source| FixtureError::Serialization {
                name: name.to_string(),
                source,
            })?;

        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        fs::write(&tmp, bytes).map_err(|e| Self::io_error(name, e))?;
        fs::rename(&tmp, self.path_for(name)).map_err(|e| Self::io_error(name, e))?;

        debug!(fixture = %name, dir = %self.dir.display(), "Saved fixture");
        Ok(())
    }

    fn load(&self, name: &str) -> FixtureResult<Value> {
        validate_name(name)?;
        let _guard = self.lock.lock();

        let bytes = match fs::read(self.path_for(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FixtureError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(Self::io_error(name, e)),
        };

        serde_json::from_slice(&bytes).map_err(|source| FixtureError::Serialization {
            name: name.to_string(),
            source,
        })
    }

    fn contains(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path_for(name).is_file()
    }

    fn remove(&self, name: &str) -> FixtureResult<bool> {
        validate_name(name)?;
        let _guard = self.lock.lock();

        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(name, e)),
        }
    }
}

/// Fixture store keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryFixtureStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryFixtureStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored fixtures.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been saved.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl FixtureStore for MemoryFixtureStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn save(&self, name: &str, value: &Value) -> FixtureResult<()> {
        validate_name(name)?;
        self.entries.write().insert(name.to_string(), value.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> FixtureResult<Value> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FixtureError::NotFound {
                name: name.to_string(),
            })
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    fn remove(&self, name: &str) -> FixtureResult<bool> {
        Ok(self.entries.write().remove(name).is_some())
    }
}
