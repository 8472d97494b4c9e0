//! Local key-value persistence.
//!
//! Each key maps to one JSON file under the store root. Writes go through a
//! temporary file in the same directory and are renamed into place.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

pub const USER_KEY: &str = "user";
pub const CHARACTERS_KEY: &str = "characters";
pub const SAVED_TOPICS_KEY: &str = "saved_topics";

#[derive(Debug)]
pub enum StoreError {
    InvalidKey(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidKey(key) => write!(f, "Invalid store key: {key:?}"),
            StoreError::Io { path, source } => {
                write!(f, "Failed to access {}: {source}", path.display())
            }
            StoreError::Json { path, source } => {
                write!(f, "Failed to decode {}: {source}", path.display())
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::InvalidKey(_) => None,
            StoreError::Io { source, .. } => Some(source),
            StoreError::Json { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted in the platform data directory, unless overridden.
    pub fn open(data_dir: Option<&Path>) -> Result<Self, StoreError> {
        match data_dir {
            Some(dir) => Ok(Self::new(dir)),
            None => default_data_dir().map(Self::new).ok_or_else(|| StoreError::Io {
                path: PathBuf::from("<data dir>"),
                source: std::io::Error::new(ErrorKind::NotFound, "no home directory"),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Json { path, source })
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_err)?;
        let contents = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let mut temp_file = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        temp_file.write_all(&contents).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }

    /// Returns whether a value was present.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "heartline", "heartline").map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn put_then_get_returns_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested"));
        let sample = Sample {
            name: "月".into(),
            count: 2,
        };

        store.put("sample", &sample).unwrap();
        assert_eq!(store.get::<Sample>("sample").unwrap(), Some(sample));
    }

    #[test]
    fn missing_keys_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert_eq!(store.get::<Sample>("absent").unwrap(), None);
        assert!(!store.remove("absent").unwrap());
    }

    #[test]
    fn remove_deletes_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.put(USER_KEY, &vec![1, 2, 3]).unwrap();
        assert!(store.remove(USER_KEY).unwrap());
        assert_eq!(store.get::<Vec<u8>>(USER_KEY).unwrap(), None);
    }

    #[test]
    fn keys_are_restricted_to_safe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        for key in ["", "../escape", "a/b", "with space"] {
            assert!(matches!(
                store.put(key, &1),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn corrupt_values_surface_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            store.get::<Sample>("broken"),
            Err(StoreError::Json { .. })
        ));
    }
}
