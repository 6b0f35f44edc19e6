//! File-backed cache storage.
//!
//! Each key is stored as `<key>.json` inside one directory. Writes go to a
//! sibling temporary file first and are moved into place with a rename, so
//! a crash mid-write leaves the previous value intact.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{CacheError, CacheStorage};

/// Cache storage persisted under a directory.
#[derive(Debug, Clone)]
pub struct FileCacheStorage {
    directory: PathBuf,
}

impl FileCacheStorage {
    /// Creates storage rooted at `directory`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|character| {
                if character.is_ascii_alphanumeric() || matches!(character, '.' | '-' | '_') {
                    character
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

impl CacheStorage for FileCacheStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
