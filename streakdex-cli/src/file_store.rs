//! Key-value store backed by one JSON file per key.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use streakdex_core::KeyValueStore;

const FILE_EXTENSION: &str = "json";
/// Every file the store writes starts with this, and `clear` touches nothing else.
const FILE_PREFIX: &str = "streakdex-";

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileStoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Stores each key as `<dir>/streakdex-<sanitized key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{FILE_PREFIX}{file}.{FILE_EXTENSION}"))
    }

    fn owns(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(FILE_PREFIX))
    }
}

impl KeyValueStore for JsonFileStore {
    type Error = FileStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(FileStoreError::io(&path, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir).map_err(|err| FileStoreError::io(&self.dir, err))?;
        let path = self.path_for(key);
        // Write then rename so a crash never leaves a truncated blob behind.
        let staging = path.with_extension("tmp");
        fs::write(&staging, value).map_err(|err| FileStoreError::io(&staging, err))?;
        fs::rename(&staging, &path).map_err(|err| FileStoreError::io(&path, err))
    }

    fn clear(&self) -> Result<(), Self::Error> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(FileStoreError::io(&self.dir, err)),
        };
        for entry in entries {
            let path = entry.map_err(|err| FileStoreError::io(&self.dir, err))?.path();
            if Self::owns(&path) {
                fs::remove_file(&path).map_err(|err| FileStoreError::io(&path, err))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data"));

        assert_eq!(store.get("streakdex:state").unwrap(), None);
        store.set("streakdex:state", "{\"a\":1}").unwrap();
        store.set("metadata:25", "{}").unwrap();
        assert_eq!(
            store.get("streakdex:state").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(store.dir().join("streakdex-streakdex_state.json").exists());
        assert!(store.dir().join("streakdex-metadata_25.json").exists());

        store.clear().unwrap();
        assert_eq!(store.get("streakdex:state").unwrap(), None);
        assert_eq!(store.get("metadata:25").unwrap(), None);
    }

    #[test]
    fn clear_leaves_files_it_did_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        store.set("streakdex:state", "{}").unwrap();
        store.clear().unwrap();

        assert_eq!(store.get("streakdex:state").unwrap(), None);
        assert!(dir.path().join("package.json").exists());
        assert!(dir.path().join("tsconfig.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn clearing_missing_directory_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("never-created"));
        assert!(store.clear().is_ok());
    }
}
