//! Durable key-value persistence for the session.
//!
//! Both backends are total: I/O and decoding failures are logged and then
//! treated as "no value", never surfaced to the session store.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};

#[cfg(unix)]
const PRIVATE_MODE: u32 = 0o600;

/// String-keyed storage the session store persists into.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Removing a missing key is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory storage for tests and sessions that should not outlive the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Storage backed by a single JSON object file.
///
/// The file is re-read on every access so several processes sharing it see
/// each other's writes. Writes go to a sibling temp file first and are
/// renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Use the file at `path`. It does not need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Map<String, Value> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(entries)) => entries,
            Ok(_) | Err(_) => {
                tracing::warn!(path = %self.path.display(), "Session file is corrupt, ignoring it");
                Map::new()
            }
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = private_file(&tmp)?;
        file.write_all(&contents)?;
        drop(file);
        std::fs::rename(&tmp, &self.path)
    }

    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>) -> bool) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries();
        if apply(&mut entries)
            && let Err(e) = self.write_entries(&entries)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write session file");
        }
    }
}

/// Open `path` for writing, readable by the owner only. The file holds
/// bearer tokens.
#[cfg(unix)]
fn private_file(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(PRIVATE_MODE)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its own.
    file.set_permissions(std::fs::Permissions::from_mode(PRIVATE_MODE))?;
    Ok(file)
}

#[cfg(not(unix))]
fn private_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_entries().remove(key)? {
            Value::String(value) => Some(value),
            other => Some(other.to_string()),
        }
    }

    fn set(&self, key: &str, value: &str) {
        self.update(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
            true
        });
    }

    fn remove(&self, key: &str) {
        self.update(|entries| entries.remove(key).is_some());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "smart-parking-{name}-{}-{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("user", "{}");
        assert_eq!(store.get("user").as_deref(), Some("{}"));

        store.remove("user");
        store.remove("user");
        assert!(store.get("user").is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let path = temp_path("persist");
        let store = FileStore::new(&path);
        store.set("authTokens", r#"{"access":"a1","refresh":"r1"}"#);

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("authTokens").as_deref(),
            Some(r#"{"access":"a1","refresh":"r1"}"#)
        );

        reopened.remove("authTokens");
        assert!(store.get("authTokens").is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("mode");
        // A leftover temp file with wide permissions must not leak them.
        std::fs::write(path.with_extension("tmp"), "{}").unwrap();
        std::fs::set_permissions(
            path.with_extension("tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let store = FileStore::new(&path);
        store.set("authTokens", r#"{"access":"a1","refresh":"r1"}"#);

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let store = FileStore::new(temp_path("missing"));
        assert!(store.get("user").is_none());
        store.remove("user");
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("user").is_none());

        store.set("user", "x");
        assert_eq!(store.get("user").as_deref(), Some("x"));

        std::fs::remove_file(&path).unwrap();
    }
}
