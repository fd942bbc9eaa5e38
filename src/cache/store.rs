//! Key-value store persisted as a single JSON file
//!
//! Provides a `CacheStore` that keeps the whole mapping in memory and writes it
//! through to disk on every insert. Loading never fails: unreadable or corrupt
//! files produce an empty store and a warning that callers can inspect.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while reading or writing a cache file
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file (or a value) could not be encoded or decoded as JSON
    #[error("Cache JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file held valid JSON, but not an object at the top level
    #[error("Cache file {} does not contain a JSON object", .0.display())]
    NotAnObject(PathBuf),
}

/// Whether a value came from the store or from the fetch function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The key was already present; no fetch happened
    Hit,
    /// The key was missing; the value was fetched and persisted
    Miss,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Hit => write!(f, "Using cache"),
            CacheStatus::Miss => write!(f, "Fetching"),
        }
    }
}

/// Result of a cached lookup, including where the value came from
#[derive(Debug, Clone, PartialEq)]
pub struct CachedData<T> {
    /// The cached or freshly fetched value
    pub data: T,
    /// Whether this was a hit or a miss
    pub status: CacheStatus,
}

impl<T> CachedData<T> {
    /// Returns true if the value was served from the store
    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// A string-keyed JSON mapping backed by one file
///
/// The file holds a single flat JSON object. Every call to
/// [`put_and_persist`](Self::put_and_persist) serializes the entire mapping and
/// overwrites the file, so the file always mirrors the in-memory state after a
/// successful write. Keys are compared by exact string equality.
///
/// Not safe for use by several processes sharing one file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Backing file
    path: PathBuf,
    /// In-memory snapshot of the file
    entries: Map<String, Value>,
    /// Why the backing file could not be used at load time, if it couldn't
    load_warning: Option<String>,
}

impl CacheStore {
    /// Creates an empty store that will write to `path`, without reading it
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Map::new(),
            load_warning: None,
        }
    }

    /// Loads a store from `path`
    ///
    /// A missing file yields an empty store. An unreadable file, malformed JSON,
    /// or a top-level value that isn't an object also yields an empty store, but
    /// logs a warning and records it in [`load_warning`](Self::load_warning).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read_entries(&path) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "Cache loaded");
                Self {
                    path,
                    entries,
                    load_warning: None,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache file unusable, starting empty");
                Self {
                    path,
                    entries: Map::new(),
                    load_warning: Some(e.to_string()),
                }
            }
        }
    }

    /// Loads a store from `path`, surfacing corruption as an error
    ///
    /// A missing file is still treated as an empty store.
    pub fn try_load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = Self::read_entries(&path)?;
        Ok(Self {
            path,
            entries,
            load_warning: None,
        })
    }

    fn read_entries(path: &Path) -> Result<Map<String, Value>, CacheError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache file yet");
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(CacheError::NotAnObject(path.to_path_buf())),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reason the backing file was discarded at load time, if it was
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    /// Number of entries in the store
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up `key` in memory. Never touches the file system.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Looks up `key` and decodes it into `T`
    ///
    /// Returns `None` if the key is absent, or `Some(Err)` if the stored value
    /// doesn't have the shape of `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, CacheError>> {
        self.get(key)
            .map(|value| serde_json::from_value(value.clone()).map_err(CacheError::from))
    }

    /// Inserts `value` under `key` and rewrites the whole backing file
    ///
    /// Missing parent directories are created. Write failures are returned to
    /// the caller; the entry stays in memory either way.
    pub fn put_and_persist(&mut self, key: impl Into<String>, value: Value) -> Result<(), CacheError> {
        self.entries.insert(key.into(), value);
        self.persist()
    }

    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Returns the cached value for `key`, or fetches, persists and returns it
    ///
    /// On a hit `fetch` is not called. On a miss `fetch` runs once and its
    /// result is written through before being returned; a failed fetch stores
    /// nothing. An entry that no longer decodes as `T` is treated as a miss.
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &mut self,
        key: &str,
        fetch: F,
    ) -> Result<CachedData<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get_as::<T>(key) {
            Some(Ok(data)) => {
                debug!(key, "Cache hit");
                return Ok(CachedData {
                    data,
                    status: CacheStatus::Hit,
                });
            }
            Some(Err(e)) => {
                warn!(key, error = %e, "Cached entry has an unexpected shape, refetching");
            }
            None => debug!(key, "Cache miss"),
        }

        let data = fetch().await?;
        let value = serde_json::to_value(&data).map_err(CacheError::from)?;
        self.put_and_persist(key, value)?;

        Ok(CachedData {
            data,
            status: CacheStatus::Miss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Park {
        name: String,
        zipcode: String,
    }

    fn create_test_store(name: &str) -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::load(temp_dir.path().join(name));
        (store, temp_dir)
    }

    fn read_file_json(path: &Path) -> Value {
        let content = fs::read_to_string(path).expect("Should read cache file");
        serde_json::from_str(&content).expect("Cache file should be valid JSON")
    }

    #[test]
    fn test_load_missing_file_is_empty_without_warning() {
        let (store, _temp_dir) = create_test_store("cache.json");

        assert!(store.is_empty());
        assert!(store.get("https://example/parkA").is_none());
        assert!(store.load_warning().is_none());
        assert!(!store.path().exists(), "Loading must not create the file");
    }

    #[test]
    fn test_load_empty_object_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{}").unwrap();

        let store = CacheStore::load(&path);

        assert!(store.is_empty());
        assert!(store.get("49931").is_none());
        assert!(store.load_warning().is_none());
    }

    #[test]
    fn test_load_invalid_json_degrades_to_empty_with_warning() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "{\"49931\": {\"searchResults\": [").unwrap();

        let store = CacheStore::load(&path);

        assert!(store.is_empty());
        assert!(store.load_warning().is_some());
        assert!(matches!(CacheStore::try_load(&path), Err(CacheError::Json(_))));
    }

    #[test]
    fn test_load_empty_file_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "").unwrap();

        let store = CacheStore::load(&path);

        assert!(store.is_empty());
        assert!(store.load_warning().is_some());
    }

    #[test]
    fn test_load_non_object_json_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = CacheStore::load(&path);

        assert!(store.is_empty());
        let warning = store.load_warning().expect("Should record a warning");
        assert!(warning.contains("JSON object"));
        assert!(matches!(
            CacheStore::try_load(&path),
            Err(CacheError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_try_load_missing_file_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::try_load(temp_dir.path().join("missing.json"))
            .expect("Missing file should not be an error");
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_and_persist_survives_reload() {
        let (mut store, _temp_dir) = create_test_store("cache.json");
        let value = json!({"name": "Isle Royale", "zipcode": "49931", "rank": 3, "open": true});

        store
            .put_and_persist("https://example/parkA", value.clone())
            .expect("Write should succeed");

        let reloaded = CacheStore::load(store.path());
        assert_eq!(reloaded.get("https://example/parkA"), Some(&value));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_put_and_persist_keeps_floats_exact() {
        let (mut store, _temp_dir) = create_test_store("cache_near.json");
        let value = json!({
            "searchResults": [{
                "distance": 7.5680929099633545,
                "shapePoints": [47.99585610392364, -88.90891075134277],
                "fields": {"lat": 0.1 + 0.2, "lng": -179.99999999999997}
            }]
        });

        store
            .put_and_persist("49931", value.clone())
            .expect("Write should succeed");

        let reloaded = CacheStore::load(store.path());
        assert_eq!(reloaded.get("49931"), Some(&value));
        let distance = reloaded.get("49931").unwrap()["searchResults"][0]["distance"]
            .as_f64()
            .unwrap();
        assert_eq!(distance.to_bits(), 7.5680929099633545_f64.to_bits());
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let (mut store, _temp_dir) = create_test_store("cache_near.json");

        store.put_and_persist("49931", json!({"a": 1})).unwrap();
        store.put_and_persist("82190-0168", json!({"b": 2})).unwrap();

        assert_eq!(store.get("49931"), Some(&json!({"a": 1})));
        assert_eq!(store.get("82190-0168"), Some(&json!({"b": 2})));

        let reloaded = CacheStore::load(store.path());
        assert_eq!(reloaded.get("49931"), Some(&json!({"a": 1})));
        assert_eq!(reloaded.get("82190-0168"), Some(&json!({"b": 2})));
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let (mut store, _temp_dir) = create_test_store("cache.json");

        store
            .put_and_persist("https://www.nps.gov/isro/index.htm", json!(1))
            .unwrap();

        assert!(store.contains_key("https://www.nps.gov/isro/index.htm"));
        assert!(!store.contains_key("https://www.nps.gov/ISRO/index.htm"));
        assert!(!store.contains_key("https://www.nps.gov/isro/index.htm/"));
    }

    #[test]
    fn test_persist_rewrites_whole_file_compactly() {
        let (mut store, _temp_dir) = create_test_store("cache.json");

        store.put_and_persist("a", json!({"x": 1})).unwrap();
        store.put_and_persist("b", json!({"y": 2})).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(!content.contains('\n'), "Cache file should not be pretty-printed");
        assert_eq!(read_file_json(store.path()), json!({"a": {"x": 1}, "b": {"y": 2}}));
    }

    #[test]
    fn test_put_overwrites_existing_key() {
        let (mut store, _temp_dir) = create_test_store("cache.json");

        store.put_and_persist("49931", json!("first")).unwrap();
        store.put_and_persist("49931", json!("second")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(CacheStore::load(store.path()).get("49931"), Some(&json!("second")));
    }

    #[test]
    fn test_put_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("cache.json");
        let mut store = CacheStore::load(&path);

        store.put_and_persist("k", json!(null)).expect("Write should succeed");

        assert!(path.exists());
    }

    #[test]
    fn test_put_propagates_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        // A directory can't be overwritten with a file
        let mut store = CacheStore::empty(temp_dir.path());

        let result = store.put_and_persist("k", json!(1));

        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn test_get_as_decodes_typed_values() {
        let (mut store, _temp_dir) = create_test_store("cache.json");
        store
            .put_and_persist("p", json!({"name": "Isle Royale", "zipcode": "49931"}))
            .unwrap();
        store.put_and_persist("bad", json!([1, 2])).unwrap();

        let park: Park = store.get_as("p").unwrap().unwrap();
        assert_eq!(park.name, "Isle Royale");
        assert!(store.get_as::<Park>("bad").unwrap().is_err());
        assert!(store.get_as::<Park>("missing").is_none());
    }

    #[tokio::test]
    async fn test_fetch_with_cache_calls_fetch_once_per_key() {
        let (mut store, _temp_dir) = create_test_store("cache.json");
        let mut calls = 0;

        let first = store
            .fetch_with_cache("49931", || {
                calls += 1;
                async { Ok::<_, CacheError>(json!({"searchResults": []})) }
            })
            .await
            .unwrap();
        let second = store
            .fetch_with_cache("49931", || {
                calls += 1;
                async { Ok::<_, CacheError>(json!({"searchResults": ["other"]})) }
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(first.status, CacheStatus::Miss);
        assert!(second.is_hit());
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn test_fetch_with_cache_empty_store_scenario() {
        let (mut store, _temp_dir) = create_test_store("cache.json");
        let park = Park {
            name: "Isle Royale".to_string(),
            zipcode: "49931".to_string(),
        };
        let mut calls = 0;

        let result = store
            .fetch_with_cache("https://example/parkA", || {
                calls += 1;
                let park = park.clone();
                async move { Ok::<_, CacheError>(park) }
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(result.data, park);
        assert_eq!(
            read_file_json(store.path()),
            json!({"https://example/parkA": {"name": "Isle Royale", "zipcode": "49931"}})
        );
    }

    #[tokio::test]
    async fn test_fetch_with_cache_prepopulated_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache_near.json");
        fs::write(&path, r#"{"49931": {"searchResults": []}}"#).unwrap();
        let mut store = CacheStore::load(&path);
        let mut calls = 0;

        let result = store
            .fetch_with_cache("49931", || {
                calls += 1;
                async { Ok::<Value, CacheError>(json!("should not be used")) }
            })
            .await
            .unwrap();

        assert_eq!(calls, 0);
        assert!(result.is_hit());
        assert_eq!(result.data, json!({"searchResults": []}));
    }

    #[tokio::test]
    async fn test_fetch_with_cache_failed_fetch_stores_nothing() {
        let (mut store, _temp_dir) = create_test_store("cache.json");

        let result = store
            .fetch_with_cache::<Value, CacheError, _, _>("49931", || async {
                Err(CacheError::NotAnObject(PathBuf::from("remote")))
            })
            .await;

        assert!(result.is_err());
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_fetch_with_cache_refetches_entry_with_stale_shape() {
        let (mut store, _temp_dir) = create_test_store("cache.json");
        store.put_and_persist("p", json!({"title": "old layout"})).unwrap();
        let mut calls = 0;

        let result = store
            .fetch_with_cache("p", || {
                calls += 1;
                async {
                    Ok::<_, CacheError>(Park {
                        name: "Voyageurs".to_string(),
                        zipcode: "56649".to_string(),
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(result.status, CacheStatus::Miss);
        let reloaded = CacheStore::load(store.path());
        assert_eq!(reloaded.get_as::<Park>("p").unwrap().unwrap().name, "Voyageurs");
    }

    #[test]
    fn test_cache_status_console_lines() {
        assert_eq!(CacheStatus::Hit.to_string(), "Using cache");
        assert_eq!(CacheStatus::Miss.to_string(), "Fetching");
    }
}
