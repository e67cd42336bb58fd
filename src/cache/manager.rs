//! Cache manager for persisting API responses
//!
//! Provides a `CacheManager` that stores serializable payloads as timestamped,
//! versioned JSON entries in a `KeyValueStore`. The cache is best-effort: every
//! storage or decoding failure is logged and treated as a miss or a no-op write.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use super::store::KeyValueStore;

/// Default time-to-live for cached responses
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Key prefix for generated location details
pub const LOCATION_PREFIX: &str = "gemini_cache_";
/// Key prefix for generated navigator guidance
pub const GUIDANCE_PREFIX: &str = "gemini_navigator_cache_";
/// Key prefix for Pokemon details
pub const POKEMON_PREFIX: &str = "pokemon_cache_";
/// Key prefix for ability details
pub const ABILITY_PREFIX: &str = "ability_cache_";
/// Key prefix for move details
pub const MOVE_PREFIX: &str = "move_cache_";

const CACHE_PREFIXES: [&str; 5] = [
    LOCATION_PREFIX,
    GUIDANCE_PREFIX,
    POKEMON_PREFIX,
    ABILITY_PREFIX,
    MOVE_PREFIX,
];

/// Shape version of a cached payload
///
/// Bump `SCHEMA_VERSION` whenever the serialized shape of a type changes;
/// entries written under another version are discarded and refetched.
pub trait Versioned {
    const SCHEMA_VERSION: u32;
}

impl Versioned for String {
    const SCHEMA_VERSION: u32 = 1;
}

/// Wrapper struct for cached data stored in the key-value store
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the data was cached, in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Schema version of `data`; entries from before versioning read as 0
    #[serde(default)]
    pub version: u32,
    /// The cached data
    pub data: T,
}

/// Reads and writes cached API responses
///
/// Cloning is cheap: clones share the same underlying store.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CacheManager {
    /// Creates a cache over `store` with the default 24 hour TTL
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Overrides the time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads a fresh entry for `key`
    ///
    /// Returns `None` when the key is absent, unreadable, expired, written
    /// under another schema version, or no longer decodes as `T`. In every
    /// case but absence the entry is deleted so the next write starts clean.
    pub fn get<T: DeserializeOwned + Versioned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// Same as [`CacheManager::get`] with an explicit clock
    pub fn get_at<T: DeserializeOwned + Versioned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading cache entry {}: {}", key, e);
                return None;
            }
        };

        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding corrupt cache entry {}: {}", key, e);
                self.remove(key);
                return None;
            }
        };

        let age = now.timestamp_millis() - entry.timestamp;
        if age > self.ttl.num_milliseconds() {
            debug!("Cache entry {} expired", key);
            self.remove(key);
            return None;
        }

        if entry.version != T::SCHEMA_VERSION {
            debug!(
                "Cache entry {} has schema version {}, expected {}; discarding",
                key,
                entry.version,
                T::SCHEMA_VERSION
            );
            self.remove(key);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.remove(key);
                None
            }
        }
    }

    /// Writes `data` under `key` with a fresh timestamp
    pub fn set<T: Serialize + Versioned>(&self, key: &str, data: &T) {
        self.set_at(key, data, Utc::now());
    }

    /// Same as [`CacheManager::set`] with an explicit timestamp
    pub fn set_at<T: Serialize + Versioned>(&self, key: &str, data: &T, now: DateTime<Utc>) {
        let entry = CacheEntry {
            timestamp: now.timestamp_millis(),
            version: T::SCHEMA_VERSION,
            data,
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!("Error serializing cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &json) {
            warn!("Error saving cache entry {}: {}", key, e);
        }
    }

    /// Deletes a single entry
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("Error removing cache entry {}: {}", key, e);
        }
    }

    /// Deletes every cached API response, leaving other persisted state alone
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Error listing cache entries: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys
            .iter()
            .filter(|key| CACHE_PREFIXES.iter().any(|prefix| key.starts_with(prefix)))
        {
            self.remove(key);
            removed += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{FileStore, MemoryStore};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    impl Versioned for TestData {
        const SCHEMA_VERSION: u32 = 3;
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OtherShape {
        id: u32,
    }

    impl Versioned for OtherShape {
        const SCHEMA_VERSION: u32 = 3;
    }

    fn create_test_cache() -> (CacheManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheManager::new(store.clone());
        (cache, store)
    }

    fn sample() -> TestData {
        TestData {
            name: "raichu-alola".to_string(),
            value: 26,
        }
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (cache, _store) = create_test_cache();
        let result: Option<TestData> = cache.get("pokemon_cache_missing");
        assert!(result.is_none());
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let (cache, _store) = create_test_cache();
        cache.set("pokemon_cache_raichu-alola", &sample());

        let result: Option<TestData> = cache.get("pokemon_cache_raichu-alola");
        assert_eq!(result, Some(sample()));
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let (cache, _store) = create_test_cache();
        cache.set("key", &sample());
        let newer = TestData {
            name: "second".to_string(),
            value: 2,
        };
        cache.set("key", &newer);

        assert_eq!(cache.get::<TestData>("key"), Some(newer));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let (cache, store) = create_test_cache();
        let written_at = Utc::now();
        cache.set_at("key", &sample(), written_at);

        let later = written_at + Duration::hours(DEFAULT_TTL_HOURS) + Duration::milliseconds(1);
        let result: Option<TestData> = cache.get_at("key", later);

        assert!(result.is_none());
        assert!(store.get("key").unwrap().is_none(), "expired key should be deleted");
    }

    #[test]
    fn test_entry_at_exact_ttl_is_still_fresh() {
        let (cache, _store) = create_test_cache();
        let written_at = Utc::now();
        cache.set_at("key", &sample(), written_at);

        let boundary = written_at + Duration::hours(DEFAULT_TTL_HOURS);
        assert_eq!(cache.get_at::<TestData>("key", boundary), Some(sample()));
    }

    #[test]
    fn test_custom_ttl() {
        let (cache, _store) = create_test_cache();
        let cache = cache.with_ttl(Duration::minutes(5));
        let written_at = Utc::now();
        cache.set_at("key", &sample(), written_at);

        assert!(cache
            .get_at::<TestData>("key", written_at + Duration::minutes(6))
            .is_none());
    }

    #[test]
    fn test_schema_version_mismatch_discards_entry() {
        let (cache, store) = create_test_cache();
        let stale = format!(
            r#"{{"timestamp":{},"version":2,"data":{{"name":"old","value":1}}}}"#,
            Utc::now().timestamp_millis()
        );
        store.set("key", &stale).unwrap();

        assert!(cache.get::<TestData>("key").is_none());
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_unversioned_legacy_entry_is_discarded() {
        let (cache, store) = create_test_cache();
        let legacy = format!(
            r#"{{"timestamp":{},"data":{{"name":"old","value":1}}}}"#,
            Utc::now().timestamp_millis()
        );
        store.set("key", &legacy).unwrap();

        assert!(cache.get::<TestData>("key").is_none());
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_removed() {
        let (cache, store) = create_test_cache();
        store.set("key", "{not json").unwrap();

        assert!(cache.get::<TestData>("key").is_none());
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let (cache, store) = create_test_cache();
        cache.set("key", &sample());

        assert!(cache.get::<OtherShape>("key").is_none());
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_clear_only_removes_cache_prefixes() {
        let (cache, store) = create_test_cache();
        cache.set("pokemon_cache_pikachu", &sample());
        cache.set("gemini_cache_route_1", &sample());
        cache.set("move_cache_tackle", &sample());
        store.set("nuzlocke-team", "[]").unwrap();

        assert_eq!(cache.clear(), 3);
        assert_eq!(store.keys().unwrap(), vec!["nuzlocke-team"]);
    }

    #[test]
    fn test_file_backed_cache_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf()));
        let cache = CacheManager::new(store);

        cache.set("ability_cache_static", &sample());
        assert_eq!(cache.get::<TestData>("ability_cache_static"), Some(sample()));
        assert!(temp_dir.path().join("ability_cache_static.json").exists());
    }

    #[test]
    fn test_file_backed_guidance_prompts_do_not_collide() {
        use crate::data::GeminiClient;

        let temp_dir = TempDir::new().unwrap();
        let cache = CacheManager::new(Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf())));

        let apostrophe = GeminiClient::guidance_cache_key("what's best vs Hala");
        let spaced = GeminiClient::guidance_cache_key("what s best vs Hala");
        cache.set(&apostrophe, &"answer for what's".to_string());
        assert_eq!(cache.get::<String>(&spaced), None);

        let question = GeminiClient::guidance_cache_key("Is Rowlet good?");
        let exclamation = GeminiClient::guidance_cache_key("Is Rowlet good!");
        cache.set(&question, &"question".to_string());
        cache.set(&exclamation, &"exclamation".to_string());
        assert_eq!(cache.get::<String>(&question).as_deref(), Some("question"));
        assert_eq!(cache.get::<String>(&exclamation).as_deref(), Some("exclamation"));
        assert_eq!(
            cache.get::<String>(&apostrophe).as_deref(),
            Some("answer for what's")
        );
    }

    #[test]
    fn test_unwritable_store_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A directory path that is actually a file cannot be created
        let store = Arc::new(FileStore::with_dir(blocker.join("cache")));
        let cache = CacheManager::new(store);

        cache.set("key", &sample());
        assert!(cache.get::<TestData>("key").is_none());
    }
}
