//! Cache module for persisting API responses and app state
//!
//! `store` provides the key-value blob storage that replaces browser local
//! storage. `manager` layers timestamped, versioned cache entries with a TTL on
//! top of it; stale or old-shaped entries are discarded and refetched.

mod manager;
pub mod store;

pub use manager::{
    CacheEntry, CacheManager, Versioned, ABILITY_PREFIX, DEFAULT_TTL_HOURS, GUIDANCE_PREFIX,
    LOCATION_PREFIX, MOVE_PREFIX, POKEMON_PREFIX,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
