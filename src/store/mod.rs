// Key-value store capability
//
// All durable state lives behind this trait. The in-memory implementation is
// used for development and tests, the Redis implementation in production.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::shared::AppError;

pub use memory::InMemoryStore;
pub use redis_store::RedisStore;

pub mod memory;
mod lua_scripts;
pub mod redis_store;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (never existed or already expired)
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after the given duration
    Remaining(Duration),
}

impl KeyTtl {
    /// Remaining lifetime in whole seconds, rounded up so a live key never reports 0
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            KeyTtl::Remaining(d) => Some(d.as_millis().div_ceil(1000) as u64),
            _ => None,
        }
    }
}

/// Result of an atomic capped append to a JSON-array hash field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CappedAppend {
    /// Member appended, `len` is the new array length
    Appended { len: usize },
    /// Member was already present, nothing changed
    AlreadyPresent,
    /// Array already holds `cap` members, nothing changed
    Full,
    /// Hash key does not exist
    Missing,
}

/// Trait for key-value store operations
#[async_trait]
pub trait Store: Send + Sync {
    /// Writes hash fields and sets the key's TTL in one atomic step
    async fn hset_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Duration,
    ) -> Result<(), AppError>;

    /// Returns all hash fields, or None when the key is missing
    async fn hgetall(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError>;

    /// Atomically appends `member` to the JSON array in `field` unless it is
    /// already present or the array already holds `cap` members
    async fn append_capped(
        &self,
        key: &str,
        field: &str,
        member: &str,
        cap: usize,
    ) -> Result<CappedAppend, AppError>;

    async fn exists(&self, key: &str) -> Result<bool, AppError>;

    /// Appends to the tail of a list, returning the new length
    async fn rpush(&self, key: &str, value: String) -> Result<usize, AppError>;

    /// Returns the whole list, empty when the key is missing
    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl, AppError>;

    /// Reads the remaining TTL of `source` and applies it to every target
    /// atomically. A missing source deletes the targets; a persistent source
    /// leaves them untouched.
    async fn copy_ttl(&self, source: &str, targets: &[&str]) -> Result<KeyTtl, AppError>;
}
