use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::{CappedAppend, KeyTtl, Store};
use crate::shared::AppError;

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory implementation of Store for development and testing
///
/// An expired key is dropped the next time anything touches it, and every
/// write also reclaims all other expired keys, so rooms that are never
/// visited again do not accumulate. Time comes from the tokio clock, so tests can pause and advance it.
/// Data is lost when the application restarts.
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of live keys (useful for debugging)
    pub async fn key_count(&self) -> usize {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);
        entries.len()
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>) {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));

    let reclaimed = before - entries.len();
    if reclaimed > 0 {
        debug!(reclaimed, "Expired keys reclaimed in memory");
    }
}

/// Looks up a live entry, dropping it first if it has expired
fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        debug!(key = %key, "Key expired in memory");
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn remaining(entry: &Entry) -> KeyTtl {
    match entry.expires_at {
        Some(at) => KeyTtl::Remaining(at.saturating_duration_since(Instant::now())),
        None => KeyTtl::Persistent,
    }
}

fn wrong_type(key: &str) -> AppError {
    warn!(key = %key, "Operation against a key holding the wrong kind of value");
    AppError::Store(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

#[async_trait]
impl Store for InMemoryStore {
    #[instrument(skip(self, fields))]
    async fn hset_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Duration,
    ) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);
        let expires_at = Some(Instant::now() + ttl);

        match live(&mut entries, key) {
            Some(entry) => {
                let Value::Hash(hash) = &mut entry.value else {
                    return Err(wrong_type(key));
                };
                for (field, value) in fields {
                    hash.insert(field.to_string(), value.clone());
                }
                entry.expires_at = expires_at;
            }
            None => {
                let hash = fields
                    .iter()
                    .map(|(field, value)| (field.to_string(), value.clone()))
                    .collect();
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Hash(hash),
                        expires_at,
                    },
                );
            }
        }

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Hash written in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn hgetall(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError> {
        let mut entries = self.entries.lock().await;

        match live(&mut entries, key) {
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(Some(hash.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, member))]
    async fn append_capped(
        &self,
        key: &str,
        field: &str,
        member: &str,
        cap: usize,
    ) -> Result<CappedAppend, AppError> {
        // The whole read-modify-write happens under one lock
        let mut entries = self.entries.lock().await;

        let Some(entry) = live(&mut entries, key) else {
            return Ok(CappedAppend::Missing);
        };
        let Value::Hash(hash) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        let mut members: Vec<String> = match hash.get(field) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                warn!(key = %key, field = %field, error = %e, "Field is not a JSON array");
                AppError::Store(format!("Field {field} is not a JSON array: {e}"))
            })?,
            None => Vec::new(),
        };

        if members.iter().any(|m| m == member) {
            return Ok(CappedAppend::AlreadyPresent);
        }
        if members.len() >= cap {
            return Ok(CappedAppend::Full);
        }

        members.push(member.to_string());
        let encoded = serde_json::to_string(&members).map_err(|e| {
            warn!(error = %e, "Failed to encode member array");
            AppError::Internal
        })?;
        hash.insert(field.to_string(), encoded);

        debug!(key = %key, len = members.len(), "Member appended in memory");
        Ok(CappedAppend::Appended { len: members.len() })
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    #[instrument(skip(self, value))]
    async fn rpush(&self, key: &str, value: String) -> Result<usize, AppError> {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);

        match live(&mut entries, key) {
            Some(entry) => {
                let Value::List(list) = &mut entry.value else {
                    return Err(wrong_type(key));
                };
                list.push(value);
                Ok(list.len())
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::List(vec![value]),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    #[instrument(skip(self))]
    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut entries = self.entries.lock().await;

        match live(&mut entries, key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(list.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self))]
    async fn ttl(&self, key: &str) -> Result<KeyTtl, AppError> {
        let mut entries = self.entries.lock().await;

        Ok(live(&mut entries, key)
            .map(|entry| remaining(entry))
            .unwrap_or(KeyTtl::Missing))
    }

    #[instrument(skip(self))]
    async fn copy_ttl(&self, source: &str, targets: &[&str]) -> Result<KeyTtl, AppError> {
        let mut entries = self.entries.lock().await;

        let (ttl, expires_at) = match live(&mut entries, source) {
            Some(entry) => (remaining(entry), entry.expires_at),
            None => (KeyTtl::Missing, None),
        };

        for target in targets {
            match ttl {
                KeyTtl::Missing => {
                    entries.remove(*target);
                }
                KeyTtl::Persistent => {}
                KeyTtl::Remaining(_) => {
                    if let Some(entry) = live(&mut entries, target) {
                        entry.expires_at = expires_at;
                    }
                }
            }
        }

        debug!(source = %source, ttl = ?ttl, "TTL copied in memory");
        Ok(ttl)
    }
}
