//! Redis-backed store.
//!
//! The multiplexed connection is cheap to clone and safe to use concurrently,
//! so every operation clones it instead of locking. Each call is bounded by
//! the configured timeout; failures are reported once and never retried here.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult, Script};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::{lua_scripts, CappedAppend, KeyTtl, Store};
use crate::shared::AppError;

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    op_timeout: Duration,
    append_capped_script: Script,
    copy_ttl_script: Script,
}

impl RedisStore {
    /// Connects to Redis at `redis_url`
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, AppError> {
        let client = Client::open(redis_url).map_err(|e| {
            // The url may carry credentials, keep it out of the logs
            error!(error = %e, "Failed to open Redis client");
            AppError::Store(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                error!("Timed out connecting to Redis");
                AppError::Store("Timed out connecting to Redis".to_string())
            })?
            .map_err(|e| {
                error!(error = %e, "Failed to connect to Redis");
                AppError::Store(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self {
            connection,
            op_timeout,
            append_capped_script: Script::new(lua_scripts::APPEND_CAPPED),
            copy_ttl_script: Script::new(lua_scripts::COPY_TTL),
        })
    }

    /// Runs one Redis call under the operation timeout
    async fn bounded<T, F>(&self, op: &'static str, key: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op = op, key = %key, error = %e, "Redis operation failed");
                Err(AppError::Store(format!("{op} failed: {e}")))
            }
            Err(_) => {
                warn!(
                    op = op,
                    key = %key,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Redis operation timed out"
                );
                Err(AppError::Store(format!("{op} timed out")))
            }
        }
    }
}

fn ttl_from_millis(pttl: i64) -> KeyTtl {
    match pttl {
        -2 => KeyTtl::Missing,
        ms if ms < 0 => KeyTtl::Persistent,
        ms => KeyTtl::Remaining(Duration::from_millis(ms as u64)),
    }
}

#[async_trait]
impl Store for RedisStore {
    #[instrument(skip(self, fields))]
    async fn hset_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Duration,
    ) -> Result<(), AppError> {
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(key, fields)
            .ignore()
            .pexpire(key, ttl.as_millis() as i64)
            .ignore();

        let _: () = self
            .bounded("HSET+PEXPIRE", key, pipe.query_async(&mut conn))
            .await?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Hash written to Redis");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn hgetall(&self, key: &str) -> Result<Option<HashMap<String, String>>, AppError> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> =
            self.bounded("HGETALL", key, conn.hgetall(key)).await?;

        // Redis answers a missing hash with an empty one
        Ok((!fields.is_empty()).then_some(fields))
    }

    #[instrument(skip(self, member))]
    async fn append_capped(
        &self,
        key: &str,
        field: &str,
        member: &str,
        cap: usize,
    ) -> Result<CappedAppend, AppError> {
        let mut conn = self.connection.clone();
        let mut invocation = self.append_capped_script.key(key);
        invocation.arg(field).arg(member).arg(cap);

        let result: i64 = self
            .bounded("APPEND_CAPPED", key, invocation.invoke_async(&mut conn))
            .await?;

        let outcome = match result {
            -1 => CappedAppend::Missing,
            -2 => CappedAppend::Full,
            0 => CappedAppend::AlreadyPresent,
            len if len > 0 => CappedAppend::Appended { len: len as usize },
            other => {
                error!(key = %key, result = other, "Unexpected append script result");
                return Err(AppError::Store(format!(
                    "Unexpected append script result: {other}"
                )));
            }
        };

        debug!(key = %key, outcome = ?outcome, "Capped append executed");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.connection.clone();
        self.bounded("EXISTS", key, conn.exists(key)).await
    }

    #[instrument(skip(self, value))]
    async fn rpush(&self, key: &str, value: String) -> Result<usize, AppError> {
        let mut conn = self.connection.clone();
        self.bounded("RPUSH", key, conn.rpush(key, value)).await
    }

    #[instrument(skip(self))]
    async fn lrange(&self, key: &str) -> Result<Vec<String>, AppError> {
        let mut conn = self.connection.clone();
        self.bounded("LRANGE", key, conn.lrange(key, 0, -1)).await
    }

    #[instrument(skip(self))]
    async fn ttl(&self, key: &str) -> Result<KeyTtl, AppError> {
        let mut conn = self.connection.clone();
        let pttl: i64 = self.bounded("PTTL", key, conn.pttl(key)).await?;
        Ok(ttl_from_millis(pttl))
    }

    #[instrument(skip(self))]
    async fn copy_ttl(&self, source: &str, targets: &[&str]) -> Result<KeyTtl, AppError> {
        let mut conn = self.connection.clone();
        let mut invocation = self.copy_ttl_script.key(source);
        for target in targets {
            invocation.key(*target);
        }

        let pttl: i64 = self
            .bounded("COPY_TTL", source, invocation.invoke_async(&mut conn))
            .await?;

        let ttl = ttl_from_millis(pttl);
        debug!(source = %source, ttl = ?ttl, "TTL copied in Redis");
        Ok(ttl)
    }
}
