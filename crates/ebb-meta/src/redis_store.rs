//! [`RedisMetaStore`]: one Redis hash per object id.

use std::collections::HashMap;
use std::sync::Mutex;

use ebb_types::{Metadata, ObjectId};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use crate::error::MetaError;
use crate::traits::{KeyTtl, MetadataStore};

type Result<T> = std::result::Result<T, MetaError>;

/// Metadata store backed by Redis.
///
/// The [`ConnectionManager`] is cloned per call; clones share one
/// multiplexed connection that reconnects on its own after a drop.
pub struct RedisMetaStore {
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisMetaStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| MetaError::Unavailable(format!("invalid redis url {url}: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;
        debug!(url, "connected to redis");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn conn(&self) -> Result<ConnectionManager> {
        self.conn
            .lock()
            .expect("lock poisoned")
            .clone()
            .ok_or(MetaError::Closed)
    }
}

/// Connection-level failures mean the server is unreachable; anything else
/// is a command error.
fn redis_err(e: redis::RedisError) -> MetaError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        MetaError::Unavailable(e.to_string())
    } else {
        MetaError::Redis(e)
    }
}

#[async_trait::async_trait]
impl MetadataStore for RedisMetaStore {
    async fn exists(&self, id: &ObjectId) -> Result<bool> {
        let mut conn = self.conn()?;
        conn.exists(id.as_str()).await.map_err(redis_err)
    }

    async fn ttl(&self, id: &ObjectId) -> Result<KeyTtl> {
        let mut conn = self.conn()?;
        let raw: i64 = conn.ttl(id.as_str()).await.map_err(redis_err)?;
        Ok(KeyTtl::from_redis(raw))
    }

    async fn hash_set(&self, id: &ObjectId, fields: &Metadata) -> Result<()> {
        // HSET needs at least one pair.
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let pairs: Vec<(&str, &str)> = fields.iter().collect();
        let _: () = conn
            .hset_multiple(id.as_str(), pairs.as_slice())
            .await
            .map_err(redis_err)?;
        debug!(%id, fields = pairs.len(), "stored metadata fields");
        Ok(())
    }

    async fn hash_set_field(&self, id: &ObjectId, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let _: () = conn
            .hset(id.as_str(), field, value)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn hash_get_field(&self, id: &ObjectId, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        conn.hget(id.as_str(), field).await.map_err(redis_err)
    }

    async fn hash_get_all(&self, id: &ObjectId) -> Result<Metadata> {
        let mut conn = self.conn()?;
        let all: HashMap<String, String> = conn.hgetall(id.as_str()).await.map_err(redis_err)?;
        Ok(all.into_iter().collect())
    }

    async fn expire(&self, id: &ObjectId, seconds: u64) -> Result<()> {
        let mut conn = self.conn()?;
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let _: () = conn
            .expire(id.as_str(), seconds)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        let mut conn = self.conn()?;
        let _: () = conn.del(id.as_str()).await.map_err(redis_err)?;
        debug!(%id, "deleted metadata record");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn quit(&self) -> Result<()> {
        let taken = self.conn.lock().expect("lock poisoned").take();
        if let Some(mut conn) = taken {
            // Best effort: the server may already be gone.
            let reply: redis::RedisResult<()> = redis::cmd("QUIT").query_async(&mut conn).await;
            if let Err(e) = reply {
                warn!(error = %e, "redis QUIT failed");
            }
            debug!("released redis connection");
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
