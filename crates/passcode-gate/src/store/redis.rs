//! Redis-backed store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use super::{Expiry, KvStore, StoreError, StoreOp, ttl_secs};

/// Check-then-increment in one round trip. Returns -1 at the cap.
const CAPPED_INCR_LUA: &str = r#"
local raw = redis.call('GET', KEYS[1])
local current = 0
if raw then
  current = tonumber(raw)
  if not current then
    return redis.error_reply('ERR counter is not an integer')
  end
end
if current >= tonumber(ARGV[1]) then
  return -1
end
local next = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[2])
return next
"#;

/// Deletes KEYS[1..] only while KEYS[1] holds ARGV[1]. Returns 1 when deleted.
const DEL_IF_EQ_LUA: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('DEL', unpack(KEYS))
  return 1
end
return 0
"#;

/// Store over an auto-reconnecting Redis connection
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    capped_incr: Script,
    del_if_eq: Script,
}

impl RedisStore {
    /// Connect with a connection manager (handles reconnection)
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            capped_incr: Script::new(CAPPED_INCR_LUA),
            del_if_eq: Script::new(DEL_IF_EQ_LUA),
        })
    }

    /// Shared connection, for collaborators that also talk to Redis
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Expiry>, StoreError> {
        let mut conn = self.conn.clone();
        let millis: i64 = conn.pttl(key).await?;
        Ok(expiry_from_pttl(millis))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(keys).await?;
        Ok(())
    }

    async fn del_if_eq(
        &self,
        key: &str,
        expected: &str,
        also: &[String],
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.del_if_eq.key(key);
        for extra in also {
            invocation.key(extra);
        }
        let deleted: i64 = invocation.arg(expected).invoke_async(&mut conn).await?;
        Ok(deleted == 1)
    }

    async fn incr_capped(
        &self,
        key: &str,
        cap: u64,
        ttl: Duration,
    ) -> Result<Option<u64>, StoreError> {
        let mut conn = self.conn.clone();
        let next: i64 = self
            .capped_incr
            .key(key)
            .arg(cap)
            .arg(ttl_secs(ttl))
            .invoke_async(&mut conn)
            .await?;

        Ok(u64::try_from(next).ok())
    }

    async fn apply(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in ops {
            match op {
                StoreOp::Set { key, value, ttl } => {
                    pipe.set_ex(key, value, ttl_secs(*ttl)).ignore();
                }
                StoreOp::Del(keys) if !keys.is_empty() => {
                    pipe.del(keys).ignore();
                }
                StoreOp::Del(_) => {}
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// PTTL reply: -2 no such key, -1 no expiry, otherwise milliseconds left
fn expiry_from_pttl(millis: i64) -> Option<Expiry> {
    match millis {
        -2 => None,
        m if m < 0 => Some(Expiry::Persistent),
        m => Some(Expiry::In(Duration::from_millis(m as u64))),
    }
}
