use std::collections::HashMap;

use async_trait::async_trait;
use common::{SkuId, UserId};
use redis::{AsyncCommands, aio::MultiplexedConnection};

use crate::{Result, store::CartStore};

/// Cart store keeping each cart in a Redis hash named `cart_{user_id}`.
///
/// Fields are SKU ids and values are quantities, both as decimal strings.
/// Fields that do not parse are skipped on read, logged and deleted.
#[derive(Clone)]
pub struct RedisCartStore {
    conn: MultiplexedConnection,
}

impl RedisCartStore {
    /// Wraps an existing multiplexed connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Opens a multiplexed connection to the given Redis URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(conn))
    }

    /// Sends a PING, used by startup checks.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn key(user_id: UserId) -> String {
        format!("cart_{user_id}")
    }
}

fn parse_count(user_id: UserId, field: &str, raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(count) => Some(count),
        Err(_) => {
            tracing::warn!(%user_id, sku = field, value = raw, "unparsable cart quantity");
            None
        }
    }
}

#[async_trait]
impl CartStore for RedisCartStore {
    async fn quantity(&self, user_id: UserId, sku_id: SkuId) -> Result<Option<u32>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(Self::key(user_id), sku_id.as_i64()).await?;
        Ok(raw.and_then(|raw| parse_count(user_id, &sku_id.to_string(), &raw)))
    }

    async fn set_quantity(&self, user_id: UserId, sku_id: SkuId, count: u32) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(Self::key(user_id), sku_id.as_i64(), count)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: UserId, sku_ids: &[SkuId]) -> Result<()> {
        if sku_ids.is_empty() {
            return Ok(());
        }
        let fields: Vec<i64> = sku_ids.iter().map(SkuId::as_i64).collect();
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(Self::key(user_id), fields).await?;
        Ok(())
    }

    async fn entries(&self, user_id: UserId) -> Result<Vec<(SkuId, u32)>> {
        let key = Self::key(user_id);
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(&key).await?;

        let mut entries = Vec::with_capacity(raw.len());
        let mut unreadable = Vec::new();
        for (field, value) in &raw {
            let Ok(sku_id) = field.parse::<SkuId>() else {
                tracing::warn!(%user_id, sku = %field, "unparsable cart sku id");
                unreadable.push(field.as_str());
                continue;
            };
            match parse_count(user_id, field, value) {
                Some(count) => entries.push((sku_id, count)),
                None => unreadable.push(field.as_str()),
            }
        }

        if !unreadable.is_empty() {
            let pruned: redis::RedisResult<()> = conn.hdel(&key, &unreadable).await;
            if let Err(e) = pruned {
                tracing::warn!(%user_id, error = %e, "failed to prune unreadable cart fields");
            }
        }

        entries.sort_by_key(|(sku_id, _)| *sku_id);
        Ok(entries)
    }

    async fn distinct_items(&self, user_id: UserId) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.hlen(Self::key(user_id)).await?;
        Ok(len)
    }
}
