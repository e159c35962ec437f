use async_trait::async_trait;
use common::{SkuId, UserId};

use crate::Result;

/// Raw per-user cart storage.
///
/// Implementations only promise atomic updates of a single entry; two
/// concurrent writers to the same entry resolve as last-write-wins.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the quantity held for a SKU, if any.
    async fn quantity(&self, user_id: UserId, sku_id: SkuId) -> Result<Option<u32>>;

    /// Sets the quantity held for a SKU, replacing any previous value.
    async fn set_quantity(&self, user_id: UserId, sku_id: SkuId, count: u32) -> Result<()>;

    /// Removes the given SKUs from the cart. Missing entries are ignored.
    async fn remove(&self, user_id: UserId, sku_ids: &[SkuId]) -> Result<()>;

    /// Returns every entry ordered by SKU id.
    async fn entries(&self, user_id: UserId) -> Result<Vec<(SkuId, u32)>>;

    /// Returns the number of distinct SKUs in the cart.
    async fn distinct_items(&self, user_id: UserId) -> Result<usize>;
}
