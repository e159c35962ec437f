use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{SkuId, UserId};

use crate::{CartError, Result, store::CartStore};

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, BTreeMap<SkuId, u32>>,
    fail_on_remove: bool,
}

/// In-memory cart store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every `remove` call.
    pub fn set_fail_on_remove(&self, fail: bool) {
        self.state.write().unwrap().fail_on_remove = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn quantity(&self, user_id: UserId, sku_id: SkuId) -> Result<Option<u32>> {
        let state = self.state.read().unwrap();
        Ok(state
            .carts
            .get(&user_id)
            .and_then(|cart| cart.get(&sku_id).copied()))
    }

    async fn set_quantity(&self, user_id: UserId, sku_id: SkuId, count: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.carts.entry(user_id).or_default().insert(sku_id, count);
        Ok(())
    }

    async fn remove(&self, user_id: UserId, sku_ids: &[SkuId]) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_remove {
            return Err(CartError::Unavailable("simulated remove failure".to_string()));
        }
        if let Some(cart) = state.carts.get_mut(&user_id) {
            for sku_id in sku_ids {
                cart.remove(sku_id);
            }
        }
        Ok(())
    }

    async fn entries(&self, user_id: UserId) -> Result<Vec<(SkuId, u32)>> {
        let state = self.state.read().unwrap();
        Ok(state
            .carts
            .get(&user_id)
            .map(|cart| cart.iter().map(|(sku, count)| (*sku, *count)).collect())
            .unwrap_or_default())
    }

    async fn distinct_items(&self, user_id: UserId) -> Result<usize> {
        let state = self.state.read().unwrap();
        Ok(state.carts.get(&user_id).map_or(0, BTreeMap::len))
    }
}
