use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{AddressId, SkuId, UserId};
use domain::{Address, Money, OrderHeader, OrderId, OrderLine, OrderStatus, Sku};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{AddressBook, Catalog, OrderStore, UnitOfWork},
};

/// Point inside a unit of work where the in-memory store can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `insert_line` returns an error.
    InsertLine,
    /// `finalize_order` returns an error.
    FinalizeOrder,
    /// `commit` returns an error.
    Commit,
}

impl FailurePoint {
    fn as_str(&self) -> &'static str {
        match self {
            FailurePoint::InsertLine => "insert_line",
            FailurePoint::FinalizeOrder => "finalize_order",
            FailurePoint::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    skus: HashMap<SkuId, Sku>,
    addresses: HashMap<AddressId, Address>,
    orders: HashMap<OrderId, OrderHeader>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
}

/// In-memory store implementation for tests and local runs.
///
/// A unit of work holds the store's single lock from `begin` until it ends
/// and edits a private copy of the state; `commit` swaps the copy in. Units
/// are therefore fully serialized, which is a coarser form of the row locks
/// the PostgreSQL store takes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failure: Arc<RwLock<Option<FailurePoint>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a SKU.
    pub async fn insert_sku(&self, sku: Sku) {
        self.state.lock().await.skus.insert(sku.id, sku);
    }

    /// Inserts or replaces an address.
    pub async fn insert_address(&self, address: Address) {
        self.state
            .lock()
            .await
            .addresses
            .insert(address.id, address);
    }

    /// Removes a SKU from the catalog.
    pub async fn remove_sku(&self, sku_id: SkuId) {
        self.state.lock().await.skus.remove(&sku_id);
    }

    /// Makes every unit of work fail at `point` until cleared with `None`.
    pub fn set_failure(&self, point: Option<FailurePoint>) {
        *self.failure.write().unwrap() = point;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of stored order lines.
    pub async fn line_count(&self) -> usize {
        self.state.lock().await.lines.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn find_sku(&self, sku_id: SkuId) -> Result<Option<Sku>> {
        Ok(self.state.lock().await.skus.get(&sku_id).cloned())
    }
}

#[async_trait]
impl AddressBook for InMemoryStore {
    async fn find_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>> {
        let state = self.state.lock().await;
        Ok(state
            .addresses
            .get(&address_id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>> {
        let state = self.state.lock().await;
        let mut addresses: Vec<_> = state
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.id.cmp(&b.id)));
        Ok(addresses)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        let failure = *self.failure.read().unwrap();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            failure,
        }))
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<OrderHeader>> {
        Ok(self.state.lock().await.orders.get(order_id).cloned())
    }

    async fn order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>> {
        let state = self.state.lock().await;
        let mut lines = state.lines.get(order_id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.sku_id);
        Ok(lines)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    failure: Option<FailurePoint>,
}

impl MemoryUnitOfWork {
    fn fail_at(&self, point: FailurePoint) -> Result<()> {
        if self.failure == Some(point) {
            return Err(StoreError::Injected(point.as_str()));
        }
        Ok(())
    }

    fn order_mut(&mut self, order_id: &OrderId) -> Result<&mut OrderHeader> {
        self.staged
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::Missing {
                entity: "order",
                id: order_id.to_string(),
            })
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_order(&mut self, order: &OrderHeader) -> Result<()> {
        if self.staged.orders.contains_key(&order.order_id) {
            return Err(StoreError::DuplicateOrder(order.order_id.clone()));
        }
        self.staged
            .orders
            .insert(order.order_id.clone(), order.clone());
        Ok(())
    }

    async fn lock_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>> {
        Ok(self.staged.skus.get(&sku_id).cloned())
    }

    async fn insert_line(&mut self, line: &OrderLine) -> Result<()> {
        self.fail_at(FailurePoint::InsertLine)?;
        if !self.staged.orders.contains_key(&line.order_id) {
            return Err(StoreError::Missing {
                entity: "order",
                id: line.order_id.to_string(),
            });
        }
        let lines = self.staged.lines.entry(line.order_id.clone()).or_default();
        if lines.iter().any(|l| l.sku_id == line.sku_id) {
            return Err(StoreError::DuplicateLine {
                order_id: line.order_id.clone(),
                sku_id: line.sku_id,
            });
        }
        lines.push(line.clone());
        Ok(())
    }

    async fn record_sale(&mut self, sku_id: SkuId, count: u32) -> Result<()> {
        let sku = self
            .staged
            .skus
            .get_mut(&sku_id)
            .ok_or_else(|| StoreError::Missing {
                entity: "sku",
                id: sku_id.to_string(),
            })?;
        if count > sku.stock {
            return Err(StoreError::StockUnderflow {
                sku_id,
                requested: count,
                available: sku.stock,
            });
        }
        sku.sales = sku
            .sales
            .checked_add(count)
            .ok_or_else(|| StoreError::InvalidRow(format!("sales overflow for SKU {sku_id}")))?;
        sku.stock -= count;
        Ok(())
    }

    async fn finalize_order(
        &mut self,
        order_id: &OrderId,
        total_count: u32,
        total_price: Money,
    ) -> Result<()> {
        self.fail_at(FailurePoint::FinalizeOrder)?;
        let order = self.order_mut(order_id)?;
        order.total_count = total_count;
        order.total_price = total_price;
        Ok(())
    }

    async fn lock_order(&mut self, order_id: &OrderId) -> Result<Option<OrderHeader>> {
        Ok(self.staged.orders.get(order_id).cloned())
    }

    async fn lines(&mut self, order_id: &OrderId) -> Result<Vec<OrderLine>> {
        let mut lines = self.staged.lines.get(order_id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.sku_id);
        Ok(lines)
    }

    async fn set_comment(
        &mut self,
        order_id: &OrderId,
        sku_id: SkuId,
        comment: &str,
    ) -> Result<bool> {
        let line = self
            .staged
            .lines
            .get_mut(order_id)
            .and_then(|lines| lines.iter_mut().find(|l| l.sku_id == sku_id));
        match line {
            Some(line) => {
                line.comment = Some(comment.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_status(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
        trade_no: Option<&str>,
    ) -> Result<()> {
        let order = self.order_mut(order_id)?;
        order.status = status;
        if let Some(trade_no) = trade_no {
            order.trade_no = Some(trade_no.to_string());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.fail_at(FailurePoint::Commit)?;
        let MemoryUnitOfWork {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
