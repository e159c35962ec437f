use async_trait::async_trait;
use common::{AddressId, SkuId, UserId};
use domain::{Address, Money, OrderHeader, OrderId, OrderLine, OrderStatus, Sku};

use crate::Result;

/// Read-only SKU lookup used by the cart and checkout previews.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the SKU with its current price and stock, if it exists.
    async fn find_sku(&self, sku_id: SkuId) -> Result<Option<Sku>>;
}

/// Read-only view of the users' address books.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Returns the address only if it exists and belongs to `user_id`.
    async fn find_address(&self, user_id: UserId, address_id: AddressId)
    -> Result<Option<Address>>;

    /// Returns every address of a user, default address first.
    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>>;
}

/// A single atomic unit of work.
///
/// Every mutation is staged until [`UnitOfWork::commit`]; dropping the unit
/// or calling [`UnitOfWork::rollback`] discards all of them. Rows read through
/// the `lock_*` methods stay exclusively locked until the unit ends, so two
/// concurrent units cannot both observe the same stock level.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Inserts a new order header.
    async fn insert_order(&mut self, order: &OrderHeader) -> Result<()>;

    /// Reads a SKU and locks it for the rest of the unit.
    async fn lock_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>>;

    /// Inserts one order line.
    async fn insert_line(&mut self, line: &OrderLine) -> Result<()>;

    /// Moves `count` units from stock to sales.
    async fn record_sale(&mut self, sku_id: SkuId, count: u32) -> Result<()>;

    /// Writes the final totals of an order.
    async fn finalize_order(
        &mut self,
        order_id: &OrderId,
        total_count: u32,
        total_price: Money,
    ) -> Result<()>;

    /// Reads an order header and locks it for the rest of the unit.
    async fn lock_order(&mut self, order_id: &OrderId) -> Result<Option<OrderHeader>>;

    /// Reads every line of an order as seen by this unit.
    async fn lines(&mut self, order_id: &OrderId) -> Result<Vec<OrderLine>>;

    /// Sets the buyer comment on a line. Returns false if no such line exists.
    async fn set_comment(&mut self, order_id: &OrderId, sku_id: SkuId, comment: &str)
    -> Result<bool>;

    /// Updates order status, and the trade reference when one is given.
    async fn set_status(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
        trade_no: Option<&str>,
    ) -> Result<()>;

    /// Makes every staged write durable.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every staged write.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Durable order storage.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Returns an order header without locking it.
    async fn find_order(&self, order_id: &OrderId) -> Result<Option<OrderHeader>>;

    /// Returns the lines of an order ordered by SKU id.
    async fn order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>>;

    /// Returns every order of a user, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>>;
}
