use common::SkuId;
use domain::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this id already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order already has a line for this SKU.
    #[error("Order {order_id} already has a line for SKU {sku_id}")]
    DuplicateLine { order_id: OrderId, sku_id: SkuId },

    /// A row expected inside the current unit of work is missing.
    #[error("Missing {entity}: {id}")]
    Missing { entity: &'static str, id: String },

    /// A stock decrement would drive stock below zero.
    #[error("Stock underflow for SKU {sku_id}: requested {requested}, available {available}")]
    StockUnderflow {
        sku_id: SkuId,
        requested: u32,
        available: u32,
    },

    /// A stored row could not be mapped to a domain type.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// A failure injected through the in-memory store.
    #[error("Injected failure at {0}")]
    Injected(&'static str),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
