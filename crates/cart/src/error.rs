use common::{ErrorKind, SkuId};
use store::StoreError;
use thiserror::Error;

/// Errors raised by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The quantity was not a positive integer.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The SKU does not exist.
    #[error("SKU not found: {0}")]
    SkuNotFound(SkuId),

    /// The requested quantity is more than the SKU has in stock.
    #[error("Stock exceeded for SKU {sku_id}: requested {requested}, available {available}")]
    StockExceeded {
        sku_id: SkuId,
        requested: u32,
        available: u32,
    },

    /// The cart backend is unavailable.
    #[error("Cart backend unavailable: {0}")]
    Unavailable(String),

    /// The Redis backend failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] StoreError),
}

impl CartError {
    /// Returns the coarse error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::InvalidQuantity(_) => ErrorKind::Validation,
            CartError::SkuNotFound(_) => ErrorKind::NotFound,
            CartError::StockExceeded { .. } => ErrorKind::StockConflict,
            CartError::Unavailable(_) | CartError::Redis(_) | CartError::Catalog(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CartError::InvalidQuantity(_) => "invalid_quantity",
            CartError::SkuNotFound(_) => "sku_not_found",
            CartError::StockExceeded { .. } => "stock_exceeded",
            CartError::Unavailable(_) | CartError::Redis(_) => "cart_backend",
            CartError::Catalog(_) => "catalog",
        }
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
