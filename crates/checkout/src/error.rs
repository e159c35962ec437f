use cart::CartError;
use common::{AddressId, ErrorKind, SkuId};
use domain::{OrderError, OrderId};
use store::StoreError;
use thiserror::Error;

/// Errors raised while settling an order.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// No SKUs were selected.
    #[error("Incomplete parameters: no SKUs selected")]
    IncompleteParameters,

    /// The payment method code is not supported.
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(i16),

    /// The address does not exist or belongs to another user.
    #[error("Invalid address: {0}")]
    InvalidAddress(AddressId),

    /// A selected SKU no longer exists.
    #[error("SKU not found: {0}")]
    SkuNotFound(SkuId),

    /// A selected SKU has less stock than the cart asks for.
    #[error("Insufficient stock for SKU {sku_id}: requested {requested}, available {available}")]
    InsufficientStock {
        sku_id: SkuId,
        requested: u32,
        available: u32,
    },

    /// The order could not be written; nothing was persisted.
    #[error("Order commit failed: {0}")]
    CommitFailed(String),

    /// A storage read outside the settlement transaction failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A cart read outside the settlement transaction failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

impl SettlementError {
    /// Returns the coarse error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::IncompleteParameters
            | SettlementError::InvalidPaymentMethod(_)
            | SettlementError::InvalidAddress(_) => ErrorKind::Validation,
            SettlementError::SkuNotFound(_) => ErrorKind::NotFound,
            SettlementError::InsufficientStock { .. } => ErrorKind::StockConflict,
            SettlementError::CommitFailed(_) => ErrorKind::CommitFailed,
            SettlementError::Store(_) | SettlementError::Cart(_) => ErrorKind::Internal,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::IncompleteParameters => "incomplete_parameters",
            SettlementError::InvalidPaymentMethod(_) => "invalid_payment_method",
            SettlementError::InvalidAddress(_) => "invalid_address",
            SettlementError::SkuNotFound(_) => "sku_not_found",
            SettlementError::InsufficientStock { .. } => "insufficient_stock",
            SettlementError::CommitFailed(_) => "commit_failed",
            SettlementError::Store(_) => "store",
            SettlementError::Cart(_) => "cart",
        }
    }
}

/// Errors raised by order reads and status transitions.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The order does not exist or is not visible to the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order has no line for this SKU.
    #[error("Order {order_id} has no line for SKU {sku_id}")]
    LineNotFound { order_id: OrderId, sku_id: SkuId },

    /// An order rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] OrderError),

    /// Storage failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl OrderServiceError {
    /// Returns the coarse error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderServiceError::OrderNotFound(_) | OrderServiceError::LineNotFound { .. } => {
                ErrorKind::NotFound
            }
            OrderServiceError::Rule(_) => ErrorKind::Validation,
            OrderServiceError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            OrderServiceError::OrderNotFound(_) => "order_not_found",
            OrderServiceError::LineNotFound { .. } => "order_line_not_found",
            OrderServiceError::Rule(OrderError::InvalidStateTransition { .. }) => {
                "invalid_order_status"
            }
            OrderServiceError::Rule(OrderError::MissingTradeReference) => "missing_trade_reference",
            OrderServiceError::Rule(OrderError::EmptyComment) => "empty_comment",
            OrderServiceError::Store(_) => "store",
        }
    }
}
