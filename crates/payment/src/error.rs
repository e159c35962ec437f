use std::time::Duration;

use checkout::OrderServiceError;
use common::ErrorKind;
use domain::OrderId;
use thiserror::Error;

/// Errors raised by payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The order cannot be paid through the gateway in its current state.
    #[error("Order {order_id} cannot be paid online: {reason}")]
    NotPayable {
        order_id: OrderId,
        reason: &'static str,
    },

    /// The gateway could not be reached.
    #[error("Payment gateway unavailable: {0}")]
    Gateway(String),

    /// A gateway call did not answer in time.
    #[error("Payment gateway timed out after {0:?}")]
    Timeout(Duration),

    /// The gateway answered with a failure.
    #[error("Payment failed: code {code}, trade status {trade_status:?}")]
    Rejected {
        code: String,
        trade_status: Option<String>,
    },

    /// Loading or updating the order failed.
    #[error(transparent)]
    Order(#[from] OrderServiceError),
}

impl PaymentError {
    /// Returns the coarse error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::NotPayable { .. } => ErrorKind::Validation,
            PaymentError::Gateway(_)
            | PaymentError::Timeout(_)
            | PaymentError::Rejected { .. } => ErrorKind::ExternalGateway,
            PaymentError::Order(e) => e.kind(),
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotPayable { .. } => "order_not_payable",
            PaymentError::Gateway(_) => "gateway_unavailable",
            PaymentError::Timeout(_) => "gateway_timeout",
            PaymentError::Rejected { .. } => "payment_failed",
            PaymentError::Order(e) => e.code(),
        }
    }
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
