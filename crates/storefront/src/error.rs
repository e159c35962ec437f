//! Storefront error type with a serializable body.

use cart::CartError;
use checkout::{OrderServiceError, SettlementError};
use common::ErrorKind;
use payment::PaymentError;
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Any error surfaced by the storefront facade.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Order(#[from] OrderServiceError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body handed to whatever layer renders the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorefrontError {
    /// Returns the coarse error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorefrontError::Cart(e) => e.kind(),
            StorefrontError::Settlement(e) => e.kind(),
            StorefrontError::Order(e) => e.kind(),
            StorefrontError::Payment(e) => e.kind(),
            StorefrontError::Store(_) | StorefrontError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StorefrontError::Cart(e) => e.code(),
            StorefrontError::Settlement(e) => e.code(),
            StorefrontError::Order(e) => e.code(),
            StorefrontError::Payment(e) => e.code(),
            StorefrontError::Store(_) => "store",
            StorefrontError::Config(_) => "config",
        }
    }

    /// Builds the error body. Internal errors carry a generic message.
    pub fn body(&self) -> ErrorBody {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "internal error");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        ErrorBody {
            code: self.code(),
            kind,
            message,
        }
    }

    /// Renders the error body as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.body())
    }
}
