//! Checkout for the storefront core.
//!
//! - [`SettlementEngine`] turns selected cart entries into one durable order,
//!   moving stock to sales inside a single unit of work.
//! - [`OrderService`] reads orders back and applies the status transitions
//!   that follow settlement: payment confirmation and buyer comments.

pub mod config;
pub mod engine;
pub mod error;
pub mod orders;

pub use config::SettlementConfig;
pub use engine::{CheckoutPreview, CommitRequest, SettlementEngine};
pub use error::{OrderServiceError, SettlementError};
pub use orders::{CommentOutcome, OrderService, PaymentConfirmation};
