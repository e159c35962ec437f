//! Payment reconciliation.
//!
//! Orders paid through the third-party gateway are confirmed by querying the
//! gateway with the order's own id until it reports a final answer. A
//! success moves the order out of awaiting payment; a pending answer is
//! polled again with exponential backoff; anything else is a payment error
//! that leaves the order untouched.

pub mod config;
pub mod error;
pub mod gateway;
pub mod reconciler;

pub use config::{PaymentConfig, PollConfig};
pub use error::{PaymentError, Result};
pub use gateway::{GatewayQuery, GatewayVerdict, PagePayRequest, PaymentGateway, ScriptedGateway};
pub use reconciler::{PaymentReconciler, PaymentStatus};
