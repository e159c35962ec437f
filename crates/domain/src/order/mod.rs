//! Order header, lines, status machine and related value objects.

mod aggregate;
mod state;
mod value_objects;
mod views;

pub use aggregate::{
    OrderHeader, OrderLine, PaymentTransition, all_lines_commented, normalize_comment,
};
pub use state::OrderStatus;
pub use value_objects::{Money, OrderId, PayMethod};
pub use views::{OrderLineView, OrderView};

use thiserror::Error;

/// Errors raised by order rules.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// A payment confirmation arrived without the gateway's trade number.
    #[error("Payment confirmation carries no trade reference")]
    MissingTradeReference,

    /// A comment was empty or whitespace.
    #[error("Comment must not be empty")]
    EmptyComment,
}
