//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions driven by this core:
/// ```text
/// AwaitingPayment ──(payment confirmed)──► AwaitingComment ──(all lines commented)──► Completed
///        │                                        ▲
///        └──► AwaitingShipment ──► AwaitingReceipt┘   (fulfilment, driven externally)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, payment not yet confirmed.
    #[default]
    AwaitingPayment,

    /// Paid, waiting to be shipped.
    AwaitingShipment,

    /// Shipped, waiting for the buyer to receive it.
    AwaitingReceipt,

    /// Paid and delivered; buyer may comment on each line.
    AwaitingComment,

    /// Every line has been commented (terminal state).
    Completed,
}

impl OrderStatus {
    /// Resolves a persisted status code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(OrderStatus::AwaitingPayment),
            2 => Some(OrderStatus::AwaitingShipment),
            3 => Some(OrderStatus::AwaitingReceipt),
            4 => Some(OrderStatus::AwaitingComment),
            5 => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    /// Returns the stable persisted code.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::AwaitingPayment => 1,
            OrderStatus::AwaitingShipment => 2,
            OrderStatus::AwaitingReceipt => 3,
            OrderStatus::AwaitingComment => 4,
            OrderStatus::Completed => 5,
        }
    }

    /// Returns true if a payment confirmation would advance the order.
    pub fn can_confirm_payment(&self) -> bool {
        matches!(self, OrderStatus::AwaitingPayment)
    }

    /// Returns true if the order is past payment, so a confirmation is a no-op.
    pub fn is_paid(&self) -> bool {
        !self.can_confirm_payment()
    }

    /// Returns true if buyers may comment on lines in this state.
    pub fn can_comment(&self) -> bool {
        matches!(self, OrderStatus::AwaitingComment)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "AwaitingPayment",
            OrderStatus::AwaitingShipment => "AwaitingShipment",
            OrderStatus::AwaitingReceipt => "AwaitingReceipt",
            OrderStatus::AwaitingComment => "AwaitingComment",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
