//! Order header and line items.

use chrono::{DateTime, Utc};
use common::{AddressId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderId, OrderStatus, PayMethod};

/// Order header: one row per checkout.
///
/// Totals are written once by the settlement engine inside the same
/// transaction that creates the lines; afterwards only the status and the
/// trade reference change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub pay_method: PayMethod,
    pub status: OrderStatus,
    /// Units across all lines.
    pub total_count: u32,
    /// Goods plus transit fee.
    pub total_price: Money,
    pub transit_price: Money,
    /// Gateway transaction reference, set once payment is confirmed.
    pub trade_no: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of applying a gateway confirmation to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    /// Persist the new status and trade reference.
    Apply {
        status: OrderStatus,
        trade_no: String,
    },
    /// The order is already past payment; nothing to write.
    AlreadyPaid,
}

impl OrderHeader {
    /// Creates a placeholder header with zeroed totals.
    pub fn placeholder(
        order_id: OrderId,
        user_id: UserId,
        address_id: AddressId,
        pay_method: PayMethod,
        transit_price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            user_id,
            address_id,
            pay_method,
            status: OrderStatus::AwaitingPayment,
            total_count: 0,
            total_price: Money::zero(),
            transit_price,
            trade_no: None,
            created_at,
        }
    }

    /// Price of the goods alone, without the transit fee.
    pub fn goods_amount(&self) -> Money {
        Money::from_cents(self.total_price.cents() - self.transit_price.cents())
    }

    /// Returns true if `user_id` placed this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Decides what a confirmed gateway payment does to this order.
    ///
    /// Repeated confirmations are no-ops rather than errors.
    pub fn confirm_payment(&self, trade_no: &str) -> Result<PaymentTransition, OrderError> {
        if trade_no.trim().is_empty() {
            return Err(OrderError::MissingTradeReference);
        }
        if !self.status.can_confirm_payment() {
            return Ok(PaymentTransition::AlreadyPaid);
        }
        Ok(PaymentTransition::Apply {
            status: OrderStatus::AwaitingComment,
            trade_no: trade_no.to_string(),
        })
    }

    /// Fails unless the order is waiting for buyer comments.
    pub fn ensure_commentable(&self) -> Result<(), OrderError> {
        if !self.status.can_comment() {
            return Err(OrderError::InvalidStateTransition {
                current_status: self.status,
                action: "comment",
            });
        }
        Ok(())
    }
}

/// One settled SKU inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub sku_id: SkuId,
    pub count: u32,
    /// Unit price captured at settlement; later price changes do not apply.
    pub price: Money,
    pub comment: Option<String>,
}

impl OrderLine {
    /// Creates an uncommented line.
    pub fn new(order_id: OrderId, sku_id: SkuId, count: u32, price: Money) -> Self {
        Self {
            order_id,
            sku_id,
            count,
            price,
            comment: None,
        }
    }

    /// Returns price x count.
    pub fn amount(&self) -> Money {
        self.price.times(self.count)
    }

    /// Returns true if the buyer left a non-blank comment.
    pub fn has_comment(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }
}

/// Returns true if the order has lines and every one of them is commented.
pub fn all_lines_commented(lines: &[OrderLine]) -> bool {
    !lines.is_empty() && lines.iter().all(OrderLine::has_comment)
}

/// Normalizes a submitted comment, rejecting blank input.
pub fn normalize_comment(comment: &str) -> Result<String, OrderError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(OrderError::EmptyComment);
    }
    Ok(trimmed.to_string())
}
