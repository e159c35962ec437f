//! Order reads and post-settlement status transitions.

use common::{SkuId, UserId};
use domain::{
    OrderHeader, OrderId, OrderStatus, OrderView, PaymentTransition, all_lines_commented,
    normalize_comment,
};
use store::OrderStore;

use crate::OrderServiceError;

type Result<T> = std::result::Result<T, OrderServiceError>;

/// Outcome of a buyer comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    /// The comment was stored; other lines still wait for one.
    Recorded,
    /// The comment was the last one missing and the order is now completed.
    OrderCompleted,
}

/// Outcome of applying a gateway payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentConfirmation {
    /// The order moved out of awaiting payment.
    Confirmed,
    /// The order was already past payment; nothing changed.
    AlreadyPaid,
}

/// Service for reading orders and advancing their status.
#[derive(Clone)]
pub struct OrderService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns an order header if it belongs to `user_id`.
    ///
    /// Orders of other users are reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn order_for_user(&self, user_id: UserId, order_id: &OrderId) -> Result<OrderHeader> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| OrderServiceError::OrderNotFound(order_id.clone()))
    }

    /// Returns one order with its priced lines.
    #[tracing::instrument(skip(self))]
    pub async fn order_detail(&self, user_id: UserId, order_id: &OrderId) -> Result<OrderView> {
        let header = self.order_for_user(user_id, order_id).await?;
        let lines = self.store.order_lines(order_id).await?;
        Ok(OrderView::new(header, lines))
    }

    /// Returns every order of a user, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        let headers = self.store.orders_for_user(user_id).await?;
        let mut views = Vec::with_capacity(headers.len());
        for header in headers {
            let lines = self.store.order_lines(&header.order_id).await?;
            views.push(OrderView::new(header, lines));
        }
        Ok(views)
    }

    /// Records a buyer comment on one line and completes the order once
    /// every line carries one.
    #[tracing::instrument(skip(self, comment))]
    pub async fn submit_comment(
        &self,
        user_id: UserId,
        order_id: &OrderId,
        sku_id: SkuId,
        comment: &str,
    ) -> Result<CommentOutcome> {
        let comment = normalize_comment(comment)?;

        let mut uow = self.store.begin().await?;
        let order = uow
            .lock_order(order_id)
            .await?
            .filter(|order| order.is_owned_by(user_id))
            .ok_or_else(|| OrderServiceError::OrderNotFound(order_id.clone()))?;
        order.ensure_commentable()?;

        if !uow.set_comment(order_id, sku_id, &comment).await? {
            return Err(OrderServiceError::LineNotFound {
                order_id: order_id.clone(),
                sku_id,
            });
        }

        let lines = uow.lines(order_id).await?;
        let outcome = if all_lines_commented(&lines) {
            uow.set_status(order_id, OrderStatus::Completed, None)
                .await?;
            CommentOutcome::OrderCompleted
        } else {
            CommentOutcome::Recorded
        };
        uow.commit().await?;

        if outcome == CommentOutcome::OrderCompleted {
            tracing::info!(%order_id, "order completed");
        }
        Ok(outcome)
    }

    /// Applies a confirmed gateway payment to an order.
    ///
    /// Confirming an order that is already past payment is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: &OrderId,
        trade_no: &str,
    ) -> Result<PaymentConfirmation> {
        let mut uow = self.store.begin().await?;
        let order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| OrderServiceError::OrderNotFound(order_id.clone()))?;

        match order.confirm_payment(trade_no)? {
            PaymentTransition::Apply { status, trade_no } => {
                uow.set_status(order_id, status, Some(&trade_no)).await?;
                uow.commit().await?;
                tracing::info!(%order_id, %trade_no, "payment confirmed");
                Ok(PaymentConfirmation::Confirmed)
            }
            PaymentTransition::AlreadyPaid => {
                uow.rollback().await?;
                Ok(PaymentConfirmation::AlreadyPaid)
            }
        }
    }
}
