//! Bridges stored orders to the gateway's asynchronous settlement.

use checkout::{OrderService, PaymentConfirmation};
use common::UserId;
use domain::{OrderHeader, OrderId, PayMethod};
use store::OrderStore;
use tokio::time::{Instant, sleep, timeout};

use crate::{
    GatewayVerdict, PagePayRequest, PaymentConfig, PaymentError, PaymentGateway, Result,
};

/// Where an order's payment stands after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// The gateway confirmed the payment and the order has moved on.
    Confirmed,
    /// The gateway has not settled the trade yet.
    Pending,
}

impl PaymentStatus {
    fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Pending => "pending",
        }
    }
}

/// Reconciles gateway payments with stored orders.
pub struct PaymentReconciler<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    orders: OrderService<S>,
    gateway: G,
    config: PaymentConfig,
}

impl<S, G> PaymentReconciler<S, G>
where
    S: OrderStore,
    G: PaymentGateway,
{
    /// Creates a new reconciler.
    pub fn new(orders: OrderService<S>, gateway: G, config: PaymentConfig) -> Self {
        Self {
            orders,
            gateway,
            config,
        }
    }

    /// Asks the gateway for the page the buyer pays on.
    ///
    /// Only gateway orders that are still awaiting payment qualify.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_payment(&self, user_id: UserId, order_id: &OrderId) -> Result<String> {
        let order = self.gateway_order(user_id, order_id).await?;
        if order.status.is_paid() {
            return Err(PaymentError::NotPayable {
                order_id: order_id.clone(),
                reason: "order is already paid",
            });
        }

        let request = PagePayRequest {
            order_id: order.order_id,
            total_amount: order.total_price,
            subject: self.config.subject.clone(),
        };
        let url = self.bounded(self.gateway.page_pay(&request)).await?;
        tracing::info!(%order_id, total = %request.total_amount, "payment page issued");
        Ok(url)
    }

    /// Polls the gateway until the payment is confirmed, fails, or the
    /// configured wait runs out.
    ///
    /// Dropping the returned future cancels the polling; an order already
    /// past payment is reported confirmed without contacting the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn check_payment(&self, user_id: UserId, order_id: &OrderId) -> Result<PaymentStatus> {
        let result = self.poll(user_id, order_id).await;
        record_check(&result);
        result
    }

    /// Queries the gateway once without waiting.
    #[tracing::instrument(skip(self))]
    pub async fn check_payment_once(
        &self,
        user_id: UserId,
        order_id: &OrderId,
    ) -> Result<PaymentStatus> {
        let result = async {
            let order = self.gateway_order(user_id, order_id).await?;
            if order.status.is_paid() {
                return Ok(PaymentStatus::Confirmed);
            }
            self.query_and_apply(order_id).await
        }
        .await;
        record_check(&result);
        result
    }

    async fn poll(&self, user_id: UserId, order_id: &OrderId) -> Result<PaymentStatus> {
        let order = self.gateway_order(user_id, order_id).await?;
        if order.status.is_paid() {
            return Ok(PaymentStatus::Confirmed);
        }

        let poll = &self.config.poll;
        let started = Instant::now();
        let mut delay = poll.first_delay();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if self.query_and_apply(order_id).await? == PaymentStatus::Confirmed {
                return Ok(PaymentStatus::Confirmed);
            }

            if started.elapsed() + delay > poll.max_wait {
                tracing::info!(%order_id, attempt, "payment still pending, giving up");
                return Ok(PaymentStatus::Pending);
            }

            tracing::debug!(
                %order_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "payment pending, polling again"
            );
            sleep(delay).await;
            delay = poll.next_delay(delay);
        }
    }

    async fn query_and_apply(&self, order_id: &OrderId) -> Result<PaymentStatus> {
        let answer = self.bounded(self.gateway.query(order_id)).await?;
        let verdict = answer.verdict();
        metrics::counter!("payment_gateway_queries_total", "verdict" => verdict.as_str())
            .increment(1);

        match verdict {
            GatewayVerdict::Paid { trade_no } => {
                match self.orders.confirm_payment(order_id, &trade_no).await? {
                    PaymentConfirmation::Confirmed => {
                        tracing::info!(%order_id, %trade_no, "gateway payment applied");
                    }
                    PaymentConfirmation::AlreadyPaid => {
                        tracing::debug!(%order_id, "gateway payment already applied");
                    }
                }
                Ok(PaymentStatus::Confirmed)
            }
            GatewayVerdict::Pending => Ok(PaymentStatus::Pending),
            GatewayVerdict::Failed => {
                tracing::warn!(
                    %order_id,
                    code = %answer.code,
                    trade_status = ?answer.trade_status,
                    "gateway reported payment failure"
                );
                Err(PaymentError::Rejected {
                    code: answer.code,
                    trade_status: answer.trade_status,
                })
            }
        }
    }

    async fn gateway_order(&self, user_id: UserId, order_id: &OrderId) -> Result<OrderHeader> {
        let order = self.orders.order_for_user(user_id, order_id).await?;
        if order.pay_method != PayMethod::Gateway {
            return Err(PaymentError::NotPayable {
                order_id: order_id.clone(),
                reason: "order is not paid through the gateway",
            });
        }
        Ok(order)
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.config.poll.query_timeout;
        timeout(limit, call)
            .await
            .map_err(|_| PaymentError::Timeout(limit))?
    }
}

fn record_check(result: &Result<PaymentStatus>) {
    let outcome = match result {
        Ok(status) => status.as_str(),
        Err(e) => e.code(),
    };
    metrics::counter!("payment_checks_total", "outcome" => outcome).increment(1);
}
