//! Order settlement.

use std::time::Instant;

use cart::{CartLine, CartStore};
use chrono::Utc;
use common::{AddressId, SkuId, UserId};
use domain::{Address, Money, OrderHeader, OrderId, OrderLine, PayMethod};
use serde::Serialize;
use store::{AddressBook, Catalog, OrderStore, StoreError, UnitOfWork};

use crate::{SettlementConfig, SettlementError};

type Result<T> = std::result::Result<T, SettlementError>;

/// A checkout submitted by a shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub user_id: UserId,
    /// SKUs selected from the cart; quantities come from the cart itself.
    pub sku_ids: Vec<SkuId>,
    /// Raw payment method code as submitted.
    pub pay_method: i16,
    pub address_id: AddressId,
}

/// What the place-order page shows before the shopper commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutPreview {
    pub lines: Vec<CartLine>,
    pub total_count: u32,
    pub total_amount: Money,
    pub transit_fee: Money,
    pub amount_payable: Money,
    pub addresses: Vec<Address>,
}

fn commit_failed(e: impl std::fmt::Display) -> SettlementError {
    SettlementError::CommitFailed(e.to_string())
}

fn amount_overflow() -> SettlementError {
    SettlementError::CommitFailed("order totals overflow".to_string())
}

/// Distinct SKU ids in ascending order.
///
/// Row locks are always taken in this order, so two checkouts sharing SKUs
/// queue behind each other instead of deadlocking.
fn lock_order(sku_ids: &[SkuId]) -> Vec<SkuId> {
    let mut ids = sku_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Converts cart entries into orders.
///
/// Each commit runs in one unit of work: the header is inserted with zero
/// totals, every SKU row is locked before its stock is checked, lines are
/// written at the locked price, stock moves to sales, and the header is
/// finalized. Any failure rolls the whole unit back. The settled SKUs are
/// removed from the cart only after the unit commits.
pub struct SettlementEngine<S, C>
where
    S: OrderStore + AddressBook + Catalog,
    C: CartStore,
{
    store: S,
    carts: C,
    config: SettlementConfig,
}

impl<S, C> SettlementEngine<S, C>
where
    S: OrderStore + AddressBook + Catalog,
    C: CartStore,
{
    /// Creates a new settlement engine.
    pub fn new(store: S, carts: C, config: SettlementConfig) -> Self {
        Self {
            store,
            carts,
            config,
        }
    }

    /// Gets the settlement settings.
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settles the selected cart entries into a new order.
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = %request.user_id, skus = request.sku_ids.len())
    )]
    pub async fn commit(&self, request: CommitRequest) -> Result<OrderHeader> {
        let start = Instant::now();
        let result = self.settle(request).await;
        metrics::histogram!("settlement_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_committed_total").increment(1);
                tracing::info!(
                    order_id = %order.order_id,
                    total_count = order.total_count,
                    total_price = %order.total_price,
                    "order committed"
                );
            }
            Err(e) => {
                metrics::counter!("settlement_failures_total", "code" => e.code()).increment(1);
                tracing::warn!(error = %e, code = e.code(), "settlement failed");
            }
        }
        result
    }

    async fn settle(&self, request: CommitRequest) -> Result<OrderHeader> {
        let CommitRequest {
            user_id,
            sku_ids,
            pay_method,
            address_id,
        } = request;

        if sku_ids.is_empty() {
            return Err(SettlementError::IncompleteParameters);
        }
        let pay_method = PayMethod::from_code(pay_method)
            .ok_or(SettlementError::InvalidPaymentMethod(pay_method))?;
        self.store
            .find_address(user_id, address_id)
            .await?
            .ok_or(SettlementError::InvalidAddress(address_id))?;

        let sku_ids = lock_order(&sku_ids);
        let now = Utc::now();
        let header = OrderHeader::placeholder(
            OrderId::generate(user_id, now),
            user_id,
            address_id,
            pay_method,
            self.config.transit_fee,
            now,
        );

        let mut uow = self.store.begin().await.map_err(commit_failed)?;
        let order = match self.write_order(uow.as_mut(), header, &sku_ids).await {
            Ok(order) => order,
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };
        uow.commit().await.map_err(commit_failed)?;

        if let Err(e) = self.carts.remove(user_id, &sku_ids).await {
            tracing::warn!(
                order_id = %order.order_id,
                error = %e,
                "order committed but cart entries were not cleared"
            );
        }

        Ok(order)
    }

    async fn write_order(
        &self,
        uow: &mut dyn UnitOfWork,
        mut header: OrderHeader,
        sku_ids: &[SkuId],
    ) -> Result<OrderHeader> {
        uow.insert_order(&header).await.map_err(commit_failed)?;

        let mut total_count: u32 = 0;
        let mut goods = Money::zero();

        for &sku_id in sku_ids {
            let sku = uow
                .lock_sku(sku_id)
                .await
                .map_err(commit_failed)?
                .ok_or(SettlementError::SkuNotFound(sku_id))?;

            let count = self
                .carts
                .quantity(header.user_id, sku_id)
                .await
                .map_err(commit_failed)?
                .filter(|count| *count > 0)
                .ok_or_else(|| {
                    SettlementError::CommitFailed(format!("SKU {sku_id} is not in the cart"))
                })?;

            if !sku.can_supply(count) {
                return Err(SettlementError::InsufficientStock {
                    sku_id,
                    requested: count,
                    available: sku.stock,
                });
            }

            let amount = sku.price.checked_times(count).ok_or_else(amount_overflow)?;
            let line = OrderLine::new(header.order_id.clone(), sku_id, count, sku.price);
            uow.insert_line(&line).await.map_err(commit_failed)?;
            uow.record_sale(sku_id, count).await.map_err(|e| match e {
                StoreError::StockUnderflow {
                    sku_id,
                    requested,
                    available,
                } => SettlementError::InsufficientStock {
                    sku_id,
                    requested,
                    available,
                },
                other => commit_failed(other),
            })?;

            total_count = total_count.checked_add(count).ok_or_else(amount_overflow)?;
            goods = goods.checked_add(amount).ok_or_else(amount_overflow)?;
        }

        header.total_count = total_count;
        header.total_price = goods
            .checked_add(header.transit_price)
            .ok_or_else(amount_overflow)?;
        uow.finalize_order(&header.order_id, header.total_count, header.total_price)
            .await
            .map_err(commit_failed)?;

        Ok(header)
    }

    /// Prices the selected cart entries without writing anything.
    ///
    /// SKUs the cart no longer holds are left out.
    #[tracing::instrument(skip(self))]
    pub async fn preview(&self, user_id: UserId, sku_ids: &[SkuId]) -> Result<CheckoutPreview> {
        if sku_ids.is_empty() {
            return Err(SettlementError::IncompleteParameters);
        }

        let mut lines = Vec::new();
        let mut total_count: u32 = 0;
        let mut total_amount = Money::zero();

        for sku_id in lock_order(sku_ids) {
            let sku = self
                .store
                .find_sku(sku_id)
                .await?
                .ok_or(SettlementError::SkuNotFound(sku_id))?;
            let Some(count) = self
                .carts
                .quantity(user_id, sku_id)
                .await?
                .filter(|count| *count > 0)
            else {
                continue;
            };

            let amount = sku.price.checked_times(count).ok_or_else(amount_overflow)?;
            total_count = total_count.checked_add(count).ok_or_else(amount_overflow)?;
            total_amount = total_amount.checked_add(amount).ok_or_else(amount_overflow)?;
            lines.push(CartLine { sku, count, amount });
        }

        let transit_fee = self.config.transit_fee;
        let amount_payable = total_amount
            .checked_add(transit_fee)
            .ok_or_else(amount_overflow)?;
        Ok(CheckoutPreview {
            lines,
            total_count,
            total_amount,
            transit_fee,
            amount_payable,
            addresses: self.store.addresses_for_user(user_id).await?,
        })
    }
}
