//! Cart operations validated against the catalog.

use common::{SkuId, UserId};
use domain::{Money, Sku};
use serde::Serialize;
use store::Catalog;

use crate::{CartError, Result, store::CartStore};

/// One cart entry resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub sku: Sku,
    pub count: u32,
    /// Live price x count.
    pub amount: Money,
}

/// The whole cart as shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total_count: u32,
    pub total_amount: Money,
}

/// Parses a raw form value into a cart quantity.
pub fn parse_quantity(raw: &str) -> Result<u32> {
    let count = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| CartError::InvalidQuantity(raw.to_string()))?;
    positive_quantity(count)
}

fn total_overflow() -> CartError {
    CartError::InvalidQuantity("cart total is too large".to_string())
}

fn positive_quantity(count: i64) -> Result<u32> {
    u32::try_from(count)
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| CartError::InvalidQuantity(count.to_string()))
}

fn sum_units(entries: impl IntoIterator<Item = (SkuId, u32)>) -> Result<u32> {
    entries.into_iter().try_fold(0u32, |total, (_, count)| {
        total.checked_add(count).ok_or_else(total_overflow)
    })
}

/// Cart service.
///
/// Stock is checked when items are added or updated, but the cart is never
/// a reservation; the settlement engine re-validates everything at commit.
pub struct CartService<C, K>
where
    C: CartStore,
    K: Catalog,
{
    carts: C,
    catalog: K,
}

impl<C, K> CartService<C, K>
where
    C: CartStore,
    K: Catalog,
{
    /// Creates a new cart service.
    pub fn new(carts: C, catalog: K) -> Self {
        Self { carts, catalog }
    }

    /// Gets a reference to the underlying cart store.
    pub fn carts(&self) -> &C {
        &self.carts
    }

    /// Adds `count` units of a SKU, merging with any quantity already held.
    ///
    /// Returns the number of distinct SKUs in the cart.
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, sku_id: SkuId, count: i64) -> Result<usize> {
        let count = positive_quantity(count)?;
        let sku = self.require_sku(sku_id).await?;

        let existing = self.carts.quantity(user_id, sku_id).await?.unwrap_or(0);
        let requested = existing.saturating_add(count);
        if !sku.can_supply(requested) {
            return Err(CartError::StockExceeded {
                sku_id,
                requested,
                available: sku.stock,
            });
        }

        self.carts.set_quantity(user_id, sku_id, requested).await?;
        metrics::counter!("cart_mutations_total", "op" => "add").increment(1);

        self.carts.distinct_items(user_id).await
    }

    /// Replaces the quantity held for a SKU.
    ///
    /// Returns the total number of units across the cart.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, user_id: UserId, sku_id: SkuId, count: i64) -> Result<u32> {
        let count = positive_quantity(count)?;
        let sku = self.require_sku(sku_id).await?;

        if !sku.can_supply(count) {
            return Err(CartError::StockExceeded {
                sku_id,
                requested: count,
                available: sku.stock,
            });
        }

        let others = self
            .carts
            .entries(user_id)
            .await?
            .into_iter()
            .filter(|(held, _)| *held != sku_id);
        let total = sum_units(others)?
            .checked_add(count)
            .ok_or_else(total_overflow)?;

        self.carts.set_quantity(user_id, sku_id, count).await?;
        metrics::counter!("cart_mutations_total", "op" => "update").increment(1);

        Ok(total)
    }

    /// Removes a SKU from the cart, whether or not it was there.
    ///
    /// Returns the total number of units left in the cart.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, sku_id: SkuId) -> Result<u32> {
        self.carts.remove(user_id, &[sku_id]).await?;
        metrics::counter!("cart_mutations_total", "op" => "delete").increment(1);

        self.total_units(user_id).await
    }

    /// Lists the cart with live prices.
    ///
    /// Entries whose SKU no longer exists, or whose quantity is zero, are
    /// left out and pruned from the store.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> Result<CartView> {
        let mut view = CartView::default();
        let mut stale = Vec::new();

        for (sku_id, count) in self.carts.entries(user_id).await? {
            if count == 0 {
                stale.push(sku_id);
                continue;
            }
            let Some(sku) = self.catalog.find_sku(sku_id).await? else {
                stale.push(sku_id);
                continue;
            };

            let amount = sku.price.checked_times(count).ok_or_else(total_overflow)?;
            view.total_count = view.total_count.checked_add(count).ok_or_else(total_overflow)?;
            view.total_amount = view
                .total_amount
                .checked_add(amount)
                .ok_or_else(total_overflow)?;
            view.lines.push(CartLine { sku, count, amount });
        }

        if !stale.is_empty() {
            tracing::info!(%user_id, stale = stale.len(), "pruning stale cart entries");
            if let Err(e) = self.carts.remove(user_id, &stale).await {
                tracing::warn!(%user_id, error = %e, "failed to prune stale cart entries");
            }
        }

        Ok(view)
    }

    /// Returns the number of distinct SKUs in the cart.
    pub async fn item_count(&self, user_id: UserId) -> Result<usize> {
        self.carts.distinct_items(user_id).await
    }

    async fn total_units(&self, user_id: UserId) -> Result<u32> {
        sum_units(self.carts.entries(user_id).await?)
    }

    async fn require_sku(&self, sku_id: SkuId) -> Result<Sku> {
        self.catalog
            .find_sku(sku_id)
            .await?
            .ok_or(CartError::SkuNotFound(sku_id))
    }
}

#[cfg(test)]
mod tests {
    use common::{ErrorKind, ProductId};
    use store::InMemoryStore;

    use super::*;
    use crate::InMemoryCartStore;

    const USER: UserId = UserId::new(1);

    fn sku(id: i64, price_cents: i64, stock: u32) -> Sku {
        Sku {
            id: SkuId::new(id),
            product_id: ProductId::new(1),
            name: format!("sku-{id}"),
            price: Money::from_cents(price_cents),
            stock,
            sales: 0,
        }
    }

    async fn service() -> CartService<InMemoryCartStore, InMemoryStore> {
        let catalog = InMemoryStore::new();
        catalog.insert_sku(sku(1, 350, 5)).await;
        catalog.insert_sku(sku(2, 1200, 10)).await;
        CartService::new(InMemoryCartStore::new(), catalog)
    }

    #[test]
    fn test_parse_quantity_accepts_positive_integers() {
        assert_eq!(parse_quantity(" 3 ").unwrap(), 3);
        assert!(matches!(parse_quantity("abc"), Err(CartError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("0"), Err(CartError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("-2"), Err(CartError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("1.5"), Err(CartError::InvalidQuantity(_))));
    }

    #[tokio::test]
    async fn test_add_merges_and_returns_distinct_items() {
        let service = service().await;

        assert_eq!(service.add(USER, SkuId::new(1), 2).await.unwrap(), 1);
        assert_eq!(service.add(USER, SkuId::new(1), 1).await.unwrap(), 1);
        assert_eq!(service.add(USER, SkuId::new(2), 4).await.unwrap(), 2);

        let held = service.carts().quantity(USER, SkuId::new(1)).await.unwrap();
        assert_eq!(held, Some(3));
    }

    #[tokio::test]
    async fn test_add_checks_merged_quantity_against_stock() {
        let service = service().await;
        service.add(USER, SkuId::new(1), 4).await.unwrap();

        let err = service.add(USER, SkuId::new(1), 2).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::StockExceeded {
                requested: 6,
                available: 5,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::StockConflict);

        let held = service.carts().quantity(USER, SkuId::new(1)).await.unwrap();
        assert_eq!(held, Some(4));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let service = service().await;

        let err = service.add(USER, SkuId::new(1), 0).await.unwrap_err();
        assert_eq!(err.code(), "invalid_quantity");

        let err = service.add(USER, SkuId::new(99), 1).await.unwrap_err();
        assert!(matches!(err, CartError::SkuNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(service.item_count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_and_returns_total_units() {
        let service = service().await;
        service.add(USER, SkuId::new(1), 2).await.unwrap();
        service.add(USER, SkuId::new(2), 3).await.unwrap();

        assert_eq!(service.update(USER, SkuId::new(1), 5).await.unwrap(), 8);
        assert!(matches!(
            service.update(USER, SkuId::new(1), 6).await,
            Err(CartError::StockExceeded { .. })
        ));
        assert!(matches!(
            service.update(USER, SkuId::new(1), -1).await,
            Err(CartError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let service = service().await;
        service.add(USER, SkuId::new(1), 2).await.unwrap();
        service.add(USER, SkuId::new(2), 3).await.unwrap();

        assert_eq!(service.delete(USER, SkuId::new(1)).await.unwrap(), 3);
        assert_eq!(service.delete(USER, SkuId::new(1)).await.unwrap(), 3);
        assert_eq!(service.delete(USER, SkuId::new(42)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_computes_totals_and_prunes_stale_entries() {
        let catalog = InMemoryStore::new();
        catalog.insert_sku(sku(1, 350, 5)).await;
        catalog.insert_sku(sku(2, 1200, 10)).await;
        let service = CartService::new(InMemoryCartStore::new(), catalog.clone());

        service.add(USER, SkuId::new(1), 2).await.unwrap();
        service.add(USER, SkuId::new(2), 1).await.unwrap();
        catalog.remove_sku(SkuId::new(2)).await;

        let view = service.list(USER).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].amount.cents(), 700);
        assert_eq!(view.total_count, 2);
        assert_eq!(view.total_amount.cents(), 700);

        assert_eq!(service.item_count(USER).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_oversized_totals_are_rejected() {
        let catalog = InMemoryStore::new();
        catalog.insert_sku(sku(3, 100, u32::MAX)).await;
        catalog.insert_sku(sku(4, i64::MAX, u32::MAX)).await;
        let service = CartService::new(InMemoryCartStore::new(), catalog);

        service.add(USER, SkuId::new(3), i64::from(u32::MAX)).await.unwrap();
        let err = service
            .update(USER, SkuId::new(4), i64::from(u32::MAX))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_quantity");
        let held = service.carts().quantity(USER, SkuId::new(4)).await.unwrap();
        assert_eq!(held, None);

        service.carts().remove(USER, &[SkuId::new(3)]).await.unwrap();
        service.add(USER, SkuId::new(4), 2).await.unwrap();
        assert!(matches!(
            service.list(USER).await,
            Err(CartError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_list_of_empty_cart_is_empty() {
        let service = service().await;
        let view = service.list(USER).await.unwrap();
        assert!(view.lines.is_empty());
        assert!(view.total_amount.is_zero());
    }
}
