//! Settlement engine tests against the in-memory store and cart.

use std::sync::Arc;

use cart::{CartStore, InMemoryCartStore};
use checkout::{CommitRequest, SettlementConfig, SettlementEngine, SettlementError};
use common::{AddressId, ErrorKind, ProductId, SkuId, UserId};
use domain::{Address, Money, OrderStatus, PayMethod, Sku};
use store::{Catalog, FailurePoint, InMemoryStore, OrderStore};

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

struct Fixture {
    store: InMemoryStore,
    carts: InMemoryCartStore,
    engine: SettlementEngine<InMemoryStore, InMemoryCartStore>,
}

fn sku(id: i64, price_cents: i64, stock: u32) -> Sku {
    Sku {
        id: SkuId::new(id),
        product_id: ProductId::new(100),
        name: format!("sku-{id}"),
        price: Money::from_cents(price_cents),
        stock,
        sales: 0,
    }
}

fn address(id: i64, user_id: UserId) -> Address {
    Address {
        id: AddressId::new(id),
        user_id,
        receiver: format!("user-{user_id}"),
        addr: "1 Market St".to_string(),
        zip_code: Some("94103".to_string()),
        phone: "555-0100".to_string(),
        is_default: true,
    }
}

async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    store.insert_sku(sku(1, 1250, 5)).await;
    store.insert_sku(sku(2, 300, 10)).await;
    store.insert_address(address(10, ALICE)).await;
    store.insert_address(address(20, BOB)).await;

    let carts = InMemoryCartStore::new();
    let engine = SettlementEngine::new(store.clone(), carts.clone(), SettlementConfig::default());
    Fixture {
        store,
        carts,
        engine,
    }
}

fn ids(raw: &[i64]) -> Vec<SkuId> {
    raw.iter().copied().map(SkuId::new).collect()
}

fn request(user_id: UserId, sku_ids: &[i64], address_id: i64) -> CommitRequest {
    CommitRequest {
        user_id,
        sku_ids: ids(sku_ids),
        pay_method: PayMethod::Gateway.code(),
        address_id: AddressId::new(address_id),
    }
}

async fn stock_of(store: &InMemoryStore, id: i64) -> (u32, u32) {
    let sku = store.find_sku(SkuId::new(id)).await.unwrap().unwrap();
    (sku.stock, sku.sales)
}

#[tokio::test]
async fn test_commit_settles_cart_into_order() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(2), 3).await.unwrap();

    let order = fx.engine.commit(request(ALICE, &[1, 2], 10)).await.unwrap();

    assert_eq!(order.status, OrderStatus::AwaitingPayment);
    assert_eq!(order.total_count, 5);
    // 2 x 12.50 + 3 x 3.00 + 10.00 transit
    assert_eq!(order.total_price.cents(), 2500 + 900 + 1000);
    assert_eq!(order.transit_price.cents(), 1000);
    assert!(order.trade_no.is_none());

    let stored = fx.store.find_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(stored, order);

    let lines = fx.store.order_lines(&order.order_id).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].price.cents(), 1250);
    assert_eq!(lines[0].count, 2);

    assert_eq!(stock_of(&fx.store, 1).await, (3, 2));
    assert_eq!(stock_of(&fx.store, 2).await, (7, 3));

    assert!(fx.carts.entries(ALICE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_leaves_unselected_cart_entries() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(2), 4).await.unwrap();

    fx.engine.commit(request(ALICE, &[1], 10)).await.unwrap();

    assert_eq!(
        fx.carts.entries(ALICE).await.unwrap(),
        vec![(SkuId::new(2), 4)]
    );
}

#[tokio::test]
async fn test_line_price_is_frozen_at_settlement() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();
    let order = fx.engine.commit(request(ALICE, &[1], 10)).await.unwrap();

    let mut repriced = sku(1, 9999, 4);
    repriced.sales = 1;
    fx.store.insert_sku(repriced).await;

    let lines = fx.store.order_lines(&order.order_id).await.unwrap();
    assert_eq!(lines[0].price.cents(), 1250);
}

#[tokio::test]
async fn test_duplicate_sku_ids_settle_once() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();

    let order = fx.engine.commit(request(ALICE, &[1, 1], 10)).await.unwrap();

    assert_eq!(order.total_count, 2);
    assert_eq!(stock_of(&fx.store, 1).await, (3, 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_commits_never_oversell() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 3).await.unwrap();
    fx.carts.set_quantity(BOB, SkuId::new(1), 3).await.unwrap();

    let engine = Arc::new(fx.engine);
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.commit(request(ALICE, &[1], 10)).await })
    };
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.commit(request(BOB, &[1], 20)).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        failure,
        SettlementError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        }
    ));

    assert_eq!(stock_of(&fx.store, 1).await, (2, 3));
    assert_eq!(fx.store.order_count().await, 1);
}

#[tokio::test]
async fn test_many_concurrent_commits_settle_at_most_stock() {
    let fx = fixture().await;
    let users: Vec<UserId> = (100..110).map(UserId::new).collect();
    for (i, user) in users.iter().enumerate() {
        let address_id = 1000 + i as i64;
        fx.store.insert_address(address(address_id, *user)).await;
        fx.carts.set_quantity(*user, SkuId::new(1), 1).await.unwrap();
    }

    let engine = Arc::new(fx.engine);
    let commits = users.iter().enumerate().map(|(i, user)| {
        let engine = engine.clone();
        let request = request(*user, &[1], 1000 + i as i64);
        async move { engine.commit(request).await }
    });
    let results = futures_util::future::join_all(commits).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    assert_eq!(stock_of(&fx.store, 1).await, (0, 5));
}

#[tokio::test]
async fn test_empty_selection_is_incomplete() {
    let fx = fixture().await;

    let err = fx.engine.commit(request(ALICE, &[], 10)).await.unwrap_err();

    assert!(matches!(err, SettlementError::IncompleteParameters));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_unknown_pay_method_is_rejected() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();

    let mut req = request(ALICE, &[1], 10);
    req.pay_method = 9;
    let err = fx.engine.commit(req).await.unwrap_err();

    assert!(matches!(err, SettlementError::InvalidPaymentMethod(9)));
    assert_eq!(fx.store.order_count().await, 0);
}

#[tokio::test]
async fn test_foreign_or_unknown_address_is_rejected() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();

    let err = fx.engine.commit(request(ALICE, &[1], 99)).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvalidAddress(_)));

    let err = fx.engine.commit(request(ALICE, &[1], 20)).await.unwrap_err();
    assert_eq!(err.code(), "invalid_address");

    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
}

#[tokio::test]
async fn test_missing_sku_rolls_back_earlier_lines() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(42), 1).await.unwrap();

    let err = fx.engine.commit(request(ALICE, &[1, 42], 10)).await.unwrap_err();

    assert!(matches!(err, SettlementError::SkuNotFound(id) if id == SkuId::new(42)));
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(fx.store.line_count().await, 0);
    assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
    assert_eq!(fx.carts.entries(ALICE).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back_everything() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(2), 4).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(1), 6).await.unwrap();

    let err = fx.engine.commit(request(ALICE, &[2, 1], 10)).await.unwrap_err();

    assert!(matches!(
        err,
        SettlementError::InsufficientStock {
            requested: 6,
            available: 5,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::StockConflict);
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(stock_of(&fx.store, 2).await, (10, 0));
    assert_eq!(fx.carts.entries(ALICE).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sku_missing_from_cart_fails_commit() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();

    let err = fx.engine.commit(request(ALICE, &[1, 2], 10)).await.unwrap_err();

    assert!(matches!(err, SettlementError::CommitFailed(_)));
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
}

#[tokio::test]
async fn test_overflowing_totals_fail_commit() {
    let fx = fixture().await;
    fx.store.insert_sku(sku(3, i64::MAX / 2, 10)).await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(3), 3).await.unwrap();

    let err = fx.engine.commit(request(ALICE, &[1, 3], 10)).await.unwrap_err();

    assert!(matches!(err, SettlementError::CommitFailed(_)));
    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
    assert_eq!(stock_of(&fx.store, 3).await, (10, 0));

    let err = fx.engine.preview(ALICE, &ids(&[1, 3])).await.unwrap_err();
    assert_eq!(err.code(), "commit_failed");
}

#[tokio::test]
async fn test_opposite_selection_orders_settle_alike() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(2), 1).await.unwrap();
    fx.carts.set_quantity(BOB, SkuId::new(2), 1).await.unwrap();
    fx.carts.set_quantity(BOB, SkuId::new(1), 1).await.unwrap();

    let (alice, bob) = tokio::join!(
        fx.engine.commit(request(ALICE, &[1, 2], 10)),
        fx.engine.commit(request(BOB, &[2, 1], 20)),
    );

    assert_eq!(alice.unwrap().total_count, 2);
    assert_eq!(bob.unwrap().total_count, 2);
    assert_eq!(stock_of(&fx.store, 1).await, (3, 2));
    assert_eq!(stock_of(&fx.store, 2).await, (8, 2));
}

#[tokio::test]
async fn test_storage_failure_mid_settlement_leaves_no_trace() {
    for point in [
        FailurePoint::InsertLine,
        FailurePoint::FinalizeOrder,
        FailurePoint::Commit,
    ] {
        let fx = fixture().await;
        fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
        fx.store.set_failure(Some(point));

        let err = fx.engine.commit(request(ALICE, &[1], 10)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CommitFailed, "{point:?}");
        assert_eq!(fx.store.order_count().await, 0);
        assert_eq!(fx.store.line_count().await, 0);
        assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
        assert_eq!(
            fx.carts.quantity(ALICE, SkuId::new(1)).await.unwrap(),
            Some(2)
        );
    }
}

#[tokio::test]
async fn test_cart_clear_failure_keeps_the_order() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
    fx.carts.set_fail_on_remove(true);

    let order = fx.engine.commit(request(ALICE, &[1], 10)).await.unwrap();

    assert!(fx.store.find_order(&order.order_id).await.unwrap().is_some());
    assert_eq!(stock_of(&fx.store, 1).await, (3, 2));
    assert_eq!(
        fx.carts.quantity(ALICE, SkuId::new(1)).await.unwrap(),
        Some(2)
    );
}

#[tokio::test]
async fn test_rapid_commits_get_distinct_order_ids() {
    let fx = fixture().await;

    fx.carts.set_quantity(ALICE, SkuId::new(2), 1).await.unwrap();
    let first = fx.engine.commit(request(ALICE, &[2], 10)).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(2), 1).await.unwrap();
    let second = fx.engine.commit(request(ALICE, &[2], 10)).await.unwrap();

    assert_ne!(first.order_id, second.order_id);
    assert_eq!(fx.store.order_count().await, 2);
}

#[tokio::test]
async fn test_preview_prices_selection_without_writing() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 2).await.unwrap();
    fx.carts.set_quantity(ALICE, SkuId::new(2), 1).await.unwrap();

    let preview = fx.engine.preview(ALICE, &ids(&[1, 2, 2])).await.unwrap();

    assert_eq!(preview.lines.len(), 2);
    assert_eq!(preview.total_count, 3);
    assert_eq!(preview.total_amount.cents(), 2800);
    assert_eq!(preview.transit_fee.cents(), 1000);
    assert_eq!(preview.amount_payable.cents(), 3800);
    assert_eq!(preview.addresses.len(), 1);
    assert_eq!(preview.addresses[0].id, AddressId::new(10));

    assert_eq!(fx.store.order_count().await, 0);
    assert_eq!(stock_of(&fx.store, 1).await, (5, 0));
}

#[tokio::test]
async fn test_preview_skips_skus_not_in_cart() {
    let fx = fixture().await;
    fx.carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();

    let preview = fx.engine.preview(ALICE, &ids(&[1, 2])).await.unwrap();
    assert_eq!(preview.lines.len(), 1);

    assert!(matches!(
        fx.engine.preview(ALICE, &[]).await,
        Err(SettlementError::IncompleteParameters)
    ));
    assert!(matches!(
        fx.engine.preview(ALICE, &ids(&[77])).await,
        Err(SettlementError::SkuNotFound(_))
    ));
}

#[tokio::test]
async fn test_configured_transit_fee_is_applied() {
    let store = InMemoryStore::new();
    store.insert_sku(sku(1, 1000, 5)).await;
    store.insert_address(address(10, ALICE)).await;
    let carts = InMemoryCartStore::new();
    carts.set_quantity(ALICE, SkuId::new(1), 1).await.unwrap();

    let engine = SettlementEngine::new(
        store,
        carts,
        SettlementConfig {
            transit_fee: Money::from_cents(0),
        },
    );
    let order = engine.commit(request(ALICE, &[1], 10)).await.unwrap();
    assert_eq!(order.total_price.cents(), 1000);
}
