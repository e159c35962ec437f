//! Storefront facade wiring cart, checkout, orders and payments together.

use cart::{CartService, CartStore, CartView, InMemoryCartStore, RedisCartStore};
use checkout::{
    CheckoutPreview, CommentOutcome, CommitRequest, OrderService, SettlementEngine,
};
use common::{AddressId, SkuId, UserId};
use domain::{OrderHeader, OrderId, OrderView};
use payment::{PaymentGateway, PaymentReconciler, PaymentStatus, ScriptedGateway};
use sqlx::postgres::PgPoolOptions;
use store::{AddressBook, Catalog, InMemoryStore, OrderStore, PostgresStore};

use crate::config::Config;
use crate::error::StorefrontError;

type Result<T> = std::result::Result<T, StorefrontError>;

/// The storefront core as seen by a request handler.
///
/// Every operation takes the authenticated user id; ownership of carts,
/// addresses and orders is enforced below this layer.
pub struct Storefront<S, C, G>
where
    S: OrderStore + AddressBook + Catalog + Clone,
    C: CartStore + Clone,
    G: PaymentGateway,
{
    cart: CartService<C, S>,
    checkout: SettlementEngine<S, C>,
    orders: OrderService<S>,
    payments: PaymentReconciler<S, G>,
}

impl<S, C, G> Storefront<S, C, G>
where
    S: OrderStore + AddressBook + Catalog + Clone,
    C: CartStore + Clone,
    G: PaymentGateway,
{
    /// Wires the services over the given backends.
    pub fn new(store: S, carts: C, gateway: G, config: &Config) -> Self {
        Self {
            cart: CartService::new(carts.clone(), store.clone()),
            checkout: SettlementEngine::new(store.clone(), carts, config.settlement()),
            orders: OrderService::new(store.clone()),
            payments: PaymentReconciler::new(
                OrderService::new(store),
                gateway,
                config.payment(),
            ),
        }
    }

    /// Adds units of a SKU to the cart; returns the number of distinct SKUs.
    pub async fn add_to_cart(&self, user_id: UserId, sku_id: SkuId, count: i64) -> Result<usize> {
        Ok(self.cart.add(user_id, sku_id, count).await?)
    }

    /// Replaces the quantity of a SKU; returns the total units in the cart.
    pub async fn update_cart(&self, user_id: UserId, sku_id: SkuId, count: i64) -> Result<u32> {
        Ok(self.cart.update(user_id, sku_id, count).await?)
    }

    /// Removes a SKU from the cart; returns the total units left.
    pub async fn remove_from_cart(&self, user_id: UserId, sku_id: SkuId) -> Result<u32> {
        Ok(self.cart.delete(user_id, sku_id).await?)
    }

    /// Returns the priced cart.
    pub async fn cart(&self, user_id: UserId) -> Result<CartView> {
        Ok(self.cart.list(user_id).await?)
    }

    /// Returns the number of distinct SKUs in the cart.
    pub async fn cart_count(&self, user_id: UserId) -> Result<usize> {
        Ok(self.cart.item_count(user_id).await?)
    }

    /// Prices the selected cart entries before placing the order.
    pub async fn preview_order(&self, user_id: UserId, sku_ids: &[SkuId]) -> Result<CheckoutPreview> {
        Ok(self.checkout.preview(user_id, sku_ids).await?)
    }

    /// Settles the selected cart entries into an order.
    pub async fn place_order(
        &self,
        user_id: UserId,
        sku_ids: Vec<SkuId>,
        pay_method: i16,
        address_id: AddressId,
    ) -> Result<OrderHeader> {
        let request = CommitRequest {
            user_id,
            sku_ids,
            pay_method,
            address_id,
        };
        Ok(self.checkout.commit(request).await?)
    }

    /// Returns one of the user's orders.
    pub async fn order(&self, user_id: UserId, order_id: &OrderId) -> Result<OrderView> {
        Ok(self.orders.order_detail(user_id, order_id).await?)
    }

    /// Returns the user's orders, newest first.
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<OrderView>> {
        Ok(self.orders.orders_for_user(user_id).await?)
    }

    /// Records a buyer comment on an order line.
    pub async fn comment(
        &self,
        user_id: UserId,
        order_id: &OrderId,
        sku_id: SkuId,
        comment: &str,
    ) -> Result<CommentOutcome> {
        Ok(self
            .orders
            .submit_comment(user_id, order_id, sku_id, comment)
            .await?)
    }

    /// Returns the gateway URL the buyer pays on.
    pub async fn pay(&self, user_id: UserId, order_id: &OrderId) -> Result<String> {
        Ok(self.payments.initiate_payment(user_id, order_id).await?)
    }

    /// Waits for the gateway to settle the order's payment.
    pub async fn check_payment(&self, user_id: UserId, order_id: &OrderId) -> Result<PaymentStatus> {
        Ok(self.payments.check_payment(user_id, order_id).await?)
    }

    /// Asks the gateway once about the order's payment.
    pub async fn check_payment_once(
        &self,
        user_id: UserId,
        order_id: &OrderId,
    ) -> Result<PaymentStatus> {
        Ok(self.payments.check_payment_once(user_id, order_id).await?)
    }
}

impl Storefront<InMemoryStore, InMemoryCartStore, ScriptedGateway> {
    /// Builds a storefront over in-memory backends.
    ///
    /// The backends are returned as well so callers can seed the catalog and
    /// script the gateway.
    pub fn in_memory(config: &Config) -> (Self, InMemoryStore, ScriptedGateway) {
        let store = InMemoryStore::new();
        let gateway = ScriptedGateway::new();
        let storefront = Self::new(
            store.clone(),
            InMemoryCartStore::new(),
            gateway.clone(),
            config,
        );
        (storefront, store, gateway)
    }
}

impl<G: PaymentGateway> Storefront<PostgresStore, RedisCartStore, G> {
    /// Connects to PostgreSQL and Redis using `DATABASE_URL` and `REDIS_URL`.
    pub async fn connect(config: &Config, gateway: G) -> Result<Self> {
        let store = connect_postgres(config).await?;
        let redis_url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| StorefrontError::Config("REDIS_URL is not set".to_string()))?;
        let carts = RedisCartStore::connect(redis_url).await?;
        Ok(Self::new(store, carts, gateway, config))
    }
}

/// Opens the PostgreSQL pool named by `DATABASE_URL`.
pub async fn connect_postgres(config: &Config) -> Result<PostgresStore> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StorefrontError::Config("DATABASE_URL is not set".to_string()))?;
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .map_err(store::StoreError::from)?;
    Ok(PostgresStore::new(pool))
}
