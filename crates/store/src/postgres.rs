use async_trait::async_trait;
use common::{AddressId, ProductId, SkuId, UserId};
use domain::{Address, Money, OrderHeader, OrderId, OrderLine, OrderStatus, PayMethod, Sku};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{AddressBook, Catalog, OrderStore, UnitOfWork},
};

const SKU_COLUMNS: &str = "id, product_id, name, price_cents, stock, sales";
const ORDER_COLUMNS: &str = "order_id, user_id, address_id, pay_method, status, total_count, \
     total_price_cents, transit_price_cents, trade_no, created_at";
const LINE_COLUMNS: &str = "order_id, sku_id, count, price_cents, comment";

/// PostgreSQL-backed store.
///
/// Units of work are database transactions; `lock_sku` and `lock_order` use
/// `SELECT ... FOR UPDATE`, so a second checkout of the same SKU blocks until
/// the first one commits or rolls back and then sees the updated stock.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("storefront migrations applied");
        Ok(())
    }
}

fn to_count(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("{column} out of range: {value}")))
}

fn row_to_sku(row: PgRow) -> Result<Sku> {
    Ok(Sku {
        id: SkuId::new(row.try_get("id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_count(row.try_get("stock")?, "stock")?,
        sales: to_count(row.try_get("sales")?, "sales")?,
    })
}

fn row_to_address(row: PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        receiver: row.try_get("receiver")?,
        addr: row.try_get("addr")?,
        zip_code: row.try_get("zip_code")?,
        phone: row.try_get("phone")?,
        is_default: row.try_get("is_default")?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderHeader> {
    let pay_method: i16 = row.try_get("pay_method")?;
    let status: i16 = row.try_get("status")?;

    Ok(OrderHeader {
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        address_id: AddressId::new(row.try_get("address_id")?),
        pay_method: PayMethod::from_code(pay_method)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown pay_method {pay_method}")))?,
        status: OrderStatus::from_code(status)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown status {status}")))?,
        total_count: to_count(row.try_get("total_count")?, "total_count")?,
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        transit_price: Money::from_cents(row.try_get("transit_price_cents")?),
        trade_no: row.try_get("trade_no")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_line(row: PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        sku_id: SkuId::new(row.try_get("sku_id")?),
        count: to_count(row.try_get("count")?, "count")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        comment: row.try_get("comment")?,
    })
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn find_sku(&self, sku_id: SkuId) -> Result<Option<Sku>> {
        let row = sqlx::query(&format!("SELECT {SKU_COLUMNS} FROM skus WHERE id = $1"))
            .bind(sku_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_sku).transpose()
    }
}

#[async_trait]
impl AddressBook for PostgresStore {
    async fn find_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, receiver, addr, zip_code, phone, is_default
            FROM addresses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(address_id.as_i64())
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_address).transpose()
    }

    async fn addresses_for_user(&self, user_id: UserId) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, receiver, addr, zip_code, phone, is_default
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, id ASC
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_order(&self, order_id: &OrderId) -> Result<Option<OrderHeader>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_order).transpose()
    }

    async fn order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY sku_id ASC"
        ))
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_line).collect()
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderHeader>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, order_id DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order).collect()
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_order(&mut self, order: &OrderHeader) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, address_id, pay_method, status, total_count,
                                total_price_cents, transit_price_cents, trade_no, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.order_id.as_str())
        .bind(order.user_id.as_i64())
        .bind(order.address_id.as_i64())
        .bind(order.pay_method.code())
        .bind(order.status.code())
        .bind(i64::from(order.total_count))
        .bind(order.total_price.cents())
        .bind(order.transit_price.cents())
        .bind(order.trade_no.as_deref())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order.order_id.clone());
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn lock_sku(&mut self, sku_id: SkuId) -> Result<Option<Sku>> {
        let row = sqlx::query(&format!(
            "SELECT {SKU_COLUMNS} FROM skus WHERE id = $1 FOR UPDATE"
        ))
        .bind(sku_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_sku).transpose()
    }

    async fn insert_line(&mut self, line: &OrderLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, sku_id, count, price_cents, comment)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(line.order_id.as_str())
        .bind(line.sku_id.as_i64())
        .bind(i64::from(line.count))
        .bind(line.price.cents())
        .bind(line.comment.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateLine {
                    order_id: line.order_id.clone(),
                    sku_id: line.sku_id,
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn record_sale(&mut self, sku_id: SkuId, count: u32) -> Result<()> {
        let count = i64::from(count);
        let updated = sqlx::query(
            r#"
            UPDATE skus
            SET stock = stock - $2, sales = sales + $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(sku_id.as_i64())
        .bind(count)
        .fetch_optional(&mut *self.tx)
        .await?;

        if updated.is_some() {
            return Ok(());
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM skus WHERE id = $1")
            .bind(sku_id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;
        tracing::warn!(%sku_id, count, ?available, "sale rejected by stock guard");
        match available {
            Some(available) => Err(StoreError::StockUnderflow {
                sku_id,
                requested: to_count(count, "count")?,
                available: to_count(available, "stock")?,
            }),
            None => Err(StoreError::Missing {
                entity: "sku",
                id: sku_id.to_string(),
            }),
        }
    }

    async fn finalize_order(
        &mut self,
        order_id: &OrderId,
        total_count: u32,
        total_price: Money,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET total_count = $2, total_price_cents = $3, updated_at = NOW()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .bind(i64::from(total_count))
        .bind(total_price.cents())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "order",
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    async fn lock_order(&mut self, order_id: &OrderId) -> Result<Option<OrderHeader>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_order).transpose()
    }

    async fn lines(&mut self, order_id: &OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY sku_id ASC"
        ))
        .bind(order_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_line).collect()
    }

    async fn set_comment(
        &mut self,
        order_id: &OrderId,
        sku_id: SkuId,
        comment: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE order_lines SET comment = $3 WHERE order_id = $1 AND sku_id = $2",
        )
        .bind(order_id.as_str())
        .bind(sku_id.as_i64())
        .bind(comment)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
        trade_no: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, trade_no = COALESCE($3, trade_no), updated_at = NOW()
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_str())
        .bind(status.code())
        .bind(trade_no)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                entity: "order",
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
