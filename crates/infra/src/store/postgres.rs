//! Postgres-backed store.
//!
//! Product and order rows are locked with `SELECT … FOR UPDATE`; the lock wait
//! is bounded per transaction with `SET LOCAL lock_timeout`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (lock not available) | `55P03` | `LockTimeout` |
//! | Database (deadlock detected) | `40P01` | `LockTimeout` |
//! | Database (serialization failure) | `40001` | `LockTimeout` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / PoolTimedOut / other | N/A | `Database` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use storefront_core::{MovementId, OrderId, ProductId, UserId};
use storefront_inventory::{MovementType, PendingMovement, Product, StockMovement};
use storefront_sales::{CustomerInfo, OrderItem, OrderNumber, OrderSnapshot, ShippingAddress};

use super::{OrderFilter, Store, StoreTx};
use crate::error::StoreError;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        sku         TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        price       BIGINT NOT NULL CHECK (price >= 0),
        stock       BIGINT NOT NULL CHECK (stock >= 0),
        stock_min   BIGINT NOT NULL DEFAULT 0,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        sequence      BIGSERIAL PRIMARY KEY,
        movement_id   UUID NOT NULL UNIQUE,
        product_id    UUID NOT NULL REFERENCES products (id),
        order_id      UUID NULL,
        movement_type TEXT NOT NULL,
        quantity      BIGINT NOT NULL,
        stock_before  BIGINT NOT NULL,
        stock_after   BIGINT NOT NULL,
        reason        TEXT NOT NULL,
        user_id       UUID NOT NULL,
        occurred_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS stock_movements_product_idx ON stock_movements (product_id, sequence)",
    "CREATE INDEX IF NOT EXISTS stock_movements_order_idx ON stock_movements (order_id, sequence)",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id               UUID PRIMARY KEY,
        order_number     TEXT NOT NULL UNIQUE,
        status           TEXT NOT NULL,
        order_type       TEXT NOT NULL,
        delivery_option  TEXT NOT NULL,
        customer_name    TEXT NOT NULL,
        customer_email   TEXT NOT NULL,
        customer_phone   TEXT NULL,
        shipping_address JSONB NULL,
        subtotal         BIGINT NOT NULL,
        shipping_cost    BIGINT NOT NULL,
        total            BIGINT NOT NULL,
        notes            TEXT NULL,
        user_id          UUID NOT NULL,
        created_at       TIMESTAMPTZ NOT NULL,
        updated_at       TIMESTAMPTZ NOT NULL,
        deleted_at       TIMESTAMPTZ NULL,
        version          BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        order_id     UUID NOT NULL REFERENCES orders (id),
        line_no      INTEGER NOT NULL,
        product_id   UUID NOT NULL,
        product_name TEXT NOT NULL,
        sku          TEXT NOT NULL,
        unit_price   BIGINT NOT NULL,
        quantity     BIGINT NOT NULL,
        subtotal     BIGINT NOT NULL,
        PRIMARY KEY (order_id, line_no)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_sequences (
        day        DATE PRIMARY KEY,
        last_value BIGINT NOT NULL
    )
    "#,
];

const ORDER_COLUMNS: &str = "id, order_number, status, order_type, delivery_option, customer_name, \
     customer_email, customer_phone, shipping_address, subtotal, shipping_cost, total, notes, \
     user_id, created_at, updated_at, deleted_at, version";

const MOVEMENT_COLUMNS: &str = "sequence, movement_id, product_id, order_id, movement_type, quantity, \
     stock_before, stock_after, reason, user_id, occurred_at";

/// Postgres-backed transactional store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, lock_timeout))
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // SET does not take bind parameters; the value is an integer we format.
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(Box::new(PostgresTx { tx }))
    }
}

/// Transaction over a [`PostgresStore`]. Dropping it rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    async fn fetch_product(&mut self, id: ProductId, for_update: bool) -> Result<Option<Product>, StoreError> {
        let sql = if for_update {
            "SELECT id, sku, name, price, stock, stock_min FROM products WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, sku, name, price, stock, stock_min FROM products WHERE id = $1"
        };

        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map_err(corrupt).map(Product::from))
            .transpose()
    }

    async fn fetch_movements(&mut self, column: &str, id: Uuid) -> Result<Vec<StockMovement>, StoreError> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE {column} = $1 ORDER BY sequence ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_movements", e))?;

        rows.iter()
            .map(|r| MovementRow::from_row(r).map_err(corrupt)?.try_into())
            .collect()
    }

    async fn fetch_order(&mut self, id: OrderId, for_update: bool) -> Result<Option<OrderSnapshot>, StoreError> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1{lock}");

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("fetch_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = OrderRow::from_row(&row).map_err(corrupt)?;
        let items = self.fetch_items(&[order.id]).await?;
        order.into_snapshot(items).map(Some)
    }

    async fn fetch_items(&mut self, order_ids: &[Uuid]) -> Result<Vec<(Uuid, OrderItem)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, sku, unit_price, quantity, subtotal
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("fetch_items", e))?;

        rows.iter()
            .map(|r| {
                let row = ItemRow::from_row(r).map_err(corrupt)?;
                Ok((row.order_id, row.into()))
            })
            .collect()
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, price, stock, stock_min)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price as i64)
        .bind(product.stock)
        .bind(product.stock_min)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_product(id, false).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_product(id, true).await
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_product_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, sku, name, price, stock, stock_min FROM products ORDER BY sku")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|r| ProductRow::from_row(r).map(Product::from).map_err(corrupt))
            .collect()
    }

    #[instrument(
        skip(self, movement),
        fields(product_id = %movement.product_id, movement_type = %movement.movement_type),
        err
    )]
    async fn append_movement(&mut self, movement: PendingMovement) -> Result<StockMovement, StoreError> {
        let sequence: i64 = sqlx::query(
            r#"
            INSERT INTO stock_movements (
                movement_id, product_id, order_id, movement_type, quantity,
                stock_before, stock_after, reason, user_id, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING sequence
            "#,
        )
        .bind(movement.movement_id.as_uuid())
        .bind(movement.product_id.as_uuid())
        .bind(movement.order_id.map(|o| *o.as_uuid()))
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.reason)
        .bind(movement.user_id.as_uuid())
        .bind(movement.occurred_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_movement", e))?
        .try_get("sequence")
        .map_err(corrupt)?;

        Ok(movement.commit(sequence as u64))
    }

    async fn movements_for_product(&mut self, id: ProductId) -> Result<Vec<StockMovement>, StoreError> {
        self.fetch_movements("product_id", *id.as_uuid()).await
    }

    async fn movements_for_order(&mut self, id: OrderId) -> Result<Vec<StockMovement>, StoreError> {
        self.fetch_movements("order_id", *id.as_uuid()).await
    }

    #[instrument(skip(self), err)]
    async fn next_order_sequence(&mut self, day: NaiveDate) -> Result<u64, StoreError> {
        let value: i64 = sqlx::query(
            r#"
            INSERT INTO order_sequences (day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = order_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("next_order_sequence", e))?
        .try_get("last_value")
        .map_err(corrupt)?;

        Ok(value as u64)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, order_number = %order.order_number), err)]
    async fn insert_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError> {
        let address = order
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("shipping address: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, status, order_type, delivery_option, customer_name,
                customer_email, customer_phone, shipping_address, subtotal, shipping_cost, total,
                notes, user_id, created_at, updated_at, deleted_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.status.as_str())
        .bind(order.order_type.as_str())
        .bind(order.delivery_option.as_str())
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(address)
        .bind(order.subtotal as i64)
        .bind(order.shipping_cost as i64)
        .bind(order.total as i64)
        .bind(&order.notes)
        .bind(order.user_id.as_uuid())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .bind(order.version as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, line_no, product_id, product_name, sku, unit_price, quantity, subtotal
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(&item.sku)
            .bind(item.unit_price as i64)
            .bind(item.quantity)
            .bind(item.subtotal as i64)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError> {
        self.fetch_order(id, false).await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError> {
        self.fetch_order(id, true).await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status), err)]
    async fn update_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, updated_at = $3, deleted_at = $4, version = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(order.deleted_at)
        .bind(order.version as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        }
        Ok(())
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<OrderSnapshot>, StoreError> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2 OR deleted_at IS NULL)
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY created_at DESC, order_number DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.include_deleted)
            .bind(filter.user_id.map(|u| *u.as_uuid()))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let orders: Vec<OrderRow> = rows
            .iter()
            .map(|r| OrderRow::from_row(r).map_err(corrupt))
            .collect::<Result<_, _>>()?;
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = self.fetch_items(&ids).await?;

        orders
            .into_iter()
            .map(|o| {
                let own = items.iter().filter(|(id, _)| *id == o.id).cloned().collect();
                o.into_snapshot(own)
            })
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("55P03") | Some("40P01") | Some("40001") => StoreError::LockTimeout(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("unexpected row not found in {operation}")),
        _ => StoreError::Database(format!("sqlx error in {operation}: {err}")),
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode row: {err}"))
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
{
    raw.parse::<T>()
        .map_err(|_| StoreError::Corrupt(format!("unexpected {column} '{raw}'")))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    price: i64,
    stock: i64,
    stock_min: i64,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            stock_min: row.try_get("stock_min")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            sku: row.sku,
            name: row.name,
            price: row.price as u64,
            stock: row.stock,
            stock_min: row.stock_min,
        }
    }
}

#[derive(Debug)]
struct MovementRow {
    sequence: i64,
    movement_id: Uuid,
    product_id: Uuid,
    order_id: Option<Uuid>,
    movement_type: String,
    quantity: i64,
    stock_before: i64,
    stock_after: i64,
    reason: String,
    user_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            sequence: row.try_get("sequence")?,
            movement_id: row.try_get("movement_id")?,
            product_id: row.try_get("product_id")?,
            order_id: row.try_get("order_id")?,
            movement_type: row.try_get("movement_type")?,
            quantity: row.try_get("quantity")?,
            stock_before: row.try_get("stock_before")?,
            stock_after: row.try_get("stock_after")?,
            reason: row.try_get("reason")?,
            user_id: row.try_get("user_id")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            movement_id: MovementId::from_uuid(row.movement_id),
            sequence: row.sequence as u64,
            product_id: ProductId::from_uuid(row.product_id),
            order_id: row.order_id.map(OrderId::from_uuid),
            movement_type: parse_column::<MovementType>("movement_type", &row.movement_type)?,
            quantity: row.quantity,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            reason: row.reason,
            user_id: UserId::from_uuid(row.user_id),
            occurred_at: row.occurred_at,
        })
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    status: String,
    order_type: String,
    delivery_option: String,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: Option<serde_json::Value>,
    subtotal: i64,
    shipping_cost: i64,
    total: i64,
    notes: Option<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            status: row.try_get("status")?,
            order_type: row.try_get("order_type")?,
            delivery_option: row.try_get("delivery_option")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            shipping_address: row.try_get("shipping_address")?,
            subtotal: row.try_get("subtotal")?,
            shipping_cost: row.try_get("shipping_cost")?,
            total: row.try_get("total")?,
            notes: row.try_get("notes")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl OrderRow {
    fn into_snapshot(self, items: Vec<(Uuid, OrderItem)>) -> Result<OrderSnapshot, StoreError> {
        let shipping_address = self
            .shipping_address
            .map(serde_json::from_value::<ShippingAddress>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("shipping address of order {}: {e}", self.id)))?;

        Ok(OrderSnapshot {
            id: OrderId::from_uuid(self.id),
            order_number: OrderNumber::parse(&self.order_number)
                .map_err(|e| StoreError::Corrupt(format!("order_number: {e}")))?,
            status: parse_column("status", &self.status)?,
            order_type: parse_column("order_type", &self.order_type)?,
            delivery_option: parse_column("delivery_option", &self.delivery_option)?,
            customer: CustomerInfo {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            items: items.into_iter().map(|(_, item)| item).collect(),
            shipping_address,
            subtotal: self.subtotal as u64,
            shipping_cost: self.shipping_cost as u64,
            total: self.total as u64,
            notes: self.notes,
            user_id: UserId::from_uuid(self.user_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            version: self.version as u64,
        })
    }
}

#[derive(Debug)]
struct ItemRow {
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    sku: String,
    unit_price: i64,
    quantity: i64,
    subtotal: i64,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            sku: row.try_get("sku")?,
            unit_price: row.try_get("unit_price")?,
            quantity: row.try_get("quantity")?,
            subtotal: row.try_get("subtotal")?,
        })
    }
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        OrderItem {
            product_id: ProductId::from_uuid(row.product_id),
            product_name: row.product_name,
            sku: row.sku,
            unit_price: row.unit_price as u64,
            quantity: row.quantity,
            subtotal: row.subtotal as u64,
        }
    }
}
