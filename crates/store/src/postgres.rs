use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MenuItemId, OrderId};
use domain::{
    Category, MenuItem, Money, Order, OrderLine, OrderNumber, OrderParts, OrderStats,
    OrderStatus, StatusSummary,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    InventoryLedger, MenuQuery, OrderQuery, OrderStore, Result, StatusChange, StoreError,
};

const MENU_ITEM_COLUMNS: &str = "id, name, description, price_cents, stock, category, image, \
     is_available, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, items, total_amount_cents, status, \
     customer_name, customer_phone, pickup_time, payment_status, payment_method, notes, \
     created_at, updated_at, expires_at";

/// PostgreSQL-backed inventory ledger and order store.
///
/// Stock changes are single conditional `UPDATE` statements and status
/// changes lock the order row for the duration of the check and the write.
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
        Ok(())
    }

    fn row_to_menu_item(row: PgRow) -> Result<MenuItem> {
        let category: String = row.try_get("category")?;
        let stock: i64 = row.try_get("stock")?;

        Ok(MenuItem {
            id: MenuItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: u32::try_from(stock)
                .map_err(|_| StoreError::Corrupt(format!("stock {stock} out of range")))?,
            category: category
                .parse::<Category>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            image: row.try_get("image")?,
            is_available: row.try_get("is_available")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items: Vec<OrderLine> = serde_json::from_value(row.try_get("items")?)?;
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;
        let payment_method: String = row.try_get("payment_method")?;
        let corrupt = |e: domain::OrderError| StoreError::Corrupt(e.to_string());

        Ok(Order::from_parts(OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            items,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            status: status.parse().map_err(corrupt)?,
            customer_name: row.try_get("customer_name")?,
            customer_phone: row.try_get("customer_phone")?,
            pickup_time: row.try_get("pickup_time")?,
            payment_status: payment_status.parse().map_err(corrupt)?,
            payment_method: payment_method.parse().map_err(corrupt)?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }
}

#[async_trait]
impl InventoryLedger for PostgresStore {
    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_menu_item).transpose()
    }

    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_menu_item).collect()
    }

    async fn list_menu_items(&self, query: MenuQuery) -> Result<Vec<MenuItem>> {
        let mut sql = format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE 1=1");

        if query.category.is_some() {
            sql.push_str(" AND category = $1");
        }
        if query.available_only {
            sql.push_str(" AND is_available");
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(category) = query.category {
            sqlx_query = sqlx_query.bind(category.as_str());
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        let mut items = rows
            .into_iter()
            .map(Self::row_to_menu_item)
            .collect::<Result<Vec<_>>>()?;

        // Categories sort in meal order, not alphabetically
        items.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn upsert_menu_item(&self, item: MenuItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO menu_items (id, name, description, price_cents, stock, category, image, is_available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                category = EXCLUDED.category,
                image = EXCLUDED.image,
                is_available = EXCLUDED.is_available,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .bind(i64::from(item.stock))
        .bind(item.category.as_str())
        .bind(&item.image)
        .bind(item.is_available)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reserve(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem> {
        loop {
            let row: Option<PgRow> = sqlx::query(&format!(
                "UPDATE menu_items SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND is_available AND stock >= $2 \
                 RETURNING {MENU_ITEM_COLUMNS}"
            ))
            .bind(id.as_uuid())
            .bind(i64::from(quantity))
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return Self::row_to_menu_item(row);
            }

            // Nothing matched; find out which condition failed
            let item = self
                .get_menu_item(id)
                .await?
                .ok_or(StoreError::MenuItemNotFound(id))?;
            item.check_reservable(quantity)
                .map_err(|e| StoreError::from_menu(id, e))?;

            tracing::debug!(menu_item_id = %id, "Stock changed between update and read, retrying");
        }
    }

    async fn release(&self, id: MenuItemId, quantity: u32) -> Result<MenuItem> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "UPDATE menu_items SET stock = stock + $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {MENU_ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_menu_item(row),
            None => Err(StoreError::MenuItemNotFound(id)),
        }
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: Order) -> Result<()> {
        let items = serde_json::to_value(order.items())?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, items, total_amount_cents, status, customer_name, customer_phone,
                                pickup_time, payment_status, payment_method, notes, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(items)
        .bind(order.total_amount().cents())
        .bind(order.status().as_str())
        .bind(order.customer_name())
        .bind(order.customer_phone())
        .bind(order.pickup_time())
        .bind(order.payment_status().as_str())
        .bind(order.payment_method().as_str())
        .bind(order.notes())
        .bind(order.created_at())
        .bind(order.updated_at())
        .bind(order.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_number_key")
            {
                return StoreError::DuplicateOrderNumber(order.order_number().clone());
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.customer_phone.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_phone = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(phone) = query.customer_phone {
            sqlx_query = sqlx_query.bind(phone);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: &[OrderStatus],
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let mut tx = self.pool.begin().await?;

        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let previous = match row {
            Some(row) => Self::row_to_order(row)?,
            None => return Err(StoreError::OrderNotFound(id)),
        };

        if !from.contains(&previous.status()) {
            return Err(StoreError::StatusConflict {
                order_id: id,
                actual: previous.status(),
            });
        }

        let mut current = previous.clone();
        current.apply_status(to, at);

        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(StatusChange { previous, current })
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Order>> {
        let statuses: Vec<&str> = OrderStatus::EXPIRABLE.iter().map(|s| s.as_str()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status = ANY($1) AND expires_at < $2 \
             ORDER BY expires_at ASC"
        ))
        .bind(statuses)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn stats(&self) -> Result<OrderStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount_cents), 0)::BIGINT AS total
            FROM orders
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let breakdown = rows
            .into_iter()
            .map(|row| -> Result<StatusSummary> {
                let status: String = row.try_get("status")?;
                let count: i64 = row.try_get("count")?;
                Ok(StatusSummary {
                    status: status
                        .parse()
                        .map_err(|e: domain::OrderError| StoreError::Corrupt(e.to_string()))?,
                    count: count.max(0) as u64,
                    total_amount: Money::from_cents(row.try_get("total")?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderStats::from_breakdown(breakdown))
    }
}
