use async_trait::async_trait;
use common::{OrderId, OrderItemId, Version};
use domain::{
    CustomerId, Money, Order, OrderItemRecord, OrderRecord, OrderRepository, OrderStatus,
    ProductId, ProductVariantId, RepositoryError, ShippingAddress,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::restore::restore;
use crate::{Result, StoreError};

const ORDER_COLUMNS: &str = r#"
    id, order_number, customer_id, status, subtotal, tax_amount, shipping_amount,
    discount_amount, total_amount, currency, shipping_address, source_channel, version,
    order_date, confirmed_at, payment_completed_at, shipped_at, delivered_at, cancelled_at,
    created_at, updated_at
"#;

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new PostgreSQL order repository.
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

    async fn load(&self, row: Option<PgRow>) -> Result<Option<Order>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let order_id: Uuid = row.try_get("id")?;
        let item_rows = sqlx::query(
            r#"
            SELECT id, product_id, product_variant_id, product_name, product_sku,
                   variant_name, quantity, unit_price, total_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(Self::row_to_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(restore(Self::row_to_order(row, items)?)))
    }

    fn row_to_order(row: PgRow, items: Vec<OrderItemRecord>) -> Result<OrderRecord> {
        let status: String = row.try_get("status")?;
        let address: serde_json::Value = row.try_get("shipping_address")?;

        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            subtotal: money(&row, "subtotal")?,
            tax_amount: money(&row, "tax_amount")?,
            shipping_amount: money(&row, "shipping_amount")?,
            discount_amount: money(&row, "discount_amount")?,
            total_amount: money(&row, "total_amount")?,
            currency: row.try_get("currency")?,
            shipping_address: serde_json::from_value::<ShippingAddress>(address)?,
            source_channel: row.try_get("source_channel")?,
            version: Version::new(row.try_get("version")?),
            order_date: row.try_get("order_date")?,
            confirmed_at: row.try_get("confirmed_at")?,
            payment_completed_at: row.try_get("payment_completed_at")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
        let quantity: i32 = row.try_get("quantity")?;

        Ok(OrderItemRecord {
            id: OrderItemId::from_uuid(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_variant_id: row
                .try_get::<Option<i64>, _>("product_variant_id")?
                .map(ProductVariantId::new),
            product_name: row.try_get("product_name")?,
            product_sku: row.try_get("product_sku")?,
            variant_name: row.try_get("variant_name")?,
            quantity: u32::try_from(quantity)
                .map_err(|_| StoreError::Decode(format!("negative quantity {quantity}")))?,
            unit_price: money(&row, "unit_price")?,
            total_price: money(&row, "total_price")?,
        })
    }

    async fn insert_items(tx: &mut Transaction<'_, Postgres>, record: &OrderRecord) -> Result<()> {
        for (position, item) in record.items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::Decode(format!("quantity {} too large", item.quantity)))?;
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Decode(format!("item position {position} too large")))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, product_variant_id,
                                         product_name, product_sku, variant_name, quantity,
                                         unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(record.id.as_uuid())
            .bind(position)
            .bind(item.product_id.as_i64())
            .bind(item.product_variant_id.map(|id| id.as_i64()))
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(&item.variant_name)
            .bind(quantity)
            .bind(item.unit_price.amount())
            .bind(item.total_price.amount())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    Ok(Money::new(row.try_get::<Decimal, _>(column)?))
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert(&self, order: &Order) -> std::result::Result<(), RepositoryError> {
        let record = OrderRecord::from(order);
        let address = serde_json::to_value(&record.shipping_address).map_err(StoreError::from)?;

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21)
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(&record.order_number)
        .bind(record.customer_id.as_i64())
        .bind(record.status.as_str())
        .bind(record.subtotal.amount())
        .bind(record.tax_amount.amount())
        .bind(record.shipping_amount.amount())
        .bind(record.discount_amount.amount())
        .bind(record.total_amount.amount())
        .bind(&record.currency)
        .bind(address)
        .bind(&record.source_channel)
        .bind(record.version.as_i64())
        .bind(record.order_date)
        .bind(record.confirmed_at)
        .bind(record.payment_completed_at)
        .bind(record.shipped_at)
        .bind(record.delivered_at)
        .bind(record.cancelled_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                match db_err.constraint() {
                    Some("unique_order_number") => {
                        return RepositoryError::DuplicateOrderNumber(record.order_number.clone());
                    }
                    Some("orders_pkey") => {
                        return RepositoryError::ConcurrentModification {
                            order_id: record.id,
                            expected: record.version,
                            actual: record.version,
                        };
                    }
                    _ => {}
                }
            }
            StoreError::Database(e).into()
        })?;

        Self::insert_items(&mut tx, &record).await?;
        tx.commit().await.map_err(StoreError::from)?;

        metrics::counter!("order_store_writes_total", "op" => "insert").increment(1);
        Ok(())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), version = %order.version()))]
    async fn update(&self, order: &mut Order) -> std::result::Result<Version, RepositoryError> {
        let expected = order.version();
        let mut record = OrderRecord::from(&*order);
        record.version = expected.next();
        let address = serde_json::to_value(&record.shipping_address).map_err(StoreError::from)?;

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM orders WHERE id = $1 FOR UPDATE")
                .bind(record.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::from)?;

        let actual = current
            .map(Version::new)
            .ok_or(RepositoryError::OrderNotFound(record.id))?;
        if actual != expected {
            return Err(RepositoryError::ConcurrentModification {
                order_id: record.id,
                expected,
                actual,
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3, subtotal = $4, tax_amount = $5, shipping_amount = $6,
                discount_amount = $7, total_amount = $8, currency = $9, shipping_address = $10,
                source_channel = $11, version = $12, confirmed_at = $13,
                payment_completed_at = $14, shipped_at = $15, delivered_at = $16,
                cancelled_at = $17, updated_at = $18
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(expected.as_i64())
        .bind(record.status.as_str())
        .bind(record.subtotal.amount())
        .bind(record.tax_amount.amount())
        .bind(record.shipping_amount.amount())
        .bind(record.discount_amount.amount())
        .bind(record.total_amount.amount())
        .bind(&record.currency)
        .bind(address)
        .bind(&record.source_channel)
        .bind(record.version.as_i64())
        .bind(record.confirmed_at)
        .bind(record.payment_completed_at)
        .bind(record.shipped_at)
        .bind(record.delivered_at)
        .bind(record.cancelled_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        if updated.rows_affected() != 1 {
            return Err(RepositoryError::ConcurrentModification {
                order_id: record.id,
                expected,
                actual,
            });
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(record.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        Self::insert_items(&mut tx, &record).await?;

        tx.commit().await.map_err(StoreError::from)?;

        metrics::counter!("order_store_writes_total", "op" => "update").increment(1);
        Ok(order.advance_version())
    }

    async fn find_by_id(
        &self,
        order_id: OrderId,
    ) -> std::result::Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(self.load(row).await?)
    }

    async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> std::result::Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(self.load(row).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, order_id: OrderId) -> std::result::Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        metrics::counter!("order_store_writes_total", "op" => "delete").increment(1);
        Ok(result.rows_affected() > 0)
    }
}
