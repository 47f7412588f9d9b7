use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use tavolo_core::repository::OrderRepository;
use tavolo_core::{DeliveryDetails, Order, OrderLineItem, OrderStatus, StoreError};

/// Postgres-backed order persistence. The `payment_reference` column
/// carries a unique index, so concurrent webhook deliveries of the same
/// event race safely: exactly one insert wins, the loser sees
/// `DuplicateReference`.
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: String,
    restaurant_id: Uuid,
    items: Json<Vec<OrderLineItem>>,
    total_amount: i64,
    delivery: Json<DeliveryDetails>,
    status: String,
    payment_reference: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Backend(format!("unknown order status in storage: {}", row.status).into())
        })?;
        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            restaurant_id: row.restaurant_id,
            items: row.items.0,
            total_amount: row.total_amount,
            delivery: row.delivery.0,
            status,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, restaurant_id, items, total_amount, delivery, \
                             status, payment_reference, created_at, updated_at";

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, restaurant_id, items, total_amount, delivery,
                                status, payment_reference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(&order.customer_id)
        .bind(order.restaurant_id)
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(Json(&order.delivery))
        .bind(order.status.as_str())
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateReference)
            }
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(Order::try_from).transpose()
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        // Compare-and-set: the write only lands if the persisted status is
        // still the one the caller validated against.
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.as_str())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE restaurant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(Order::try_from).collect()
    }
}
