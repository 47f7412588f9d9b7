use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tavolo_core::repository::RestaurantRepository;
use tavolo_core::{MenuItem, Restaurant, StoreError};

/// Read-only lookups over the restaurant and menu tables. Those tables are
/// written by the restaurant CRUD subsystem; this core only resolves
/// authoritative names, prices and availability.
pub struct PgRestaurantRepository {
    pool: PgPool,
}

impl PgRestaurantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RestaurantRow {
    id: Uuid,
    owner_id: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    image: String,
    price: i64,
    is_available: bool,
}

#[async_trait]
impl RestaurantRepository for PgRestaurantRepository {
    async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        let row: Option<RestaurantRow> =
            sqlx::query_as("SELECT id, owner_id, name FROM restaurants WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;

        Ok(row.map(|r| Restaurant {
            id: r.id,
            owner_id: r.owner_id,
            name: r.name,
        }))
    }

    async fn resolve_menu_items(
        &self,
        restaurant_id: Uuid,
        menu_ids: &[Uuid],
    ) -> Result<Vec<MenuItem>, StoreError> {
        let rows: Vec<MenuRow> = sqlx::query_as(
            r#"
            SELECT id, restaurant_id, name, image, price, is_available
            FROM menus
            WHERE restaurant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(restaurant_id)
        .bind(menu_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows
            .into_iter()
            .map(|r| MenuItem {
                id: r.id,
                restaurant_id: r.restaurant_id,
                name: r.name,
                image: r.image,
                price: r.price,
                is_available: r.is_available,
            })
            .collect())
    }
}
