use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{MenuItem, Order, OrderStatus, Restaurant};

/// Read-only access to restaurant and menu data. The tables behind this are
/// owned by the restaurant CRUD subsystem; this core only resolves
/// authoritative names, prices and availability by id.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError>;

    /// Resolve menu items by id, scoped to one restaurant. Items belonging
    /// to other restaurants are simply absent from the result.
    async fn resolve_menu_items(
        &self,
        restaurant_id: Uuid,
        menu_ids: &[Uuid],
    ) -> Result<Vec<MenuItem>, StoreError>;
}

/// Repository trait for order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order. Fails with `StoreError::DuplicateReference` if
    /// an order with the same payment reference already exists.
    async fn create_order(&self, order: &Order) -> Result<(), StoreError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Compare-and-set status update: succeeds (returns `true`) only if the
    /// persisted status still equals `from` at the time of the write.
    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError>;

    /// Customer's orders, newest first.
    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError>;

    /// A restaurant's incoming orders, newest first.
    async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>, StoreError>;
}
