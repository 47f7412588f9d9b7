use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use tavolo_core::events::{OrderEvent, OrderStatusChangedEvent};
use tavolo_core::repository::{OrderRepository, RestaurantRepository};
use tavolo_core::{Order, OrderError, OrderStatus, StoreError};

/// Attempts before giving up on a contended status update.
const TRANSITION_RETRIES: usize = 3;

/// Lifecycle and authorization rules over persisted orders.
///
/// Ownership checks live here, not in upstream middleware: the store itself
/// verifies that the acting user owns the order's restaurant before any
/// transition or restaurant-scoped read.
pub struct OrderStore {
    orders: Arc<dyn OrderRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    events: broadcast::Sender<OrderEvent>,
}

impl OrderStore {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        events: broadcast::Sender<OrderEvent>,
    ) -> Self {
        Self {
            orders,
            restaurants,
            events,
        }
    }

    /// Advance an order's status. Only the owner of the order's restaurant
    /// may do this, and only strictly forward through the lifecycle;
    /// skipping intermediate states is allowed.
    ///
    /// The write is a compare-and-set against the status read here, retried
    /// on conflict, so concurrent updates can never regress state.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        acting_user_id: &str,
    ) -> Result<Order, OrderError> {
        for _ in 0..TRANSITION_RETRIES {
            let order = self
                .orders
                .get_order(order_id)
                .await?
                .ok_or(OrderError::OrderNotFound(order_id))?;

            let restaurant = self
                .restaurants
                .get_restaurant(order.restaurant_id)
                .await?
                .ok_or(OrderError::RestaurantNotFound(order.restaurant_id))?;
            if restaurant.owner_id != acting_user_id {
                return Err(OrderError::NotAuthorized);
            }

            if new_status.rank() <= order.status.rank() {
                return Err(OrderError::InvalidTransition {
                    from: order.status,
                    to: new_status,
                });
            }

            if self
                .orders
                .transition_status(order_id, order.status, new_status)
                .await?
            {
                tracing::info!(
                    order_id = %order_id,
                    from = order.status.as_str(),
                    to = new_status.as_str(),
                    "order status advanced"
                );
                let _ = self
                    .events
                    .send(OrderEvent::StatusChanged(OrderStatusChangedEvent {
                        order_id,
                        restaurant_id: order.restaurant_id,
                        from: order.status,
                        to: new_status,
                        timestamp: chrono::Utc::now().timestamp(),
                    }));
                let mut updated = order;
                updated.status = new_status;
                updated.updated_at = chrono::Utc::now();
                return Ok(updated);
            }
            // Lost the write race; re-read and re-validate.
        }

        Err(OrderError::Storage(StoreError::Conflict))
    }

    /// One order, visible to its customer or the owning restaurant only.
    pub async fn get_order(
        &self,
        order_id: Uuid,
        acting_user_id: &str,
    ) -> Result<Order, OrderError> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if order.customer_id == acting_user_id {
            return Ok(order);
        }
        let restaurant = self
            .restaurants
            .get_restaurant(order.restaurant_id)
            .await?;
        match restaurant {
            Some(r) if r.owner_id == acting_user_id => Ok(order),
            _ => Err(OrderError::NotAuthorized),
        }
    }

    /// A customer's own orders, newest first.
    pub async fn list_orders_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_customer(customer_id).await?)
    }

    /// Incoming orders for a restaurant, newest first. Restricted to the
    /// restaurant's owner.
    pub async fn list_orders_for_restaurant(
        &self,
        restaurant_id: Uuid,
        acting_user_id: &str,
    ) -> Result<Vec<Order>, OrderError> {
        let restaurant = self
            .restaurants
            .get_restaurant(restaurant_id)
            .await?
            .ok_or(OrderError::RestaurantNotFound(restaurant_id))?;
        if restaurant.owner_id != acting_user_id {
            return Err(OrderError::NotAuthorized);
        }
        Ok(self.orders.list_for_restaurant(restaurant_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryOrderRepository, MemoryRestaurantRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tavolo_core::{DeliveryDetails, OrderLineItem, Restaurant};

    /// Order storage under write contention: the first `cas_failures` CAS
    /// attempts report a lost race, optionally landing a rival status first
    /// so the retry re-reads a changed row.
    struct ContendedOrderRepository {
        inner: Arc<MemoryOrderRepository>,
        cas_failures: AtomicUsize,
        rival_status: Mutex<Option<OrderStatus>>,
        attempts: AtomicUsize,
    }

    impl ContendedOrderRepository {
        fn new(inner: Arc<MemoryOrderRepository>, cas_failures: usize) -> Self {
            Self {
                inner,
                cas_failures: AtomicUsize::new(cas_failures),
                rival_status: Mutex::new(None),
                attempts: AtomicUsize::new(0),
            }
        }

        fn with_rival(self, rival: OrderStatus) -> Self {
            *self.rival_status.lock().unwrap() = Some(rival);
            self
        }
    }

    #[async_trait]
    impl OrderRepository for ContendedOrderRepository {
        async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
            self.inner.create_order(order).await
        }

        async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
            self.inner.get_order(id).await
        }

        async fn find_by_payment_reference(
            &self,
            reference: &str,
        ) -> Result<Option<Order>, StoreError> {
            self.inner.find_by_payment_reference(reference).await
        }

        async fn transition_status(
            &self,
            id: Uuid,
            from: OrderStatus,
            to: OrderStatus,
        ) -> Result<bool, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let contended = self
                .cas_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if contended {
                let rival = self.rival_status.lock().unwrap().take();
                if let Some(rival) = rival {
                    self.inner.transition_status(id, from, rival).await?;
                }
                return Ok(false);
            }
            self.inner.transition_status(id, from, to).await
        }

        async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError> {
            self.inner.list_for_customer(customer_id).await
        }

        async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>, StoreError> {
            self.inner.list_for_restaurant(restaurant_id).await
        }
    }

    fn order(restaurant_id: Uuid, customer: &str, reference: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            customer_id: customer.to_string(),
            restaurant_id,
            items: vec![OrderLineItem {
                menu_id: Uuid::new_v4(),
                name: "Margherita".to_string(),
                image: "margherita.png".to_string(),
                price: 500,
                quantity: 2,
            }],
            total_amount: 1000,
            delivery: DeliveryDetails {
                email: "user@example.com".to_string(),
                name: "User One".to_string(),
                address: "1 Main St".to_string(),
                city: "Springfield".to_string(),
            },
            status: OrderStatus::Confirmed,
            payment_reference: reference.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (OrderStore, Arc<MemoryOrderRepository>, Uuid, Uuid) {
        let orders = Arc::new(MemoryOrderRepository::new());
        let restaurants = Arc::new(MemoryRestaurantRepository::new());
        let restaurant_id = Uuid::new_v4();
        restaurants.add_restaurant(Restaurant {
            id: restaurant_id,
            owner_id: "owner-1".to_string(),
            name: "Trattoria".to_string(),
        });

        let seeded = order(restaurant_id, "customer-1", "cs_1");
        let order_id = seeded.id;
        orders.create_order(&seeded).await.unwrap();

        let (tx, _) = broadcast::channel(16);
        let store = OrderStore::new(orders.clone(), restaurants, tx);
        (store, orders, restaurant_id, order_id)
    }

    #[tokio::test]
    async fn test_owner_advances_through_lifecycle() {
        let (store, _, _, order_id) = setup().await;

        for status in [
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            let updated = store
                .update_order_status(order_id, status, "owner-1")
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[tokio::test]
    async fn test_skipping_intermediate_states_is_allowed() {
        let (store, orders, _, order_id) = setup().await;

        store
            .update_order_status(order_id, OrderStatus::Delivered, "owner-1")
            .await
            .unwrap();
        let persisted = orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_equal_or_earlier_status_is_rejected() {
        let (store, _, _, order_id) = setup().await;

        store
            .update_order_status(order_id, OrderStatus::OutForDelivery, "owner-1")
            .await
            .unwrap();

        let err = store
            .update_order_status(order_id, OrderStatus::OutForDelivery, "owner-1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let err = store
            .update_order_status(order_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::OutForDelivery,
                to: OrderStatus::Preparing,
            }
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_advance_status() {
        let (store, orders, _, order_id) = setup().await;

        let err = store
            .update_order_status(order_id, OrderStatus::Preparing, "intruder")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotAuthorized));

        // Even the paying customer cannot.
        let err = store
            .update_order_status(order_id, OrderStatus::Preparing, "customer-1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotAuthorized));

        let persisted = orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_unknown_order_is_reported() {
        let (store, _, _, _) = setup().await;
        let missing = Uuid::new_v4();
        let err = store
            .update_order_status(missing, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_restaurant_listing_is_owner_gated_and_newest_first() {
        let (store, orders, restaurant_id, _) = setup().await;

        let mut second = order(restaurant_id, "customer-2", "cs_2");
        second.created_at = Utc::now() + chrono::Duration::seconds(5);
        let second_id = second.id;
        orders.create_order(&second).await.unwrap();

        let listed = store
            .list_orders_for_restaurant(restaurant_id, "owner-1")
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second_id);

        let err = store
            .list_orders_for_restaurant(restaurant_id, "intruder")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_customer_listing_scopes_by_customer() {
        let (store, orders, restaurant_id, _) = setup().await;
        orders
            .create_order(&order(restaurant_id, "customer-2", "cs_2"))
            .await
            .unwrap();

        let listed = store.list_orders_for_customer("customer-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].customer_id, "customer-1");
    }

    #[tokio::test]
    async fn test_order_detail_visibility() {
        let (store, _, _, order_id) = setup().await;

        assert!(store.get_order(order_id, "customer-1").await.is_ok());
        assert!(store.get_order(order_id, "owner-1").await.is_ok());
        let err = store.get_order(order_id, "intruder").await.unwrap_err();
        assert!(matches!(err, OrderError::NotAuthorized));
    }

    fn contended_setup(
        repo: ContendedOrderRepository,
    ) -> (OrderStore, Arc<ContendedOrderRepository>, Uuid) {
        let restaurants = Arc::new(MemoryRestaurantRepository::new());
        let restaurant_id = Uuid::new_v4();
        restaurants.add_restaurant(Restaurant {
            id: restaurant_id,
            owner_id: "owner-1".to_string(),
            name: "Trattoria".to_string(),
        });
        let repo = Arc::new(repo);
        let (tx, _) = broadcast::channel(16);
        let store = OrderStore::new(repo.clone(), restaurants, tx);
        (store, repo, restaurant_id)
    }

    #[tokio::test]
    async fn test_lost_cas_write_is_retried_and_lands() {
        let inner = Arc::new(MemoryOrderRepository::new());
        let (store, repo, restaurant_id) =
            contended_setup(ContendedOrderRepository::new(inner.clone(), 1));

        let seeded = order(restaurant_id, "customer-1", "cs_1");
        let order_id = seeded.id;
        inner.create_order(&seeded).await.unwrap();

        let updated = store
            .update_order_status(order_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(repo.attempts.load(Ordering::SeqCst), 2);

        let persisted = inner.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_concurrent_writer_is_never_regressed() {
        let inner = Arc::new(MemoryOrderRepository::new());
        // Another session lands Delivered between this caller's read and
        // write; the retry must re-read and refuse to move backwards.
        let repo =
            ContendedOrderRepository::new(inner.clone(), 1).with_rival(OrderStatus::Delivered);
        let (store, _, restaurant_id) = contended_setup(repo);

        let seeded = order(restaurant_id, "customer-1", "cs_1");
        let order_id = seeded.id;
        inner.create_order(&seeded).await.unwrap();

        let err = store
            .update_order_status(order_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Preparing,
            }
        ));

        let persisted = inner.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_exhausted_cas_retries_surface_a_conflict() {
        let inner = Arc::new(MemoryOrderRepository::new());
        let (store, repo, restaurant_id) = contended_setup(ContendedOrderRepository::new(
            inner.clone(),
            TRANSITION_RETRIES,
        ));

        let seeded = order(restaurant_id, "customer-1", "cs_1");
        let order_id = seeded.id;
        inner.create_order(&seeded).await.unwrap();

        let err = store
            .update_order_status(order_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Storage(StoreError::Conflict)
        ));
        assert_eq!(repo.attempts.load(Ordering::SeqCst), TRANSITION_RETRIES);
    }

    #[tokio::test]
    async fn test_returned_order_carries_fresh_update_timestamp() {
        let (store, orders, restaurant_id, _) = setup().await;

        let mut stale = order(restaurant_id, "customer-1", "cs_backdated");
        stale.created_at = Utc::now() - chrono::Duration::minutes(5);
        stale.updated_at = stale.created_at;
        let stale_id = stale.id;
        orders.create_order(&stale).await.unwrap();

        let updated = store
            .update_order_status(stale_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap();
        assert!(updated.updated_at > updated.created_at);
    }

    #[tokio::test]
    async fn test_status_change_publishes_event() {
        let orders = Arc::new(MemoryOrderRepository::new());
        let restaurants = Arc::new(MemoryRestaurantRepository::new());
        let restaurant_id = Uuid::new_v4();
        restaurants.add_restaurant(Restaurant {
            id: restaurant_id,
            owner_id: "owner-1".to_string(),
            name: "Trattoria".to_string(),
        });
        let seeded = order(restaurant_id, "customer-1", "cs_1");
        let order_id = seeded.id;
        orders.create_order(&seeded).await.unwrap();

        let (tx, mut rx) = broadcast::channel(16);
        let store = OrderStore::new(orders, restaurants, tx);

        store
            .update_order_status(order_id, OrderStatus::Preparing, "owner-1")
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            OrderEvent::StatusChanged(event) => {
                assert_eq!(event.order_id, order_id);
                assert_eq!(event.from, OrderStatus::Confirmed);
                assert_eq!(event.to, OrderStatus::Preparing);
            }
            other => panic!("expected StatusChanged, got {other:?}"),
        }
    }
}
