//! In-memory repositories and a mock gateway for exercising the checkout
//! and lifecycle components without Postgres or a live gateway.

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use tavolo_core::payment::{CheckoutSession, PaymentGateway, SessionRequest, SignatureError};
use tavolo_core::repository::{OrderRepository, RestaurantRepository};
use tavolo_core::{MenuItem, Order, OrderStatus, Restaurant, StoreError};

use crate::signature;

/// Order storage backed by a `Vec`, mirroring the Postgres repository's
/// behavior including the unique payment reference and CAS status update.
pub struct MemoryOrderRepository {
    orders: Mutex<Vec<Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().expect("lock poisoned");
        if orders
            .iter()
            .any(|o| o.payment_reference == order.payment_reference)
        {
            return Err(StoreError::DuplicateReference);
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.lock().expect("lock poisoned");
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.lock().expect("lock poisoned");
        Ok(orders
            .iter()
            .find(|o| o.payment_reference == reference)
            .cloned())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.lock().expect("lock poisoned");
        match orders.iter_mut().find(|o| o.id == id && o.status == from) {
            Some(order) => {
                order.status = to;
                order.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.lock().expect("lock poisoned");
        let mut matched: Vec<Order> = orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_for_restaurant(&self, restaurant_id: Uuid) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.lock().expect("lock poisoned");
        let mut matched: Vec<Order> = orders
            .iter()
            .filter(|o| o.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }
}

/// Static restaurant/menu fixtures.
pub struct MemoryRestaurantRepository {
    restaurants: Mutex<Vec<Restaurant>>,
    menus: Mutex<Vec<MenuItem>>,
}

impl MemoryRestaurantRepository {
    pub fn new() -> Self {
        Self {
            restaurants: Mutex::new(Vec::new()),
            menus: Mutex::new(Vec::new()),
        }
    }

    pub fn add_restaurant(&self, restaurant: Restaurant) {
        self.restaurants
            .lock()
            .expect("lock poisoned")
            .push(restaurant);
    }

    pub fn add_menu_item(&self, item: MenuItem) {
        self.menus.lock().expect("lock poisoned").push(item);
    }
}

impl Default for MemoryRestaurantRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RestaurantRepository for MemoryRestaurantRepository {
    async fn get_restaurant(&self, id: Uuid) -> Result<Option<Restaurant>, StoreError> {
        let restaurants = self.restaurants.lock().expect("lock poisoned");
        Ok(restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn resolve_menu_items(
        &self,
        restaurant_id: Uuid,
        menu_ids: &[Uuid],
    ) -> Result<Vec<MenuItem>, StoreError> {
        let menus = self.menus.lock().expect("lock poisoned");
        Ok(menus
            .iter()
            .filter(|m| m.restaurant_id == restaurant_id && menu_ids.contains(&m.id))
            .cloned()
            .collect())
    }
}

/// Gateway double: records session requests, hands out a fixed redirect
/// URL, and verifies signatures with the real HMAC scheme so webhook tests
/// exercise the production verification path.
pub struct MockGateway {
    webhook_secret: String,
    requests: Mutex<Vec<SessionRequest>>,
}

impl MockGateway {
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn last_request(&self) -> Option<SessionRequest> {
        self.requests.lock().expect("lock poisoned").last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", Uuid::new_v4().simple()),
            url: "https://checkout.mock.example/session".to_string(),
        })
    }

    fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        signature::verify(&self.webhook_secret, payload, header)
    }
}
