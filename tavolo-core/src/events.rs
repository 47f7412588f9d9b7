use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderConfirmedEvent {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub customer_id: String,
    pub total_amount: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub timestamp: i64,
}

/// Order lifecycle notifications published on the in-process broadcast
/// channel for the rest of the system to subscribe to.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    Confirmed(OrderConfirmedEvent),
    StatusChanged(OrderStatusChangedEvent),
}
