use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the delivery lifecycle. Transitions only ever move
/// forward; skipping intermediate states is allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    /// Position in the lifecycle, used for the strictly-forward rule.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Confirmed => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::OutForDelivery => 2,
            OrderStatus::Delivered => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "PREPARING" => Some(OrderStatus::Preparing),
            "OUT_FOR_DELIVERY" => Some(OrderStatus::OutForDelivery),
            "DELIVERED" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// A client-submitted cart entry. The price field is whatever the browser
/// had cached and is never trusted; checkout re-resolves it from the menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub menu_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
}

/// Delivery contact details captured at checkout, immutable on the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub email: String,
    pub name: String,
    pub address: String,
    pub city: String,
}

/// Frozen copy of a purchased menu item. Decoupled from the live menu so
/// later edits never alter historical orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub menu_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
}

impl OrderLineItem {
    pub fn subtotal(&self) -> i64 {
        self.price * self.quantity as i64
    }
}

/// The single source of truth for a customer's purchase. Created only once
/// the gateway confirms payment; financial fields are never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub total_amount: i64,
    pub delivery: DeliveryDetails,
    pub status: OrderStatus,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a confirmed order from the metadata round-tripped through the
    /// gateway. `total_amount` is the amount the gateway reports as
    /// captured, not the amount the checkout session asked for.
    pub fn from_checkout(
        metadata: CheckoutMetadata,
        total_amount: i64,
        payment_reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id: metadata.customer_id,
            restaurant_id: metadata.restaurant_id,
            items: metadata.items,
            total_amount,
            delivery: metadata.delivery,
            status: OrderStatus::Confirmed,
            payment_reference,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sum of persisted line items, for cross-checking against the
    /// captured amount.
    pub fn line_item_total(&self) -> i64 {
        self.items.iter().map(OrderLineItem::subtotal).sum()
    }
}

/// Restaurant record, read-only input to this core. Owned and mutated by
/// the restaurant CRUD subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
}

/// Menu item as resolved from the authoritative menu tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub is_available: bool,
}

/// Checkout context attached to the gateway session and round-tripped back
/// verbatim in the payment confirmation event. The webhook has no other
/// channel to recover who ordered what.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub customer_id: String,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub delivery: DeliveryDetails,
}

impl CheckoutMetadata {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
