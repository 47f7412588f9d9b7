use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tavolo_core::{CartItem, DeliveryDetails, Order, OrderLineItem, OrderStatus};

use crate::error::AppError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequestBody {
    pub restaurant_id: Uuid,
    pub cart_items: Vec<CartItem>,
    pub delivery_details: DeliveryDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: String,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderLineItem>,
    pub total_amount: i64,
    pub delivery_details: DeliveryDetails,
    pub status: OrderStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            restaurant_id: order.restaurant_id,
            items: order.items,
            total_amount: order.total_amount,
            delivery_details: order.delivery,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /order
/// List the authenticated customer's orders, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state.orders.list_orders_for_customer(&claims.sub).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /order/restaurant/{restaurantId}
/// List a restaurant's incoming orders; restricted to its owner.
pub async fn list_restaurant_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(restaurant_id): Path<Uuid>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = state
        .orders
        .list_orders_for_restaurant(restaurant_id, &claims.sub)
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /order/{orderId}
/// Order detail, visible to the paying customer or the restaurant owner.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.orders.get_order(order_id, &claims.sub).await?;
    Ok(Json(order.into()))
}

/// POST /order/checkout/create-checkout-session
/// Build a server-trusted checkout session from the submitted cart and
/// return the gateway's redirect URL. Persists nothing.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CheckoutSessionRequestBody>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let session_url = state
        .checkout
        .create_checkout_session(
            &claims.sub,
            body.restaurant_id,
            &body.cart_items,
            body.delivery_details,
        )
        .await?;
    Ok(Json(CheckoutSessionResponse { session_url }))
}

/// PUT /order/{orderId}/status
/// Advance an order through the delivery lifecycle; owner-only,
/// strictly forward.
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .orders
        .update_order_status(order_id, body.status, &claims.sub)
        .await?;
    Ok(Json(order.into()))
}
