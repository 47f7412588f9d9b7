use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use tavolo_core::payment::{PaymentGateway, SessionLineItem, SessionRequest};
use tavolo_core::repository::RestaurantRepository;
use tavolo_core::{CartItem, CheckoutMetadata, DeliveryDetails, MenuItem, OrderError, OrderLineItem};

/// Turns a client-submitted cart into a server-trusted checkout session.
///
/// Nothing is persisted here: an order only comes into existence once the
/// gateway confirms payment through the webhook.
pub struct CheckoutSessionBuilder {
    restaurants: Arc<dyn RestaurantRepository>,
    gateway: Arc<dyn PaymentGateway>,
    frontend_origin: String,
}

impl CheckoutSessionBuilder {
    pub fn new(
        restaurants: Arc<dyn RestaurantRepository>,
        gateway: Arc<dyn PaymentGateway>,
        frontend_origin: String,
    ) -> Self {
        Self {
            restaurants,
            gateway,
            frontend_origin,
        }
    }

    /// Create a hosted checkout session and return its redirect URL.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        restaurant_id: Uuid,
        cart: &[CartItem],
        delivery: DeliveryDetails,
    ) -> Result<String, OrderError> {
        if cart.is_empty() || cart.iter().any(|item| item.quantity <= 0) {
            return Err(OrderError::InvalidCart);
        }

        let restaurant = self
            .restaurants
            .get_restaurant(restaurant_id)
            .await?
            .ok_or(OrderError::RestaurantNotFound(restaurant_id))?;

        // Re-resolve every item against the authoritative menu. The prices
        // the client sent are discarded.
        let menu_ids: Vec<Uuid> = cart.iter().map(|item| item.menu_id).collect();
        let resolved = self
            .restaurants
            .resolve_menu_items(restaurant_id, &menu_ids)
            .await?;
        let by_id: HashMap<Uuid, &MenuItem> = resolved.iter().map(|m| (m.id, m)).collect();

        let mut line_items = Vec::with_capacity(cart.len());
        for item in cart {
            let menu = by_id
                .get(&item.menu_id)
                .filter(|m| m.is_available)
                .ok_or(OrderError::MenuItemUnavailable(item.menu_id))?;
            line_items.push(OrderLineItem {
                menu_id: menu.id,
                name: menu.name.clone(),
                image: menu.image.clone(),
                price: menu.price,
                quantity: item.quantity,
            });
        }

        let total: i64 = line_items.iter().map(OrderLineItem::subtotal).sum();
        if total == 0 {
            return Err(OrderError::EmptyOrderTotal);
        }

        // The gateway is the only party calling back on confirmation, so all
        // order context rides along as opaque session metadata.
        let metadata = CheckoutMetadata {
            customer_id: customer_id.to_string(),
            restaurant_id,
            items: line_items.clone(),
            delivery,
        };
        let encoded = metadata
            .encode()
            .map_err(|e| OrderError::Gateway(format!("failed to encode metadata: {e}")))?;

        let request = SessionRequest {
            line_items: line_items
                .into_iter()
                .map(|li| SessionLineItem {
                    name: li.name,
                    image: li.image,
                    unit_amount: li.price,
                    quantity: li.quantity,
                })
                .collect(),
            metadata: encoded,
            customer_email: metadata.delivery.email.clone(),
            success_url: format!("{}/order/status", self.frontend_origin),
            cancel_url: format!("{}/cart", self.frontend_origin),
        };

        let session = self
            .gateway
            .create_checkout_session(&request)
            .await
            .map_err(|e| {
                tracing::error!("checkout session creation failed: {e}");
                OrderError::Gateway("payment gateway unavailable".to_string())
            })?;

        tracing::info!(
            restaurant_id = %restaurant.id,
            total_amount = total,
            session_id = %session.id,
            "created checkout session"
        );

        Ok(session.url)
    }
}
