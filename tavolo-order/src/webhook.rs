use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use tavolo_core::events::{OrderConfirmedEvent, OrderEvent};
use tavolo_core::payment::{PaymentGateway, METADATA_KEY};
use tavolo_core::repository::OrderRepository;
use tavolo_core::{CheckoutMetadata, Order, OrderError, StoreError};

/// Event type reporting a completed hosted-checkout payment. Every other
/// event kind is acknowledged without action.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    /// Amount the gateway actually captured, in minor currency units.
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Outcome of a webhook delivery, all acknowledged with 200 upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// A new order was persisted.
    Created(Uuid),
    /// The event was already processed; gateways retry delivery on slow or
    /// failed acknowledgements, so duplicates are expected.
    Duplicate,
    /// An event kind this service does not handle.
    Ignored,
}

/// Authenticates and interprets asynchronous payment events. This is the
/// only code path that creates orders: a checkout session alone persists
/// nothing.
pub struct WebhookProcessor {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    events: broadcast::Sender<OrderEvent>,
}

impl WebhookProcessor {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        events: broadcast::Sender<OrderEvent>,
    ) -> Self {
        Self {
            orders,
            gateway,
            events,
        }
    }

    /// Process one webhook delivery. `raw_body` must be the exact bytes the
    /// gateway sent; signature verification happens before anything is
    /// parsed or persisted.
    pub async fn handle_event(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<WebhookAck, OrderError> {
        if let Err(reason) = self.gateway.verify_signature(raw_body, signature_header) {
            tracing::warn!("rejected webhook delivery: {reason}");
            return Err(OrderError::InvalidSignature);
        }

        let event: GatewayEvent = serde_json::from_slice(raw_body)
            .map_err(|e| OrderError::Gateway(format!("malformed event payload: {e}")))?;

        if event.kind != CHECKOUT_COMPLETED {
            tracing::debug!(event_id = %event.id, kind = %event.kind, "ignoring event");
            return Ok(WebhookAck::Ignored);
        }

        let session = event.data.object;

        // Idempotency guard, first pass: an order already recorded for this
        // payment reference means this is a redelivery.
        if self
            .orders
            .find_by_payment_reference(&session.id)
            .await?
            .is_some()
        {
            tracing::info!(reference = %session.id, "duplicate webhook delivery, no-op");
            return Ok(WebhookAck::Duplicate);
        }

        let raw_metadata = session
            .metadata
            .get(METADATA_KEY)
            .ok_or_else(|| OrderError::Gateway("event missing order metadata".to_string()))?;
        let metadata = CheckoutMetadata::decode(raw_metadata)
            .map_err(|e| OrderError::Gateway(format!("undecodable order metadata: {e}")))?;

        // Trust the payment confirmation, not the session request: the
        // persisted total is what the gateway reports as captured.
        let captured = session
            .amount_total
            .ok_or_else(|| OrderError::Gateway("event missing captured amount".to_string()))?;

        let order = Order::from_checkout(metadata, captured, session.id.clone());

        match self.orders.create_order(&order).await {
            Ok(()) => {
                tracing::info!(
                    order_id = %order.id,
                    reference = %session.id,
                    total_amount = captured,
                    "order confirmed from webhook"
                );
                let _ = self.events.send(OrderEvent::Confirmed(OrderConfirmedEvent {
                    order_id: order.id,
                    restaurant_id: order.restaurant_id,
                    customer_id: order.customer_id.clone(),
                    total_amount: order.total_amount,
                    timestamp: chrono::Utc::now().timestamp(),
                }));
                Ok(WebhookAck::Created(order.id))
            }
            // Lost the race against a concurrent delivery of the same
            // event; the storage uniqueness constraint picked the winner.
            Err(StoreError::DuplicateReference) => {
                tracing::info!(reference = %session.id, "concurrent duplicate delivery, no-op");
                Ok(WebhookAck::Duplicate)
            }
            Err(e) => Err(OrderError::Storage(e)),
        }
    }
}
