use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata key under which the serialized [`crate::CheckoutMetadata`] is
/// attached to the checkout session and echoed back in webhook events.
pub const METADATA_KEY: &str = "order";

/// Server-trusted request for a hosted checkout session. Built from
/// re-resolved menu prices, never from client-submitted ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub line_items: Vec<SessionLineItem>,
    /// Serialized checkout metadata, round-tripped verbatim by the gateway.
    pub metadata: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub name: String,
    pub image: String,
    /// Unit price in minor currency units.
    pub unit_amount: i64,
    pub quantity: i32,
}

/// A gateway-hosted payment flow instance, yielding a redirect URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Webhook signature failures. Reasons are logged server-side only; the
/// HTTP surface collapses all of them into one generic rejection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,
}

/// Hosted-checkout payment gateway. Constructed explicitly with its keys so
/// it can be swapped per test or per tenant; no process-wide defaults.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>>;

    /// Verify a webhook signature against the exact raw body bytes. Local
    /// and synchronous; any re-serialization of the body invalidates it.
    fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), SignatureError>;
}
