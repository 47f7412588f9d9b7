use std::sync::Arc;

use tavolo_order::{CheckoutSessionBuilder, OrderStore, WebhookProcessor};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutSessionBuilder>,
    pub webhooks: Arc<WebhookProcessor>,
    pub orders: Arc<OrderStore>,
    pub auth: AuthConfig,
    /// Origin allowed by CORS; also where checkout redirects land.
    pub frontend_origin: String,
}
