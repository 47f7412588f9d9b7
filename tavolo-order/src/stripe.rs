use async_trait::async_trait;
use serde::Deserialize;

use tavolo_core::payment::{
    CheckoutSession, PaymentGateway, SessionRequest, SignatureError, METADATA_KEY,
};

use crate::signature;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe-backed hosted checkout. The client is constructed explicitly with
/// its keys so it can be swapped per test or per tenant; there are no
/// process-wide defaults.
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, webhook_secret: String, currency: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: STRIPE_API_BASE.to_string(),
            secret_key,
            webhook_secret,
            currency,
        }
    }

    /// Point the client at a different API host (local Stripe emulator).
    pub fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }

    /// Flatten a session request into Stripe's bracketed form encoding.
    fn session_form(&self, request: &SessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "customer_email".to_string(),
                request.customer_email.clone(),
            ),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                self.currency.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                item.image.clone(),
            ));
        }

        form.push((format!("metadata[{METADATA_KEY}]"), request.metadata.clone()));
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&self.session_form(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(format!("checkout session request failed: {message}").into());
        }

        let session: SessionResponse = response.json().await?;
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    fn verify_signature(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        signature::verify(&self.webhook_secret, payload, header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavolo_core::payment::SessionLineItem;

    fn gateway() -> StripeGateway {
        StripeGateway::new(
            "sk_test_123".to_string(),
            "whsec_test".to_string(),
            "usd".to_string(),
        )
    }

    #[test]
    fn test_session_form_encodes_line_items_and_metadata() {
        let request = SessionRequest {
            line_items: vec![SessionLineItem {
                name: "Margherita".to_string(),
                image: "margherita.png".to_string(),
                unit_amount: 500,
                quantity: 2,
            }],
            metadata: r#"{"customerId":"user-1"}"#.to_string(),
            customer_email: "user@example.com".to_string(),
            success_url: "http://localhost:5173/order/status".to_string(),
            cancel_url: "http://localhost:5173/cart".to_string(),
        };

        let form = gateway().session_form(&request);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| panic!("missing form key {key}"))
        };

        assert_eq!(get("mode"), "payment");
        assert_eq!(get("line_items[0][quantity]"), "2");
        assert_eq!(get("line_items[0][price_data][currency]"), "usd");
        assert_eq!(get("line_items[0][price_data][unit_amount]"), "500");
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            "Margherita"
        );
        assert_eq!(get("metadata[order]"), r#"{"customerId":"user-1"}"#);
        assert_eq!(get("customer_email"), "user@example.com");
    }

    #[test]
    fn test_verify_signature_uses_webhook_secret() {
        let gateway = gateway();
        let body = b"{}";
        let header = crate::signature::sign("whsec_test", chrono::Utc::now().timestamp(), body);
        assert!(gateway.verify_signature(body, &header).is_ok());

        let forged = crate::signature::sign("whsec_forged", chrono::Utc::now().timestamp(), body);
        assert_eq!(
            gateway.verify_signature(body, &forged),
            Err(SignatureError::Mismatch)
        );
    }
}
