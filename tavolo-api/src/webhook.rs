use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::json;

use tavolo_core::OrderError;

use crate::error::AppError;
use crate::state::AppState;

/// POST /order/webhook
/// Receive payment events from the gateway. The handler takes the raw body
/// bytes: signature verification is byte-exact, so no JSON middleware may
/// touch this route first. Non-signature failures surface as 5xx so the
/// gateway redelivers; the idempotency guard absorbs the duplicates.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::from(OrderError::InvalidSignature))?;

    let ack = state.webhooks.handle_event(&body, signature).await?;
    tracing::debug!(?ack, "webhook acknowledged");

    Ok(Json(json!({ "received": true })))
}
