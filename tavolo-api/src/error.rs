use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tavolo_core::OrderError;

/// HTTP surface for domain failures, rendered as `{"error": ...}` JSON.
/// Infrastructure detail is logged server-side and never leaked.
#[derive(Debug)]
pub struct AppError(OrderError);

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, error_message) = match &err {
            OrderError::InvalidCart
            | OrderError::MenuItemUnavailable(_)
            | OrderError::EmptyOrderTotal => (StatusCode::BAD_REQUEST, err.to_string()),
            // Security rejection: logged at the webhook boundary, no
            // details leaked here.
            OrderError::InvalidSignature => {
                (StatusCode::BAD_REQUEST, "invalid signature".to_string())
            }
            OrderError::RestaurantNotFound(_) | OrderError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            OrderError::NotAuthorized => (StatusCode::FORBIDDEN, err.to_string()),
            OrderError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            OrderError::Gateway(detail) => {
                tracing::error!("Payment gateway failure: {detail}");
                (StatusCode::BAD_GATEWAY, "payment gateway error".to_string())
            }
            OrderError::Storage(detail) => {
                tracing::error!("Storage failure: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
