use uuid::Uuid;

use crate::models::OrderStatus;

/// Storage-layer failures. `DuplicateReference` carries the idempotency
/// guard: the orders table enforces a unique payment reference, and
/// concurrent webhook deliveries race on it with exactly one winner.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("payment reference already recorded")]
    DuplicateReference,

    #[error("concurrent update conflict")]
    Conflict,

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Error taxonomy for the order lifecycle and checkout flow.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cart is empty or contains invalid quantities")]
    InvalidCart,

    #[error("restaurant not found: {0}")]
    RestaurantNotFound(Uuid),

    #[error("menu item unavailable: {0}")]
    MenuItemUnavailable(Uuid),

    #[error("order total resolves to zero")]
    EmptyOrderTotal,

    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("not authorized to act on this order")]
    NotAuthorized,

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
