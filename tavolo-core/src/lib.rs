pub mod error;
pub mod events;
pub mod models;
pub mod payment;
pub mod repository;

pub use error::{OrderError, StoreError};
pub use models::{
    CartItem, CheckoutMetadata, DeliveryDetails, MenuItem, Order, OrderLineItem, OrderStatus,
    Restaurant,
};
