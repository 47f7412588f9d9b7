pub mod checkout;
pub mod signature;
pub mod store;
pub mod stripe;
pub mod testing;
pub mod webhook;

pub use checkout::CheckoutSessionBuilder;
pub use store::OrderStore;
pub use stripe::StripeGateway;
pub use webhook::{WebhookAck, WebhookProcessor};
