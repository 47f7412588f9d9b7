use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tavolo_api::{
    app,
    state::{AppState, AuthConfig},
};
use tavolo_order::{CheckoutSessionBuilder, OrderStore, StripeGateway, WebhookProcessor};
use tavolo_store::{PgOrderRepository, PgRestaurantRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tavolo_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tavolo_store::app_config::Config::load().context("failed to load config")?;
    tracing::info!("Starting Tavolo API on port {}", config.server.port);

    let db = tavolo_store::DbClient::new(&config.database.url)
        .await
        .context("failed to connect to Postgres")?;
    db.migrate().await.context("failed to run migrations")?;

    let order_repo = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let restaurant_repo = Arc::new(PgRestaurantRepository::new(db.pool.clone()));

    let gateway = Arc::new(StripeGateway::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
        config.stripe.currency.clone(),
    ));

    // Order lifecycle notifications for the rest of the system.
    let (events_tx, _) = tokio::sync::broadcast::channel(100);

    let app_state = AppState {
        checkout: Arc::new(CheckoutSessionBuilder::new(
            restaurant_repo.clone(),
            gateway.clone(),
            config.frontend.origin.clone(),
        )),
        webhooks: Arc::new(WebhookProcessor::new(
            order_repo.clone(),
            gateway.clone(),
            events_tx.clone(),
        )),
        orders: Arc::new(OrderStore::new(order_repo, restaurant_repo, events_tx)),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        frontend_origin: config.frontend.origin.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
