use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod webhook;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = match state.frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]),
        Err(_) => {
            tracing::warn!(
                "frontend origin {:?} is not a valid header value, CORS left open",
                state.frontend_origin
            );
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ])
        }
    };

    let protected = Router::new()
        .route("/order", get(orders::list_orders))
        .route(
            "/order/restaurant/{restaurant_id}",
            get(orders::list_restaurant_orders),
        )
        .route(
            "/order/checkout/create-checkout-session",
            post(orders::create_checkout_session),
        )
        .route("/order/{order_id}", get(orders::get_order))
        .route("/order/{order_id}/status", put(orders::update_order_status))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Registered outside the auth layer: the gateway authenticates with
        // its signature, and the handler needs the raw, unparsed body.
        .route("/order/webhook", post(webhook::handle_webhook))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
