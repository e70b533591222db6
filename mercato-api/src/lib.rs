use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod items;
pub mod middleware;
pub mod payments;
pub mod refunds;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Catalog, guest auth and the gateway webhook carry no customer token
    let public = Router::new()
        .nest("/v1/auth", auth::routes())
        .nest("/v1/items", items::routes())
        .nest("/v1/webhooks", webhooks::routes());

    let protected = Router::new()
        .nest("/v1/cart", cart::routes())
        .nest("/v1/checkout", checkout::routes())
        .nest("/v1/payments", payments::routes())
        .nest("/v1/refunds", refunds::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::customer_auth_middleware,
        ));

    let mut router = public.merge(protected);

    // The limiter needs the peer address, so the layer only exists when Redis
    // is configured
    if state.redis.is_some() {
        router = router.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let Some(redis) = &state.redis else {
        return Ok(next.run(req).await);
    };

    let ip = addr.ip().to_string();
    let key = format!("ratelimit:{}", ip);

    match redis.check_rate_limit(&key, 100, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((axum::http::StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
