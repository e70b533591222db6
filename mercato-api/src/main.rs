use std::net::SocketAddr;
use std::sync::Arc;

use mercato_api::{app, state::{AppState, AuthConfig}};
use mercato_store::{
    DbClient, PgAddressRepository, PgCouponRepository, PgItemRepository, PgOrderRepository,
    PgPaymentRepository, PgRefundRepository, RedisClient, StripeClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mercato_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = mercato_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Mercato API on port {}", config.server.port);

    // Database
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis is optional; without it the rate limiter is simply absent
    let redis = match &config.redis {
        Some(redis_config) => Some(Arc::new(
            RedisClient::new(&redis_config.url)
                .await
                .expect("Failed to connect to Redis"),
        )),
        None => None,
    };

    let gateway = Arc::new(StripeClient::new(&config.stripe));

    let app_state = AppState {
        items: Arc::new(PgItemRepository::new(db.pool.clone())),
        orders: Arc::new(PgOrderRepository::new(db.pool.clone())),
        addresses: Arc::new(PgAddressRepository::new(db.pool.clone())),
        coupons: Arc::new(PgCouponRepository::new(db.pool.clone())),
        payments: Arc::new(PgPaymentRepository::new(db.pool.clone())),
        refunds: Arc::new(PgRefundRepository::new(db.pool.clone())),
        gateway,
        redis,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        publishable_key: config.stripe.publishable_key.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
