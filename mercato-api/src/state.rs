use std::sync::Arc;
use mercato_core::payment::PaymentGateway;
use mercato_core::repository::{
    AddressRepository, CouponRepository, ItemRepository, OrderRepository, PaymentRepository,
    RefundRepository,
};
use mercato_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub refunds: Arc<dyn RefundRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Absent when rate limiting is not configured
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub publishable_key: String,
}
