pub mod address_repo;
pub mod app_config;
pub mod coupon_repo;
pub mod database;
pub mod item_repo;
pub mod memory;
pub mod order_repo;
pub mod payment_repo;
pub mod redis_repo;
pub mod stripe;

pub use address_repo::PgAddressRepository;
pub use coupon_repo::PgCouponRepository;
pub use database::DbClient;
pub use item_repo::PgItemRepository;
pub use memory::MemoryStore;
pub use order_repo::PgOrderRepository;
pub use payment_repo::{PgPaymentRepository, PgRefundRepository};
pub use redis_repo::RedisClient;
pub use stripe::StripeClient;
