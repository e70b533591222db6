use async_trait::async_trait;
use mercato_catalog::Item;
use mercato_order::{Address, AddressKind, Coupon, Order, Payment, Refund};
use uuid::Uuid;

/// Outcome of adding a catalog item to a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddItemOutcome {
    /// A new line was created with quantity 1
    Added,
    /// The line already existed; its quantity was incremented
    Incremented,
}

/// Repository trait for catalog access
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn list_items(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Item>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_item_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Item>, Box<dyn std::error::Error + Send + Sync>>;

    async fn create_item(
        &self,
        item: &Item,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for orders and their cart lines.
///
/// The "current order" is always the derived query `user_id + ordered = false`,
/// never a cached reference.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// The caller's unfulfilled order, with items, addresses and coupon hydrated
    async fn active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Create the caller's unfulfilled order. When one already exists (for
    /// example because a concurrent request won the race), the existing order
    /// is returned instead. The store enforces at most one unfulfilled order
    /// per user.
    async fn create_active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Order, Box<dyn std::error::Error + Send + Sync>>;

    /// Upsert a cart line: insert with quantity 1, or increment the quantity
    /// of an existing line for the same item
    async fn add_item(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<AddItemOutcome, Box<dyn std::error::Error + Send + Sync>>;

    async fn set_item_quantity(
        &self,
        order_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn remove_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn set_addresses(
        &self,
        order_id: Uuid,
        shipping_address_id: Uuid,
        billing_address_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn attach_coupon(
        &self,
        order_id: Uuid,
        coupon_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order_by_ref_code(
        &self,
        ref_code: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Mark the order and every one of its lines fulfilled, attach the payment
    /// and assign the reference code, in one transaction
    async fn mark_fulfilled(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        ref_code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn set_refund_requested(
        &self,
        order_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for saved addresses
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Persist an address. When `is_default` is set, any previous default of
    /// the same kind for the same user is cleared.
    async fn create_address(
        &self,
        address: &Address,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn default_address(
        &self,
        user_id: Uuid,
        kind: AddressKind,
    ) -> Result<Option<Address>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for coupons
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn get_coupon(
        &self,
        id: Uuid,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_coupon_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>>;

    async fn create_coupon(
        &self,
        coupon: &Coupon,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for captured payments
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(
        &self,
        payment: &Payment,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    /// Lookup by gateway charge id; drives fulfillment idempotence
    async fn find_by_charge_id(
        &self,
        charge_id: &str,
    ) -> Result<Option<Payment>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for refund requests
#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn create_refund(
        &self,
        refund: &Refund,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;
}
