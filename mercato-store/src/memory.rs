use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_catalog::Item;
use mercato_core::repository::{
    AddItemOutcome, AddressRepository, CouponRepository, ItemRepository, OrderRepository,
    PaymentRepository, RefundRepository,
};
use mercato_order::{Address, AddressKind, Coupon, Order, OrderItem, Payment, Refund};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of every repository trait. Backs the integration
/// tests and local development without a database; the cart invariants (one
/// unfulfilled order per user, one line per item per order) are enforced under
/// a single write lock, mirroring what the Postgres schema enforces with
/// partial unique indexes.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    items: HashMap<Uuid, Item>,
    orders: HashMap<Uuid, OrderRecord>,
    order_items: HashMap<Uuid, OrderItemRecord>,
    addresses: HashMap<Uuid, Address>,
    coupons: HashMap<Uuid, Coupon>,
    payments: HashMap<Uuid, Payment>,
    refunds: HashMap<Uuid, Refund>,
}

#[derive(Clone)]
struct OrderRecord {
    id: Uuid,
    user_id: Uuid,
    start_date: DateTime<Utc>,
    ordered_date: Option<DateTime<Utc>>,
    ordered: bool,
    shipping_address_id: Option<Uuid>,
    billing_address_id: Option<Uuid>,
    coupon_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    ref_code: Option<String>,
    refund_requested: bool,
    refund_granted: bool,
}

#[derive(Clone)]
struct OrderItemRecord {
    id: Uuid,
    order_id: Uuid,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
    ordered: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payment records; used by tests asserting fulfillment
    /// idempotence
    pub async fn payment_count(&self) -> usize {
        self.inner.read().await.payments.len()
    }

    /// Number of unfulfilled orders for a user; used by tests asserting the
    /// one-active-order invariant
    pub async fn active_order_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.user_id == user_id && !o.ordered)
            .count()
    }

    pub async fn refund_count(&self) -> usize {
        self.inner.read().await.refunds.len()
    }

    pub async fn get_payment(&self, id: Uuid) -> Option<Payment> {
        self.inner.read().await.payments.get(&id).cloned()
    }
}

impl Inner {
    fn hydrate(&self, record: &OrderRecord) -> Order {
        let mut items: Vec<OrderItem> = self
            .order_items
            .values()
            .filter(|oi| oi.order_id == record.id)
            .filter_map(|oi| {
                self.items.get(&oi.item_id).map(|item| OrderItem {
                    id: oi.id,
                    user_id: oi.user_id,
                    item: item.clone(),
                    quantity: oi.quantity,
                    ordered: oi.ordered,
                })
            })
            .collect();
        items.sort_by(|a, b| a.item.title.cmp(&b.item.title));

        Order {
            id: record.id,
            user_id: record.user_id,
            items,
            start_date: record.start_date,
            ordered_date: record.ordered_date,
            ordered: record.ordered,
            shipping_address: record
                .shipping_address_id
                .and_then(|id| self.addresses.get(&id).cloned()),
            billing_address: record
                .billing_address_id
                .and_then(|id| self.addresses.get(&id).cloned()),
            coupon: record.coupon_id.and_then(|id| self.coupons.get(&id).cloned()),
            payment_id: record.payment_id,
            ref_code: record.ref_code.clone(),
            refund_requested: record.refund_requested,
            refund_granted: record.refund_granted,
        }
    }

    fn active_record(&self, user_id: Uuid) -> Option<&OrderRecord> {
        self.orders
            .values()
            .find(|o| o.user_id == user_id && !o.ordered)
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn list_items(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Item>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        let mut items: Vec<Item> = inner.items.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_item_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Item>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner.items.values().find(|i| i.slug == slug).cloned())
    }

    async fn create_item(
        &self,
        item: &Item,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if inner.items.values().any(|i| i.slug == item.slug) {
            return Err(format!("duplicate item slug: {}", item.slug).into());
        }
        inner.items.insert(item.id, item.clone());
        Ok(item.id)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner.active_record(user_id).map(|r| inner.hydrate(r)))
    }

    async fn create_active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.active_record(user_id) {
            return Ok(inner.hydrate(existing));
        }
        let record = OrderRecord {
            id: Uuid::new_v4(),
            user_id,
            start_date: Utc::now(),
            ordered_date: None,
            ordered: false,
            shipping_address_id: None,
            billing_address_id: None,
            coupon_id: None,
            payment_id: None,
            ref_code: None,
            refund_requested: false,
            refund_granted: false,
        };
        let order = inner.hydrate(&record);
        inner.orders.insert(record.id, record);
        Ok(order)
    }

    async fn add_item(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<AddItemOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .order_items
            .values_mut()
            .find(|oi| oi.order_id == order_id && oi.item_id == item_id)
        {
            existing.quantity += 1;
            return Ok(AddItemOutcome::Incremented);
        }
        let record = OrderItemRecord {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            item_id,
            quantity: 1,
            ordered: false,
        };
        inner.order_items.insert(record.id, record);
        Ok(AddItemOutcome::Added)
    }

    async fn set_item_quantity(
        &self,
        order_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.order_items.get_mut(&order_item_id) {
            record.quantity = quantity;
        }
        Ok(())
    }

    async fn remove_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        let matches = inner
            .order_items
            .get(&order_item_id)
            .is_some_and(|oi| oi.order_id == order_id);
        if matches {
            inner.order_items.remove(&order_item_id);
        }
        Ok(())
    }

    async fn set_addresses(
        &self,
        order_id: Uuid,
        shipping_address_id: Uuid,
        billing_address_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        let record = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| format!("order not found: {}", order_id))?;
        record.shipping_address_id = Some(shipping_address_id);
        record.billing_address_id = Some(billing_address_id);
        Ok(())
    }

    async fn attach_coupon(
        &self,
        order_id: Uuid,
        coupon_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        let record = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| format!("order not found: {}", order_id))?;
        record.coupon_id = Some(coupon_id);
        Ok(())
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id).map(|r| inner.hydrate(r)))
    }

    async fn get_order_by_ref_code(
        &self,
        ref_code: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .find(|o| o.ref_code.as_deref() == Some(ref_code))
            .map(|r| inner.hydrate(r)))
    }

    async fn mark_fulfilled(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        ref_code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        {
            let record = inner
                .orders
                .get_mut(&order_id)
                .ok_or_else(|| format!("order not found: {}", order_id))?;
            record.ordered = true;
            record.ordered_date = Some(Utc::now());
            record.payment_id = Some(payment_id);
            record.ref_code = Some(ref_code.to_string());
        }
        for line in inner
            .order_items
            .values_mut()
            .filter(|oi| oi.order_id == order_id)
        {
            line.ordered = true;
        }
        Ok(())
    }

    async fn set_refund_requested(
        &self,
        order_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        let record = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| format!("order not found: {}", order_id))?;
        record.refund_requested = true;
        Ok(())
    }
}

#[async_trait]
impl AddressRepository for MemoryStore {
    async fn create_address(
        &self,
        address: &Address,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if address.is_default {
            for existing in inner.addresses.values_mut().filter(|a| {
                a.user_id == address.user_id && a.address_type == address.address_type
            }) {
                existing.is_default = false;
            }
        }
        inner.addresses.insert(address.id, address.clone());
        Ok(address.id)
    }

    async fn default_address(
        &self,
        user_id: Uuid,
        kind: AddressKind,
    ) -> Result<Option<Address>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner
            .addresses
            .values()
            .find(|a| a.user_id == user_id && a.address_type == kind && a.is_default)
            .cloned())
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn get_coupon(
        &self,
        id: Uuid,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.inner.read().await.coupons.get(&id).cloned())
    }

    async fn get_coupon_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn create_coupon(
        &self,
        coupon: &Coupon,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        inner.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon.id)
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create_payment(
        &self,
        payment: &Payment,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        if inner
            .payments
            .values()
            .any(|p| p.charge_id == payment.charge_id)
        {
            return Err(format!("duplicate charge id: {}", payment.charge_id).into());
        }
        inner.payments.insert(payment.id, payment.clone());
        Ok(payment.id)
    }

    async fn find_by_charge_id(
        &self,
        charge_id: &str,
    ) -> Result<Option<Payment>, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payments
            .values()
            .find(|p| p.charge_id == charge_id)
            .cloned())
    }
}

#[async_trait]
impl RefundRepository for MemoryStore {
    async fn create_refund(
        &self,
        refund: &Refund,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.inner.write().await;
        inner.refunds.insert(refund.id, refund.clone());
        Ok(refund.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mercato_catalog::Category;
    use rust_decimal::Decimal;

    fn tshirt() -> Item {
        Item::new(
            "Basic T-Shirt".to_string(),
            Decimal::new(2000, 2),
            None,
            Category::Shirt,
            None,
            "tshirt".to_string(),
            "A plain cotton t-shirt".to_string(),
        )
    }

    #[tokio::test]
    async fn test_add_item_upserts_quantity() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let item = tshirt();
        store.create_item(&item).await.unwrap();

        let order = store.create_active_order(user).await.unwrap();
        assert_eq!(
            store.add_item(order.id, user, item.id).await.unwrap(),
            AddItemOutcome::Added
        );
        assert_eq!(
            store.add_item(order.id, user, item.id).await.unwrap(),
            AddItemOutcome::Incremented
        );

        let order = store.active_order(user).await.unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_create_active_order_is_idempotent() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let first = store.create_active_order(user).await.unwrap();
        let second = store.create_active_order(user).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.active_order_count(user).await, 1);
    }

    #[tokio::test]
    async fn test_new_default_address_clears_previous() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let first = Address::new(
            user,
            "1 Main St".to_string(),
            None,
            "US".to_string(),
            "00000".to_string(),
            AddressKind::Shipping,
            true,
        );
        store.create_address(&first).await.unwrap();

        let second = Address::new(
            user,
            "2 Elm St".to_string(),
            None,
            "US".to_string(),
            "11111".to_string(),
            AddressKind::Shipping,
            true,
        );
        store.create_address(&second).await.unwrap();

        let current = store
            .default_address(user, AddressKind::Shipping)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, second.id);
    }

    #[tokio::test]
    async fn test_mark_fulfilled_closes_order_and_lines() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let item = tshirt();
        store.create_item(&item).await.unwrap();
        let order = store.create_active_order(user).await.unwrap();
        store.add_item(order.id, user, item.id).await.unwrap();

        let payment = Payment::new("cs_1".to_string(), user, Decimal::new(2000, 2));
        store.create_payment(&payment).await.unwrap();
        store
            .mark_fulfilled(order.id, payment.id, "abc123")
            .await
            .unwrap();

        assert!(store.active_order(user).await.unwrap().is_none());
        let closed = store.get_order(order.id).await.unwrap().unwrap();
        assert!(closed.ordered);
        assert_eq!(closed.ref_code.as_deref(), Some("abc123"));
        assert!(closed.items.iter().all(|i| i.ordered));
    }
}
