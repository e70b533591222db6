use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_catalog::{Category, Item, Label};
use mercato_core::repository::{AddItemOutcome, OrderRepository};
use mercato_order::{Address, AddressKind, Coupon, Order, OrderItem};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying

#[derive(sqlx::FromRow)]
struct OrderRow {
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

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    user_id: Uuid,
    quantity: i32,
    ordered: bool,
    item_id: Uuid,
    title: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    category: String,
    label: Option<String>,
    slug: String,
    description: String,
    item_created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    street_address: String,
    apartment_address: Option<String>,
    country: String,
    zip: String,
    address_type: String,
    is_default: bool,
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    amount: Decimal,
}

impl OrderItemRow {
    fn into_order_item(self) -> Result<OrderItem, Box<dyn std::error::Error + Send + Sync>> {
        let label = match self.label.as_deref() {
            Some(code) => Some(Label::from_code(code)?),
            None => None,
        };
        Ok(OrderItem {
            id: self.id,
            user_id: self.user_id,
            quantity: self.quantity,
            ordered: self.ordered,
            item: Item {
                id: self.item_id,
                title: self.title,
                price: self.price,
                discount_price: self.discount_price,
                category: Category::from_code(&self.category)?,
                label,
                slug: self.slug,
                description: self.description,
                created_at: self.item_created_at,
            },
        })
    }
}

impl AddressRow {
    fn into_address(self) -> Result<Address, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Address {
            id: self.id,
            user_id: self.user_id,
            street_address: self.street_address,
            apartment_address: self.apartment_address,
            country: self.country,
            zip: self.zip,
            address_type: AddressKind::from_code(&self.address_type)?,
            is_default: self.is_default,
        })
    }
}

const ORDER_COLUMNS: &str = "id, user_id, start_date, ordered_date, ordered, \
     shipping_address_id, billing_address_id, coupon_id, payment_id, ref_code, \
     refund_requested, refund_granted";

impl PgOrderRepository {
    /// Assemble a full Order from its row: cart lines joined with the catalog,
    /// plus any referenced addresses and coupon.
    async fn hydrate(
        &self,
        row: OrderRow,
    ) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT oi.id, oi.user_id, oi.quantity, oi.ordered,
                   i.id AS item_id, i.title, i.price, i.discount_price,
                   i.category, i.label, i.slug, i.description,
                   i.created_at AS item_created_at
            FROM order_items oi
            JOIN items i ON i.id = oi.item_id
            WHERE oi.order_id = $1
            ORDER BY i.title
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(OrderItemRow::into_order_item)
            .collect::<Result<Vec<_>, _>>()?;

        let shipping_address = self.load_address(row.shipping_address_id).await?;
        let billing_address = self.load_address(row.billing_address_id).await?;

        let coupon = match row.coupon_id {
            Some(id) => {
                let coupon_row: Option<CouponRow> =
                    sqlx::query_as("SELECT id, code, amount FROM coupons WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                coupon_row.map(|c| Coupon {
                    id: c.id,
                    code: c.code,
                    amount: c.amount,
                })
            }
            None => None,
        };

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items,
            start_date: row.start_date,
            ordered_date: row.ordered_date,
            ordered: row.ordered,
            shipping_address,
            billing_address,
            coupon,
            payment_id: row.payment_id,
            ref_code: row.ref_code,
            refund_requested: row.refund_requested,
            refund_granted: row.refund_granted,
        })
    }

    async fn load_address(
        &self,
        id: Option<Uuid>,
    ) -> Result<Option<Address>, Box<dyn std::error::Error + Send + Sync>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let row: Option<AddressRow> = sqlx::query_as(
            "SELECT id, user_id, street_address, apartment_address, country, zip, \
             address_type, is_default FROM addresses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AddressRow::into_address).transpose()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND NOT ordered",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_active_order(
        &self,
        user_id: Uuid,
    ) -> Result<Order, Box<dyn std::error::Error + Send + Sync>> {
        // The partial unique index on (user_id) WHERE NOT ordered makes this a
        // no-op when a concurrent request created the order first.
        sqlx::query(
            "INSERT INTO orders (id, user_id, start_date, ordered) VALUES ($1, $2, NOW(), FALSE) \
             ON CONFLICT (user_id) WHERE NOT ordered DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.active_order(user_id)
            .await?
            .ok_or_else(|| "active order missing after creation".into())
    }

    async fn add_item(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<AddItemOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let (quantity,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, user_id, item_id, quantity, ordered)
            VALUES ($1, $2, $3, $4, 1, FALSE)
            ON CONFLICT (order_id, item_id)
            DO UPDATE SET quantity = order_items.quantity + 1
            RETURNING quantity
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(user_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        if quantity == 1 {
            Ok(AddItemOutcome::Added)
        } else {
            Ok(AddItemOutcome::Incremented)
        }
    }

    async fn set_item_quantity(
        &self,
        order_item_id: Uuid,
        quantity: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE order_items SET quantity = $1 WHERE id = $2")
            .bind(quantity)
            .bind(order_item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
            .bind(order_item_id)
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_addresses(
        &self,
        order_id: Uuid,
        shipping_address_id: Uuid,
        billing_address_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "UPDATE orders SET shipping_address_id = $1, billing_address_id = $2 WHERE id = $3",
        )
        .bind(shipping_address_id)
        .bind(billing_address_id)
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn attach_coupon(
        &self,
        order_id: Uuid,
        coupon_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE orders SET coupon_id = $1 WHERE id = $2")
            .bind(coupon_id)
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_order_by_ref_code(
        &self,
        ref_code: &str,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE ref_code = $1",
            ORDER_COLUMNS
        ))
        .bind(ref_code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn mark_fulfilled(
        &self,
        order_id: Uuid,
        payment_id: Uuid,
        ref_code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE orders SET ordered = TRUE, ordered_date = NOW(), payment_id = $1, \
             ref_code = $2 WHERE id = $3",
        )
        .bind(payment_id)
        .bind(ref_code)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE order_items SET ordered = TRUE WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_refund_requested(
        &self,
        order_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("UPDATE orders SET refund_requested = TRUE WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
