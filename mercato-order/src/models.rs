use chrono::{DateTime, Utc};
use mercato_catalog::Item;
use mercato_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an address is used for shipping or billing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressKind {
    Shipping,
    Billing,
}

impl AddressKind {
    pub fn code(&self) -> &'static str {
        match self {
            AddressKind::Shipping => "S",
            AddressKind::Billing => "B",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, OrderError> {
        match code {
            "S" => Ok(AddressKind::Shipping),
            "B" => Ok(AddressKind::Billing),
            other => Err(OrderError::UnknownAddressKind(other.to_string())),
        }
    }
}

/// A saved shipping or billing address. At most one default per user per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street_address: String,
    pub apartment_address: Option<String>,
    pub country: String,
    pub zip: String,
    pub address_type: AddressKind,
    pub is_default: bool,
}

impl Address {
    pub fn new(
        user_id: Uuid,
        street_address: String,
        apartment_address: Option<String>,
        country: String,
        zip: String,
        address_type: AddressKind,
        is_default: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            street_address,
            apartment_address,
            country,
            zip,
            address_type,
            is_default,
        }
    }

    /// Copy of this address re-tagged with another kind. Used at checkout when
    /// the billing address is "same as shipping".
    pub fn retagged(&self, kind: AddressKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            address_type: kind,
            is_default: false,
            ..self.clone()
        }
    }
}

/// A discount coupon. Attached to orders by reference; the amount is looked up
/// from the store at use time, never copied out of client-influenced payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub amount: Decimal,
}

/// A line in a user's cart: one catalog item with a quantity counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub item: Item,
    pub quantity: i32,
    pub ordered: bool,
}

impl OrderItem {
    pub fn new(user_id: Uuid, item: Item) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            item,
            quantity: 1,
            ordered: false,
        }
    }

    /// Line total at the undiscounted list price
    pub fn total_price(&self) -> Decimal {
        self.item.price * Decimal::from(self.quantity)
    }

    /// Line total at the discounted price, when a discount exists
    pub fn total_discount_price(&self) -> Option<Decimal> {
        self.item
            .discount_price
            .map(|p| p * Decimal::from(self.quantity))
    }

    pub fn amount_saved(&self) -> Decimal {
        self.item.amount_saved() * Decimal::from(self.quantity)
    }

    /// What this line contributes to the order total
    pub fn final_price(&self) -> Decimal {
        self.item.effective_price() * Decimal::from(self.quantity)
    }
}

/// A record of a captured charge at the payment gateway.
/// Created exactly once per fulfilled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Gateway session / payment-intent identifier. Unique; fulfillment is
    /// idempotent keyed on this value.
    pub charge_id: String,
    pub user_id: Uuid,
    /// Amount charged, in major currency units
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Payment {
    pub fn new(charge_id: String, user_id: Uuid, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            charge_id,
            user_id,
            amount,
            timestamp: Utc::now(),
        }
    }
}

/// A customer-initiated refund request. Recorded for out-of-band processing;
/// no automatic refund issuance happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub order_id: Uuid,
    pub reason: String,
    pub email: Masked<String>,
    pub accepted: bool,
}

impl Refund {
    pub fn new(order_id: Uuid, reason: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            reason,
            email: email.into(),
            accepted: false,
        }
    }
}

/// A user's order. Exactly one order per user may be unfulfilled
/// (ordered = false) at any time; that order is the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub start_date: DateTime<Utc>,
    pub ordered_date: Option<DateTime<Utc>>,
    pub ordered: bool,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub coupon: Option<Coupon>,
    pub payment_id: Option<Uuid>,
    /// Assigned when the order is fulfilled; used for refund lookups
    pub ref_code: Option<String>,
    pub refund_requested: bool,
    pub refund_granted: bool,
}

impl Order {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: Vec::new(),
            start_date: Utc::now(),
            ordered_date: None,
            ordered: false,
            shipping_address: None,
            billing_address: None,
            coupon: None,
            payment_id: None,
            ref_code: None,
            refund_requested: false,
            refund_granted: false,
        }
    }

    /// Grand total: sum of line final prices minus the coupon amount,
    /// floored at zero.
    pub fn total(&self) -> Decimal {
        let mut total: Decimal = self.items.iter().map(OrderItem::final_price).sum();
        if let Some(coupon) = &self.coupon {
            total -= coupon.amount;
        }
        if total < Decimal::ZERO {
            Decimal::ZERO
        } else {
            total
        }
    }

    /// Locate the cart line for a catalog item, if present
    pub fn item_for(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|oi| oi.item.id == item_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Unknown address kind code: {0}")]
    UnknownAddressKind(String),

    #[error("Order already fulfilled: {0}")]
    AlreadyFulfilled(Uuid),
}
