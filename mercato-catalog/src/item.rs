use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item categories in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Shirt,
    SportWear,
    Outerwear,
}

impl Category {
    /// Short code as stored in the database
    pub fn code(&self) -> &'static str {
        match self {
            Category::Shirt => "S",
            Category::SportWear => "SW",
            Category::Outerwear => "OW",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ItemError> {
        match code {
            "S" => Ok(Category::Shirt),
            "SW" => Ok(Category::SportWear),
            "OW" => Ok(Category::Outerwear),
            other => Err(ItemError::UnknownCategory(other.to_string())),
        }
    }
}

/// Display label shown next to an item on listing pages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Primary,
    Secondary,
    Danger,
}

impl Label {
    pub fn code(&self) -> &'static str {
        match self {
            Label::Primary => "P",
            Label::Secondary => "S",
            Label::Danger => "D",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, ItemError> {
        match code {
            "P" => Ok(Label::Primary),
            "S" => Ok(Label::Secondary),
            "D" => Ok(Label::Danger),
            other => Err(ItemError::UnknownLabel(other.to_string())),
        }
    }
}

/// A listed product. Immutable once listed except through catalog management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    /// List price in major currency units
    pub price: Decimal,
    /// Discounted price, when the item is on sale
    pub discount_price: Option<Decimal>,
    pub category: Category,
    pub label: Option<Label>,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        title: String,
        price: Decimal,
        discount_price: Option<Decimal>,
        category: Category,
        label: Option<Label>,
        slug: String,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            price,
            discount_price,
            category,
            label,
            slug,
            description,
            created_at: Utc::now(),
        }
    }

    /// The price a buyer actually pays: the discount price when one is set
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Amount saved per unit against the list price
    pub fn amount_saved(&self) -> Decimal {
        self.price - self.effective_price()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Unknown category code: {0}")]
    UnknownCategory(String),

    #[error("Unknown label code: {0}")]
    UnknownLabel(String),
}
