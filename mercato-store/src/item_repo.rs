use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_catalog::{Category, Item, Label};
use mercato_core::repository::ItemRepository;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    title: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    category: String,
    label: Option<String>,
    slug: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_item(self) -> Result<Item, Box<dyn std::error::Error + Send + Sync>> {
        let label = match self.label.as_deref() {
            Some(code) => Some(Label::from_code(code)?),
            None => None,
        };
        Ok(Item {
            id: self.id,
            title: self.title,
            price: self.price,
            discount_price: self.discount_price,
            category: Category::from_code(&self.category)?,
            label,
            slug: self.slug,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, title, price, discount_price, category, label, slug, description, created_at";

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn list_items(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Item>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM items ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            ITEM_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }

    async fn get_item_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Item>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {} FROM items WHERE slug = $1", ITEM_COLUMNS))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ItemRow::into_item).transpose()
    }

    async fn create_item(
        &self,
        item: &Item,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO items (id, title, price, discount_price, category, label, slug, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(item.price)
        .bind(item.discount_price)
        .bind(item.category.code())
        .bind(item.label.map(|l| l.code()))
        .bind(&item.slug)
        .bind(&item.description)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(item.id)
    }
}
