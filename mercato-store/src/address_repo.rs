use async_trait::async_trait;
use mercato_core::repository::AddressRepository;
use mercato_order::{Address, AddressKind};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
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

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn create_address(
        &self,
        address: &Address,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            // The partial unique index allows one default per user per kind
            sqlx::query(
                "UPDATE addresses SET is_default = FALSE \
                 WHERE user_id = $1 AND address_type = $2 AND is_default",
            )
            .bind(address.user_id)
            .bind(address.address_type.code())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO addresses (id, user_id, street_address, apartment_address, country, zip, address_type, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.street_address)
        .bind(&address.apartment_address)
        .bind(&address.country)
        .bind(&address.zip)
        .bind(address.address_type.code())
        .bind(address.is_default)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address.id)
    }

    async fn default_address(
        &self,
        user_id: Uuid,
        kind: AddressKind,
    ) -> Result<Option<Address>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<AddressRow> = sqlx::query_as(
            "SELECT id, user_id, street_address, apartment_address, country, zip, \
             address_type, is_default FROM addresses \
             WHERE user_id = $1 AND address_type = $2 AND is_default",
        )
        .bind(user_id)
        .bind(kind.code())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Address {
                id: row.id,
                user_id: row.user_id,
                street_address: row.street_address,
                apartment_address: row.apartment_address,
                country: row.country,
                zip: row.zip,
                address_type: AddressKind::from_code(&row.address_type)?,
                is_default: row.is_default,
            })),
            None => Ok(None),
        }
    }
}
