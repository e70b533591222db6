use async_trait::async_trait;
use mercato_core::repository::CouponRepository;
use mercato_order::Coupon;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    amount: Decimal,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: row.id,
            code: row.code,
            amount: row.amount,
        }
    }
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    async fn get_coupon(
        &self,
        id: Uuid,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<CouponRow> =
            sqlx::query_as("SELECT id, code, amount FROM coupons WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Coupon::from))
    }

    async fn get_coupon_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Coupon>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<CouponRow> =
            sqlx::query_as("SELECT id, code, amount FROM coupons WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Coupon::from))
    }

    async fn create_coupon(
        &self,
        coupon: &Coupon,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("INSERT INTO coupons (id, code, amount) VALUES ($1, $2, $3)")
            .bind(coupon.id)
            .bind(&coupon.code)
            .bind(coupon.amount)
            .execute(&self.pool)
            .await?;
        Ok(coupon.id)
    }
}
