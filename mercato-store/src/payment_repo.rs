use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mercato_core::repository::{PaymentRepository, RefundRepository};
use mercato_order::{Payment, Refund};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    charge_id: String,
    user_id: Uuid,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create_payment(
        &self,
        payment: &Payment,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO payments (id, charge_id, user_id, amount, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(payment.id)
        .bind(&payment.charge_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(payment.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(payment.id)
    }

    async fn find_by_charge_id(
        &self,
        charge_id: &str,
    ) -> Result<Option<Payment>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT id, charge_id, user_id, amount, created_at FROM payments WHERE charge_id = $1",
        )
        .bind(charge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Payment {
            id: r.id,
            charge_id: r.charge_id,
            user_id: r.user_id,
            amount: r.amount,
            timestamp: r.created_at,
        }))
    }
}

pub struct PgRefundRepository {
    pool: PgPool,
}

impl PgRefundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefundRepository for PgRefundRepository {
    async fn create_refund(
        &self,
        refund: &Refund,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            "INSERT INTO refunds (id, order_id, reason, email, accepted) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(refund.id)
        .bind(refund.order_id)
        .bind(&refund.reason)
        .bind(refund.email.inner())
        .bind(refund.accepted)
        .execute(&self.pool)
        .await?;
        Ok(refund.id)
    }
}
