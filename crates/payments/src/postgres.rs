use async_trait::async_trait;
use common::OrderNumber;
use common::db::with_transaction;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Payment, PaymentRepository, PaymentStatus, RepositoryError};

const PAYMENT_COLUMNS: &str = "id, order_number, user_email, amount, currency, external_order_id, \
     external_payment_id, external_signature, status, created_at, updated_at";

/// PostgreSQL-backed payment repository.
#[derive(Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the payment table migrations, ignoring versions owned by other
    /// services sharing the database.
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        let mut migrator = sqlx::migrate!("../../migrations/payments");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment, RepositoryError> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PaymentStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Payment {
            id: Some(row.try_get("id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            user_email: row.try_get("user_email")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            external_order_id: row.try_get("external_order_id")?,
            external_payment_id: row.try_get("external_payment_id")?,
            external_signature: row.try_get("external_signature")?,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payments (order_number, user_email, amount, currency,
                                  external_order_id, external_payment_id, external_signature,
                                  status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(payment.order_number.as_str())
        .bind(&payment.user_email)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.external_order_id)
        .bind(&payment.external_payment_id)
        .bind(&payment.external_signature)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(Payment {
            id: Some(id),
            ..payment.clone()
        })
    }

    async fn update(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let payment = payment.clone();

        with_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let result = sqlx::query(
                    r#"
                    UPDATE payments
                    SET external_payment_id = $2, external_signature = $3,
                        status = $4, updated_at = $5
                    WHERE id = $1
                    "#,
                )
                .bind(payment.id)
                .bind(&payment.external_payment_id)
                .bind(&payment.external_signature)
                .bind(payment.status.as_str())
                .bind(payment.updated_at)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::Database(sqlx::Error::RowNotFound));
                }
                Ok::<_, RepositoryError>(())
            })
        })
        .await
    }

    async fn find_latest_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_number = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(order_number.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }

    async fn find_by_external_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_order_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(external_order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }
}
