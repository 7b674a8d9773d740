use std::collections::HashMap;

use async_trait::async_trait;
use common::OrderNumber;
use common::db::with_transaction;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Order, OrderLine, OrderRepository, RepositoryError};

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the order table migrations.
    ///
    /// Other services migrate the same database, so versions this crate does
    /// not know about are ignored.
    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        let mut migrator = sqlx::migrate!("../../migrations/orders");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: Some(row.try_get("id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            user_email: row.try_get("user_email")?,
            lines: Vec::new(),
            total_amount: row.try_get("total_amount")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<(i64, OrderLine), RepositoryError> {
        let order_id: i64 = row.try_get("order_id")?;
        let line = OrderLine {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
        };
        Ok((order_id, line))
    }

    /// Attaches lines to orders loaded from `rows`, preserving row order.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = rows
            .iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>, _>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().filter_map(|o| o.id).collect();
        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, price, quantity
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id ASC, line_no ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let (order_id, line) = Self::row_to_line(row)?;
            lines_by_order.entry(order_id).or_default().push(line);
        }

        for order in &mut orders {
            if let Some(lines) = order.id.and_then(|id| lines_by_order.remove(&id)) {
                order.lines = lines;
            }
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order) -> Result<Order, RepositoryError> {
        let order = order.clone();

        with_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let id: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO orders (order_number, user_email, total_amount, status, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(order.order_number.as_str())
                .bind(&order.user_email)
                .bind(order.total_amount)
                .bind(&order.status)
                .bind(order.created_at)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("unique_order_number")
                    {
                        return RepositoryError::Conflict(order.order_number.clone());
                    }
                    RepositoryError::Database(e)
                })?;

                for (line_no, line) in order.lines.iter().enumerate() {
                    sqlx::query(
                        r#"
                        INSERT INTO order_lines
                            (order_id, line_no, product_id, product_name, price, quantity)
                        VALUES ($1, $2, $3, $4, $5, $6)
                        "#,
                    )
                    .bind(id)
                    .bind(line_no as i32)
                    .bind(&line.product_id)
                    .bind(&line.product_name)
                    .bind(line.price)
                    .bind(line.quantity)
                    .execute(&mut *conn)
                    .await?;
                }

                Ok::<_, RepositoryError>(Order {
                    id: Some(id),
                    ..order
                })
            })
        })
        .await
    }

    async fn update_status(
        &self,
        order_number: &OrderNumber,
        status: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = $2
            WHERE order_number = $1
            RETURNING id, order_number, user_email, total_amount, status, created_at
            "#,
        )
        .bind(order_number.as_str())
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, user_email, total_amount, status, created_at
            FROM orders
            WHERE order_number = $1
            "#,
        )
        .bind(order_number.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(self.hydrate(rows).await?.pop())
    }

    async fn find_by_user_email(&self, user_email: &str) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, user_email, total_amount, status, created_at
            FROM orders
            WHERE user_email = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn find_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, user_email, total_amount, status, created_at
            FROM orders
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }
}
