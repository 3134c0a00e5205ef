use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, PaymentId};
use domain::{
    Customer, LineItem, Money, Order, OrderStatus, Payment, PaymentMethod, Product, ProductUpdate,
    Sku,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::query::OrderFilter;
use crate::store::{CustomerDirectory, OrderLedger, PaymentRecorder, ProductStore};
use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
///
/// The stock-adjustment and status-transition primitives are single
/// conditional `UPDATE` statements, so their guarantees hold across any
/// number of server instances sharing the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            sku: Sku::new(row.try_get::<String, _>("sku")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<LineItem> = serde_json::from_value(items_json)?;
        let status: OrderStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            order_number: row.try_get("order_number")?,
            items,
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            created_at: row.try_get("created_at")?,
            paid_at: row.try_get("paid_at")?,
            fulfilled_at: row.try_get("fulfilled_at")?,
            cancelled_at: row.try_get("cancelled_at")?,
        })
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let method_str: String = row.try_get("method")?;
        let method = PaymentMethod::parse(&method_str).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown payment method: {method_str}").into())
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            method,
            transaction_id: row.try_get("transaction_id")?,
            paid_at: row.try_get("paid_at")?,
        })
    }

    fn map_unique_violation(e: sqlx::Error, kind: &'static str, key: String) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::AlreadyExists { kind, key };
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        sqlx::query(
            r#"
            INSERT INTO products (sku, name, description, price_cents, stock)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.sku.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, "product", product.sku.to_string()))?;

        Ok(product)
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT sku, name, description, price_cents, stock FROM products WHERE sku = $1",
        )
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT sku, name, description, price_cents, stock FROM products ORDER BY sku",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, sku: &Sku, update: ProductUpdate) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                stock = COALESCE($5, stock)
            WHERE sku = $1
            RETURNING sku, name, description, price_cents, stock
            "#,
        )
        .bind(sku.as_str())
        .bind(update.name)
        .bind(update.description)
        .bind(update.price.map(|p| p.cents()))
        .bind(update.stock)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product)
            .transpose()?
            .ok_or_else(|| StoreError::not_found("product", sku))
    }

    async fn delete_product(&self, sku: &Sku) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", sku));
        }
        Ok(())
    }

    async fn adjust_stock(&self, sku: &Sku, delta: i64) -> Result<i64> {
        // Conditional update: applies only when the result stays >= 0, so two
        // concurrent decrements cannot both succeed past the available stock.
        let new_stock: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock + $2
            WHERE sku = $1 AND stock + $2 >= 0
            RETURNING stock
            "#,
        )
        .bind(sku.as_str())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(stock) = new_stock {
            return Ok(stock);
        }

        // Zero rows: either the sku is absent or the condition failed.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => {
                tracing::debug!(%sku, delta, available, "conditional stock adjustment refused");
                Err(StoreError::InsufficientStock {
                    sku: sku.clone(),
                    available,
                })
            }
            None => Err(StoreError::not_found("product", sku)),
        }
    }
}

#[async_trait]
impl CustomerDirectory for PostgresStore {
    async fn insert_customer(&self, customer: Customer) -> Result<Customer> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, "customer", customer.email.clone()))?;

        Ok(customer)
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row =
            sqlx::query("SELECT id, name, email, phone, address FROM customers WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Customer>> {
        let row =
            sqlx::query("SELECT id, name, email, phone, address FROM customers WHERE email = $1")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows =
            sqlx::query("SELECT id, name, email, phone, address FROM customers ORDER BY email")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, order_number, items, total_cents, status, \
                             created_at, paid_at, fulfilled_at, cancelled_at";

#[async_trait]
impl OrderLedger for PostgresStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        let items_json = serde_json::to_value(&order.items)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, order_number, items, total_cents, status,
                                created_at, paid_at, fulfilled_at, cancelled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer.as_uuid())
        .bind(&order.order_number)
        .bind(items_json)
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.paid_at)
        .bind(order.fulfilled_at)
        .bind(order.cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, "order", order.order_number.clone()))?;

        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.customer.map(|c| c.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        if !from.can_transition(to) {
            return Err(StoreError::IllegalTransition { from, to });
        }

        // Single conditional write: status check and flip happen in one
        // statement, with the timestamp column chosen by the target status.
        let sql = match to {
            OrderStatus::Paid => format!(
                "UPDATE orders SET status = $3, paid_at = $4 \
                 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
            ),
            OrderStatus::Fulfilled => format!(
                "UPDATE orders SET status = $3, fulfilled_at = $4 \
                 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
            ),
            OrderStatus::Cancelled => format!(
                "UPDATE orders SET status = $3, cancelled_at = $4 \
                 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
            ),
            OrderStatus::Pending => unreachable!("no legal transition targets Pending"),
        };

        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_order(row);
        }

        // Zero rows: the order is gone or its status moved under us.
        let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some(status) => {
                tracing::debug!(%id, from = %from, stored = %status, "conditional transition lost");
                Err(StoreError::TransitionConflict {
                    current: status
                        .parse()
                        .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
                })
            }
            None => Err(StoreError::not_found("order", id)),
        }
    }
}

#[async_trait]
impl PaymentRecorder for PostgresStore {
    async fn insert_payment(&self, payment: Payment) -> Result<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, method, transaction_id, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order.as_uuid())
        .bind(payment.amount.cents())
        .bind(payment.method.as_str())
        .bind(&payment.transaction_id)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn remove_payment(&self, id: PaymentId) -> Result<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("payment", id));
        }
        Ok(())
    }

    async fn payments_for_order(&self, order: OrderId) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            "SELECT id, order_id, amount_cents, method, transaction_id, paid_at \
             FROM payments WHERE order_id = $1 ORDER BY paid_at",
        )
        .bind(order.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, amount_cents, method, transaction_id, paid_at
            FROM payments
            WHERE ($1::timestamptz IS NULL OR paid_at >= $1)
              AND ($2::timestamptz IS NULL OR paid_at <= $2)
            ORDER BY paid_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }
}
