use async_trait::async_trait;
use sqlx::{types::BigDecimal, FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order not found")]
    NotFound,
    #[error("duplicate reference: {0}")]
    DuplicateReference(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Deposit or payout, as created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Deposit,
    Withdrawal,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Deposit => "deposit",
            OrderKind::Withdrawal => "withdrawal",
        }
    }
}

/// Lifecycle of an order. `Pending` is the only non-final state; a completed
/// order never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

/// Order entity, one row per money movement attempt.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    /// Caller-assigned reference, unique.
    pub reference: String,
    pub provider: String,
    pub kind: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub phone: Option<String>,
    pub channel: String,
    pub status: String,
    /// Provider-assigned identifier, persisted once the provider accepts.
    pub provider_order_number: Option<String>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Order {
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.status)
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: String,
    pub provider: String,
    pub kind: OrderKind,
    pub amount: BigDecimal,
    pub currency: String,
    pub phone: Option<String>,
    pub channel: String,
    pub metadata: serde_json::Value,
}

const ORDER_COLUMNS: &str = "id, reference, provider, kind, amount, currency, phone, channel, \
     status, provider_order_number, error_message, metadata, created_at, updated_at";

/// Persistence seam for orders. The reconciliation service depends on this
/// trait, so tests substitute an in-memory store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError>;

    async fn find_by_provider_order_number(
        &self,
        provider: &str,
        provider_order_number: &str,
    ) -> Result<Option<Order>, StoreError>;

    async fn set_provider_order_number(
        &self,
        id: Uuid,
        provider_order_number: &str,
    ) -> Result<Order, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        error_message: Option<String>,
    ) -> Result<Order, StoreError>;

    /// Flip a pending order to completed in one conditional write. Returns
    /// `None` when the order is missing or already settled, so of any number
    /// of racing confirmations exactly one observes the transition.
    async fn complete_if_pending(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Oldest pending orders first, for the reconciliation sweep.
    async fn list_pending(&self, limit: i64) -> Result<Vec<Order>, StoreError>;
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders \
             (reference, provider, kind, amount, currency, phone, channel, status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8) \
             RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(&order.reference)
        .bind(&order.provider)
        .bind(order.kind.as_str())
        .bind(&order.amount)
        .bind(&order.currency)
        .bind(&order.phone)
        .bind(&order.channel)
        .bind(&order.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateReference(order.reference.clone())
            }
            _ => StoreError::from(e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE reference = $1",
            ORDER_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn find_by_provider_order_number(
        &self,
        provider: &str,
        provider_order_number: &str,
    ) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE provider = $1 AND provider_order_number = $2",
            ORDER_COLUMNS
        ))
        .bind(provider)
        .bind(provider_order_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn set_provider_order_number(
        &self,
        id: Uuid,
        provider_order_number: &str,
    ) -> Result<Order, StoreError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET provider_order_number = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(provider_order_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        error_message: Option<String>,
    ) -> Result<Order, StoreError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn complete_if_pending(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'completed', error_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE status = 'pending' ORDER BY created_at ASC LIMIT $1",
            ORDER_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}
