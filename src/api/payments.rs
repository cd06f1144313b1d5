use crate::api::AppState;
use crate::database::Order;
use crate::error::AppError;
use crate::payments::types::{CardCustomer, Money};
use crate::payments::{PaymentChannel, ProviderName};
use crate::services::{NewDeposit, NewWithdrawal};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct DepositApiRequest {
    pub provider: String,
    pub amount: String,
    pub currency: String,
    pub channel: PaymentChannel,
    pub phone: Option<String>,
    pub customer: Option<CardCustomer>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawApiRequest {
    pub provider: String,
    pub amount: String,
    pub currency: String,
    pub phone: String,
    pub reason: Option<String>,
}

/// Client-facing view of an order. BigDecimal amounts go out as strings.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub reference: String,
    pub provider: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub phone: Option<String>,
    pub channel: String,
    pub status: String,
    pub provider_order_number: Option<String>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            reference: order.reference,
            provider: order.provider,
            kind: order.kind,
            amount: order.amount.to_string(),
            currency: order.currency,
            phone: order.phone,
            channel: order.channel,
            status: order.status,
            provider_order_number: order.provider_order_number,
            error_message: order.error_message,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// POST /api/payments/deposit
pub async fn deposit(
    State(state): State<AppState>,
    Json(payload): Json<DepositApiRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let provider = ProviderName::from_str(&payload.provider)?;
    info!(provider = %provider, channel = %payload.channel, "deposit requested");

    let order = state
        .service
        .place_deposit(NewDeposit {
            provider,
            amount: Money {
                amount: payload.amount,
                currency: payload.currency,
            },
            channel: payload.channel,
            phone: payload.phone,
            customer: payload.customer,
            metadata: payload.metadata,
        })
        .await?;

    Ok(Json(order.into()))
}

/// POST /api/payments/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Json(payload): Json<WithdrawApiRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let provider = ProviderName::from_str(&payload.provider)?;
    info!(provider = %provider, "withdrawal requested");

    let order = state
        .service
        .place_withdrawal(NewWithdrawal {
            provider,
            amount: Money {
                amount: payload.amount,
                currency: payload.currency,
            },
            phone: payload.phone,
            reason: payload.reason,
        })
        .await?;

    Ok(Json(order.into()))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/reconcile
///
/// Polls the provider for a pending order. Settled orders come back as-is.
pub async fn reconcile_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state.service.reconcile(id).await?;
    Ok(Json(order.into()))
}
