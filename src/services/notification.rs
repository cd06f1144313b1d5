use crate::database::Order;
use crate::services::reconciliation::OrderEffects;
use async_trait::async_trait;
use tracing::info;

/// Completion effect that announces settled orders.
///
/// Placeholder for real notification delivery (email, SMS, push); today it
/// emits a structured log line the way downstream consumers tail.
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderEffects for NotificationService {
    async fn on_completed(&self, order: &Order) -> anyhow::Result<()> {
        info!(
            order_id = %order.id,
            reference = %order.reference,
            provider = %order.provider,
            kind = %order.kind,
            amount = %order.amount,
            currency = %order.currency,
            "🔔 NOTIFICATION: Order Completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn completed_notification_never_fails() {
        let order = Order {
            id: Uuid::new_v4(),
            reference: "MSL-1".to_string(),
            provider: "flexpay".to_string(),
            kind: "deposit".to_string(),
            amount: BigDecimal::from(1500),
            currency: "CDF".to_string(),
            phone: Some("243991234567".to_string()),
            channel: "mobile".to_string(),
            status: "completed".to_string(),
            provider_order_number: Some("ORD-77".to_string()),
            error_message: None,
            metadata: serde_json::json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert!(NotificationService::new().on_completed(&order).await.is_ok());
    }
}
