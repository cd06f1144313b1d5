//! Order lifecycle around the payment gateways.
//!
//! Every money movement is an order: created `pending`, pushed to a gateway,
//! then driven to `completed` or `failed` by webhooks and status polls.
//! Completion is guarded so a replayed webhook or a concurrent poll never
//! runs the completion effects twice.

use crate::database::{NewOrder, Order, OrderKind, OrderStatus, OrderStore, StoreError};
use crate::payments::{
    CheckRequest, DepositRequest, GatewayFactory, PayResult, PaymentChannel, PaymentError,
    ProviderName, TxStatus, WithdrawRequest,
};
use crate::payments::types::{CardCustomer, Money};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Side effects run exactly once when an order completes: balance credit,
/// service activation, customer notification.
#[async_trait]
pub trait OrderEffects: Send + Sync {
    async fn on_completed(&self, order: &Order) -> anyhow::Result<()>;
}

/// Effects sink for deployments that only record orders.
pub struct NoEffects;

#[async_trait]
impl OrderEffects for NoEffects {
    async fn on_completed(&self, _order: &Order) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewDeposit {
    pub provider: ProviderName,
    pub amount: Money,
    pub channel: PaymentChannel,
    pub phone: Option<String>,
    pub customer: Option<CardCustomer>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub provider: ProviderName,
    pub amount: Money,
    pub phone: String,
    pub reason: Option<String>,
}

pub struct ReconciliationService {
    store: Arc<dyn OrderStore>,
    gateways: Arc<GatewayFactory>,
    effects: Arc<dyn OrderEffects>,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateways: Arc<GatewayFactory>,
        effects: Arc<dyn OrderEffects>,
    ) -> Self {
        Self {
            store,
            gateways,
            effects,
        }
    }

    /// Create a pending order and push the deposit to its gateway. The order
    /// row exists before the gateway is called, so a crash mid-call leaves a
    /// pending order the sweep can settle later.
    pub async fn place_deposit(&self, deposit: NewDeposit) -> ReconciliationResult<Order> {
        deposit.amount.validate_positive("amount")?;
        let gateway = self.gateways.resolve(deposit.provider.clone())?;
        let reference = new_reference();

        let order = self
            .store
            .create(NewOrder {
                reference: reference.clone(),
                provider: deposit.provider.as_str().to_string(),
                kind: OrderKind::Deposit,
                amount: parse_amount(&deposit.amount)?,
                currency: deposit.amount.currency.clone(),
                phone: deposit.phone.clone(),
                channel: deposit.channel.to_string(),
                metadata: deposit.metadata.clone().unwrap_or(JsonValue::Null),
            })
            .await?;

        info!(
            reference = %reference,
            provider = %deposit.provider,
            order_id = %order.id,
            "deposit order created"
        );

        let result = gateway
            .deposit(DepositRequest {
                amount: deposit.amount,
                channel: deposit.channel,
                phone: deposit.phone,
                customer: deposit.customer,
                reference: reference.clone(),
                metadata: deposit.metadata,
            })
            .await;

        self.record_initiation(order, &deposit.provider, result).await
    }

    /// Create a pending order and push the payout to its gateway.
    pub async fn place_withdrawal(&self, withdrawal: NewWithdrawal) -> ReconciliationResult<Order> {
        withdrawal.amount.validate_positive("amount")?;
        let gateway = self.gateways.resolve(withdrawal.provider.clone())?;
        let reference = new_reference();

        let order = self
            .store
            .create(NewOrder {
                reference: reference.clone(),
                provider: withdrawal.provider.as_str().to_string(),
                kind: OrderKind::Withdrawal,
                amount: parse_amount(&withdrawal.amount)?,
                currency: withdrawal.amount.currency.clone(),
                phone: Some(withdrawal.phone.clone()),
                channel: PaymentChannel::Mobile.to_string(),
                metadata: JsonValue::Null,
            })
            .await?;

        info!(
            reference = %reference,
            provider = %withdrawal.provider,
            order_id = %order.id,
            "withdrawal order created"
        );

        let result = gateway
            .withdraw(WithdrawRequest {
                amount: withdrawal.amount,
                phone: withdrawal.phone,
                reference,
                reason: withdrawal.reason,
            })
            .await;

        self.record_initiation(order, &withdrawal.provider, result)
            .await
    }

    /// Persist the gateway's answer to an initiation call. A business
    /// rejection fails the order; a transport or auth fault fails it too,
    /// since the provider never acknowledged the request.
    async fn record_initiation(
        &self,
        order: Order,
        provider: &ProviderName,
        result: Result<PayResult, PaymentError>,
    ) -> ReconciliationResult<Order> {
        match result {
            Ok(accepted) if accepted.success => {
                let order = match accepted
                    .data
                    .as_ref()
                    .and_then(|data| provider_order_number(provider, data))
                {
                    Some(number) => {
                        self.store
                            .set_provider_order_number(order.id, &number)
                            .await?
                    }
                    None => order,
                };
                info!(order_id = %order.id, "gateway accepted the request");
                Ok(order)
            }
            Ok(rejected) => {
                warn!(
                    order_id = %order.id,
                    message = %rejected.message,
                    "gateway rejected the request"
                );
                let order = self
                    .store
                    .update_status(order.id, OrderStatus::Failed, Some(rejected.message))
                    .await?;
                Ok(order)
            }
            Err(err) => {
                error!(order_id = %order.id, error = %err, "gateway call failed");
                self.store
                    .update_status(order.id, OrderStatus::Failed, Some(err.to_string()))
                    .await?;
                Err(err.into())
            }
        }
    }

    /// Poll the gateway for a pending order and settle it if the provider
    /// reports a final state. Final orders are returned untouched.
    pub async fn reconcile(&self, order_id: Uuid) -> ReconciliationResult<Order> {
        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(ReconciliationError::OrderNotFound(order_id))?;

        if !order.is_pending() {
            return Ok(order);
        }

        let provider = ProviderName::from_str(&order.provider)?;
        let gateway = self.gateways.resolve(provider)?;

        let result = gateway
            .check(CheckRequest {
                order_number: order.provider_order_number.clone(),
                reference: Some(order.reference.clone()),
                currency: order.currency.clone(),
            })
            .await?;

        self.settle(order, result.status, Some(result.message)).await
    }

    /// Apply a final status reported out-of-band, typically by a webhook.
    /// Non-final statuses leave the order pending.
    pub async fn apply_confirmation(
        &self,
        order_id: Uuid,
        status: TxStatus,
        message: Option<String>,
    ) -> ReconciliationResult<Order> {
        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(ReconciliationError::OrderNotFound(order_id))?;

        if !order.is_pending() {
            info!(order_id = %order.id, status = %order.status, "order already settled");
            return Ok(order);
        }

        self.settle(order, status, message).await
    }

    /// Sweep the oldest pending orders through `reconcile`. Individual
    /// failures are logged and skipped so one sick provider does not stall
    /// the rest of the batch.
    pub async fn reconcile_pending(&self, limit: i64) -> ReconciliationResult<usize> {
        let pending = self.store.list_pending(limit).await?;
        let total = pending.len();
        let mut settled = 0;

        for order in pending {
            match self.reconcile(order.id).await {
                Ok(updated) if !updated.is_pending() => settled += 1,
                Ok(_) => {}
                Err(err) => {
                    warn!(order_id = %order.id, error = %err, "reconciliation sweep entry failed")
                }
            }
        }

        info!(total, settled, "reconciliation sweep finished");
        Ok(settled)
    }

    async fn settle(
        &self,
        order: Order,
        status: TxStatus,
        message: Option<String>,
    ) -> ReconciliationResult<Order> {
        match status {
            TxStatus::Paid => self.complete_order(order).await,
            TxStatus::Failed => {
                let order = self
                    .store
                    .update_status(order.id, OrderStatus::Failed, message)
                    .await?;
                info!(order_id = %order.id, "order failed");
                Ok(order)
            }
            TxStatus::Pending | TxStatus::Accepted => Ok(order),
            TxStatus::Unknown => {
                warn!(order_id = %order.id, "provider reported an unrecognized status");
                Ok(order)
            }
        }
    }

    /// Flip a pending order to completed and run the completion effects.
    ///
    /// The transition is a single conditional write on the store, so of two
    /// racing confirmations only the one that actually flipped the row runs
    /// the effects. An effect failure is surfaced in the order's
    /// error_message but never reverts the completed status.
    async fn complete_order(&self, order: Order) -> ReconciliationResult<Order> {
        let Some(order) = self.store.complete_if_pending(order.id).await? else {
            let current = self
                .store
                .find_by_id(order.id)
                .await?
                .ok_or(ReconciliationError::OrderNotFound(order.id))?;
            info!(order_id = %current.id, status = %current.status, "completion already applied, skipping");
            return Ok(current);
        };
        info!(order_id = %order.id, reference = %order.reference, "order completed");

        if let Err(err) = self.effects.on_completed(&order).await {
            error!(order_id = %order.id, error = %err, "completion effects failed");
            let order = self
                .store
                .update_status(
                    order.id,
                    OrderStatus::Completed,
                    Some(format!("completion effects failed: {}", err)),
                )
                .await?;
            return Ok(order);
        }

        Ok(order)
    }
}

fn new_reference() -> String {
    format!("MSL-{}", Uuid::new_v4().simple())
}

fn parse_amount(money: &Money) -> Result<BigDecimal, PaymentError> {
    BigDecimal::from_str(&money.amount).map_err(|_| PaymentError::Validation {
        message: format!("invalid decimal amount: {}", money.amount),
        field: Some("amount".to_string()),
    })
}

/// Where each provider hides its own order identifier in the acceptance
/// payload.
fn provider_order_number(provider: &ProviderName, data: &JsonValue) -> Option<String> {
    let key = match provider {
        ProviderName::Flexpay => "orderNumber",
        ProviderName::Cinetpay => "payment_token",
        ProviderName::Wonyapay => "order_id",
    };
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::provider::PaymentGateway;
    use crate::payments::PaymentResult;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MemStore {
        orders: Mutex<HashMap<Uuid, Order>>,
        /// Delay applied after each read, to widen race windows.
        read_delay: Option<std::time::Duration>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                orders: Mutex::new(HashMap::new()),
                read_delay: None,
            }
        }

        fn slow(read_delay: std::time::Duration) -> Self {
            Self {
                orders: Mutex::new(HashMap::new()),
                read_delay: Some(read_delay),
            }
        }
    }

    #[async_trait]
    impl OrderStore for MemStore {
        async fn create(&self, new: NewOrder) -> Result<Order, StoreError> {
            let mut orders = self.orders.lock().unwrap();
            if orders.values().any(|o| o.reference == new.reference) {
                return Err(StoreError::DuplicateReference(new.reference));
            }
            let order = Order {
                id: Uuid::new_v4(),
                reference: new.reference,
                provider: new.provider,
                kind: new.kind.as_str().to_string(),
                amount: new.amount,
                currency: new.currency,
                phone: new.phone,
                channel: new.channel,
                status: OrderStatus::Pending.as_str().to_string(),
                provider_order_number: None,
                error_message: None,
                metadata: new.metadata,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            };
            orders.insert(order.id, order.clone());
            Ok(order)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
            let found = self.orders.lock().unwrap().get(&id).cloned();
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(found)
        }

        async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>, StoreError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .values()
                .find(|o| o.reference == reference)
                .cloned())
        }

        async fn find_by_provider_order_number(
            &self,
            provider: &str,
            number: &str,
        ) -> Result<Option<Order>, StoreError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .values()
                .find(|o| {
                    o.provider == provider
                        && o.provider_order_number.as_deref() == Some(number)
                })
                .cloned())
        }

        async fn set_provider_order_number(
            &self,
            id: Uuid,
            number: &str,
        ) -> Result<Order, StoreError> {
            let mut orders = self.orders.lock().unwrap();
            let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
            order.provider_order_number = Some(number.to_string());
            Ok(order.clone())
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: OrderStatus,
            error_message: Option<String>,
        ) -> Result<Order, StoreError> {
            let mut orders = self.orders.lock().unwrap();
            let order = orders.get_mut(&id).ok_or(StoreError::NotFound)?;
            order.status = status.as_str().to_string();
            order.error_message = error_message;
            Ok(order.clone())
        }

        async fn complete_if_pending(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
            let mut orders = self.orders.lock().unwrap();
            let Some(order) = orders.get_mut(&id) else {
                return Ok(None);
            };
            if !order.is_pending() {
                return Ok(None);
            }
            order.status = OrderStatus::Completed.as_str().to_string();
            order.error_message = None;
            Ok(Some(order.clone()))
        }

        async fn list_pending(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
            let mut pending: Vec<Order> = self
                .orders
                .lock()
                .unwrap()
                .values()
                .filter(|o| o.is_pending())
                .cloned()
                .collect();
            pending.sort_by_key(|o| o.created_at);
            pending.truncate(limit as usize);
            Ok(pending)
        }
    }

    /// Gateway that replays scripted answers.
    #[derive(Debug)]
    struct ScriptedGateway {
        deposit: PaymentResult<PayResult>,
        check: Mutex<Vec<PayResult>>,
        withdraw: PaymentResult<PayResult>,
    }

    impl ScriptedGateway {
        fn accepting(order_number: &str) -> Self {
            Self {
                deposit: Ok(PayResult::accepted(
                    "Transaction en cours",
                    Some(serde_json::json!({ "orderNumber": order_number })),
                )),
                check: Mutex::new(Vec::new()),
                withdraw: Ok(PayResult::accepted("Payout en cours", None)),
            }
        }

        fn with_check(self, results: Vec<PayResult>) -> Self {
            *self.check.lock().unwrap() = results;
            self
        }
    }

    fn clone_result(r: &PaymentResult<PayResult>) -> PaymentResult<PayResult> {
        match r {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(PaymentError::Network {
                message: e.to_string(),
            }),
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn deposit(&self, _request: DepositRequest) -> PaymentResult<PayResult> {
            clone_result(&self.deposit)
        }

        async fn check(&self, _request: CheckRequest) -> PaymentResult<PayResult> {
            let mut scripted = self.check.lock().unwrap();
            if scripted.is_empty() {
                return Ok(PayResult {
                    success: true,
                    message: "pending".to_string(),
                    status: TxStatus::Pending,
                    data: None,
                });
            }
            Ok(scripted.remove(0))
        }

        async fn withdraw(&self, _request: WithdrawRequest) -> PaymentResult<PayResult> {
            clone_result(&self.withdraw)
        }

        fn name(&self) -> ProviderName {
            ProviderName::Flexpay
        }
    }

    struct CountingEffects {
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingEffects {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl OrderEffects for CountingEffects {
        async fn on_completed(&self, _order: &Order) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("balance service unavailable");
            }
            Ok(())
        }
    }

    struct Harness {
        store: Arc<MemStore>,
        service: ReconciliationService,
        effects: Arc<CountingEffects>,
    }

    fn harness(gateway: ScriptedGateway, failing_effects: bool) -> Harness {
        let store = Arc::new(MemStore::new());
        let effects = Arc::new(CountingEffects::new(failing_effects));
        let factory = Arc::new(GatewayFactory::with_gateway(
            ProviderName::Flexpay,
            Arc::new(gateway),
        ));
        let service =
            ReconciliationService::new(store.clone(), factory, effects.clone());
        Harness {
            store,
            service,
            effects,
        }
    }

    fn deposit() -> NewDeposit {
        NewDeposit {
            provider: ProviderName::Flexpay,
            amount: Money {
                amount: "1500.00".to_string(),
                currency: "CDF".to_string(),
            },
            channel: PaymentChannel::Mobile,
            phone: Some("+243991234567".to_string()),
            customer: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn accepted_deposit_stays_pending_with_provider_number() {
        let h = harness(ScriptedGateway::accepting("ORD-77"), false);

        let order = h.service.place_deposit(deposit()).await.unwrap();

        assert!(order.is_pending());
        assert_eq!(order.provider_order_number.as_deref(), Some("ORD-77"));
        assert!(order.reference.starts_with("MSL-"));
        assert_eq!(h.effects.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_deposit_marks_order_failed() {
        let gateway = ScriptedGateway {
            deposit: Ok(PayResult::rejected(
                "Solde insuffisant",
                TxStatus::Failed,
                None,
            )),
            check: Mutex::new(Vec::new()),
            withdraw: Ok(PayResult::accepted("ok", None)),
        };
        let h = harness(gateway, false);

        let order = h.service.place_deposit(deposit()).await.unwrap();

        assert_eq!(order.status, "failed");
        assert_eq!(order.error_message.as_deref(), Some("Solde insuffisant"));
    }

    #[tokio::test]
    async fn transport_fault_fails_the_order_and_propagates() {
        let gateway = ScriptedGateway {
            deposit: Err(PaymentError::Network {
                message: "connection refused".to_string(),
            }),
            check: Mutex::new(Vec::new()),
            withdraw: Ok(PayResult::accepted("ok", None)),
        };
        let h = harness(gateway, false);

        let result = h.service.place_deposit(deposit()).await;
        assert!(matches!(
            result,
            Err(ReconciliationError::Payment(PaymentError::Network { .. }))
        ));

        let order = h.store.list_pending(10).await.unwrap();
        assert!(order.is_empty(), "failed order must not stay pending");
    }

    #[tokio::test]
    async fn reconcile_paid_completes_and_runs_effects_once() {
        let gateway = ScriptedGateway::accepting("ORD-77").with_check(vec![PayResult {
            success: true,
            message: "Transaction reussie".to_string(),
            status: TxStatus::Paid,
            data: None,
        }]);
        let h = harness(gateway, false);

        let order = h.service.place_deposit(deposit()).await.unwrap();
        let settled = h.service.reconcile(order.id).await.unwrap();

        assert_eq!(settled.status, "completed");
        assert_eq!(h.effects.calls.load(Ordering::SeqCst), 1);

        // Replayed confirmation: already settled, effects untouched.
        let again = h
            .service
            .apply_confirmation(order.id, TxStatus::Paid, None)
            .await
            .unwrap();
        assert_eq!(again.status, "completed");
        assert_eq!(h.effects.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn racing_confirmations_run_effects_exactly_once() {
        // A read delay lets both confirmations observe the order while it is
        // still pending; the conditional completion write must admit only one.
        let store = Arc::new(MemStore::slow(std::time::Duration::from_millis(50)));
        let effects = Arc::new(CountingEffects::new(false));
        let factory = Arc::new(GatewayFactory::with_gateway(
            ProviderName::Flexpay,
            Arc::new(ScriptedGateway::accepting("ORD-77")),
        ));
        let service = Arc::new(ReconciliationService::new(
            store.clone(),
            factory,
            effects.clone(),
        ));

        let order = service.place_deposit(deposit()).await.unwrap();

        let first = tokio::spawn({
            let service = service.clone();
            let id = order.id;
            async move { service.apply_confirmation(id, TxStatus::Paid, None).await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            let id = order.id;
            async move { service.apply_confirmation(id, TxStatus::Paid, None).await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(first.status, "completed");
        assert_eq!(second.status, "completed");
        assert_eq!(effects.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_check_leaves_order_pending() {
        let h = harness(ScriptedGateway::accepting("ORD-77"), false);

        let order = h.service.place_deposit(deposit()).await.unwrap();
        let checked = h.service.reconcile(order.id).await.unwrap();

        assert!(checked.is_pending());
    }

    #[tokio::test]
    async fn unknown_status_never_settles_an_order() {
        let gateway = ScriptedGateway::accepting("ORD-77").with_check(vec![PayResult::rejected(
            "unrecognized status 9",
            TxStatus::Unknown,
            None,
        )]);
        let h = harness(gateway, false);

        let order = h.service.place_deposit(deposit()).await.unwrap();
        let checked = h.service.reconcile(order.id).await.unwrap();

        assert!(checked.is_pending());
        assert_eq!(h.effects.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn effect_failure_keeps_order_completed() {
        let gateway = ScriptedGateway::accepting("ORD-77").with_check(vec![PayResult {
            success: true,
            message: "ok".to_string(),
            status: TxStatus::Paid,
            data: None,
        }]);
        let h = harness(gateway, true);

        let order = h.service.place_deposit(deposit()).await.unwrap();
        let settled = h.service.reconcile(order.id).await.unwrap();

        assert_eq!(settled.status, "completed");
        assert!(settled
            .error_message
            .as_deref()
            .unwrap()
            .contains("completion effects failed"));
    }

    #[tokio::test]
    async fn failed_confirmation_records_the_provider_message() {
        let h = harness(ScriptedGateway::accepting("ORD-77"), false);

        let order = h.service.place_deposit(deposit()).await.unwrap();
        let failed = h
            .service
            .apply_confirmation(
                order.id,
                TxStatus::Failed,
                Some("Transaction echouee".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(failed.status, "failed");
        assert_eq!(failed.error_message.as_deref(), Some("Transaction echouee"));
        assert_eq!(h.effects.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sweep_settles_only_final_orders() {
        let gateway = ScriptedGateway::accepting("ORD-77").with_check(vec![PayResult {
            success: true,
            message: "ok".to_string(),
            status: TxStatus::Paid,
            data: None,
        }]);
        let h = harness(gateway, false);

        let paid = h.service.place_deposit(deposit()).await.unwrap();
        let still_pending = h.service.place_deposit(deposit()).await.unwrap();

        let settled = h.service.reconcile_pending(10).await.unwrap();
        assert_eq!(settled, 1);

        assert_eq!(
            h.store.find_by_id(paid.id).await.unwrap().unwrap().status,
            "completed"
        );
        assert!(h
            .store
            .find_by_id(still_pending.id)
            .await
            .unwrap()
            .unwrap()
            .is_pending());
    }

    #[tokio::test]
    async fn withdrawal_order_is_created_pending() {
        let h = harness(ScriptedGateway::accepting("ORD-77"), false);

        let order = h
            .service
            .place_withdrawal(NewWithdrawal {
                provider: ProviderName::Flexpay,
                amount: Money {
                    amount: "25.00".to_string(),
                    currency: "USD".to_string(),
                },
                phone: "243991234567".to_string(),
                reason: Some("seller settlement".to_string()),
            })
            .await
            .unwrap();

        assert!(order.is_pending());
        assert_eq!(order.kind, "withdrawal");
    }

    #[test]
    fn provider_order_number_lookup_matches_each_payload_shape() {
        let flexpay = serde_json::json!({ "orderNumber": "ORD-1" });
        let cinetpay = serde_json::json!({ "payment_token": "tok-2" });
        let wonyapay = serde_json::json!({ "order_id": "WP-3" });

        assert_eq!(
            provider_order_number(&ProviderName::Flexpay, &flexpay).as_deref(),
            Some("ORD-1")
        );
        assert_eq!(
            provider_order_number(&ProviderName::Cinetpay, &cinetpay).as_deref(),
            Some("tok-2")
        );
        assert_eq!(
            provider_order_number(&ProviderName::Wonyapay, &wonyapay).as_deref(),
            Some("WP-3")
        );
        assert_eq!(
            provider_order_number(&ProviderName::Flexpay, &cinetpay),
            None
        );
    }
}
