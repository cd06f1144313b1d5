use crate::payments::error::PaymentResult;
use crate::payments::types::{
    CheckRequest, DepositRequest, PayResult, ProviderName, WithdrawRequest,
};
use async_trait::async_trait;

/// Uniform contract every gateway adapter implements.
///
/// Deposit and withdraw initiate money movement; check is an idempotent
/// status poll by provider-assigned identifier. Provider-reported business
/// failures come back inside `PayResult`; only transport, authentication and
/// configuration faults are `Err`.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    async fn deposit(&self, request: DepositRequest) -> PaymentResult<PayResult>;

    async fn check(&self, request: CheckRequest) -> PaymentResult<PayResult>;

    async fn withdraw(&self, request: WithdrawRequest) -> PaymentResult<PayResult>;

    fn name(&self) -> ProviderName;
}
