//! Services module for business logic around orders and gateways

pub mod notification;
pub mod reconciliation;

pub use notification::NotificationService;
pub use reconciliation::{
    NewDeposit, NewWithdrawal, NoEffects, OrderEffects, ReconciliationError,
    ReconciliationResult, ReconciliationService,
};
