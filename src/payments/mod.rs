pub mod error;
pub mod factory;
pub mod provider;
pub mod providers;
pub mod token;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use factory::GatewayFactory;
pub use provider::PaymentGateway;
pub use types::{
    CheckRequest, DepositRequest, PayResult, PaymentChannel, ProviderName, TxStatus,
    WithdrawRequest,
};
