pub mod cinetpay;
pub mod flexpay;
pub mod wonyapay;

pub use cinetpay::{CinetpayConfig, CinetpayGateway};
pub use flexpay::{FlexpayConfig, FlexpayGateway};
pub use wonyapay::{WonyapayConfig, WonyapayGateway};
