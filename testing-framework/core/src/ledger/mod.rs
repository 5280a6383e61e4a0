pub mod acceptance;
pub mod status;

pub use acceptance::{AcceptanceError, AcceptancePoller, TxStatusSource};
pub use status::{Chain, StatusOutcome, TxStatus, TxStatusReport};
