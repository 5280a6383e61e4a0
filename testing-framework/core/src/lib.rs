pub mod codec;
pub mod crypto;
pub mod ids;
pub mod ledger;
pub mod nodes;
pub mod scenario;
pub mod topology;

pub use testing_framework_config::{IS_DEBUG_TRACING, adjust_timeout};
