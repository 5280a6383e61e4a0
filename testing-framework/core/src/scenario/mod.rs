//! Scenario plumbing: a test body executed against a [`NetworkControl`],
//! followed by expectations evaluated on the resulting network state.

mod control;
mod expectation;
mod runner;

pub use control::{NetworkControl, NetworkControlError};
pub use expectation::Expectation;
pub use runner::{DEFAULT_EXECUTION_TIMEOUT, Scenario, ScenarioError, ScenarioTest, panic_message};

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;
