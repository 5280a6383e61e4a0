use async_trait::async_trait;

use super::{DynError, NetworkControl};

#[async_trait]
/// Defines a check evaluated after a scenario's test body has completed.
pub trait Expectation: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&mut self, network: &dyn NetworkControl) -> Result<(), DynError>;
}
