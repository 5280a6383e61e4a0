use async_trait::async_trait;
use testing_framework_config::staking::StakingSchedule;
use testing_framework_core::{
    ledger::AcceptancePoller,
    nodes::UserPass,
    scenario::{DynError, NetworkControl, ScenarioTest},
};
use tracing::info;

use crate::runner::WorkflowRunner;

/// Moves genesis funds onto the platform chain and registers `node` as a
/// validator, returning once its staking period has begun.
#[derive(Clone, Debug)]
pub struct AddValidatorTest {
    node: String,
    seed_amount: u64,
    stake_amount: u64,
    poller: AcceptancePoller,
    staking: StakingSchedule,
}

impl AddValidatorTest {
    #[must_use]
    pub fn new(node: impl Into<String>, seed_amount: u64, stake_amount: u64) -> Self {
        Self {
            node: node.into(),
            seed_amount,
            stake_amount,
            poller: AcceptancePoller::default(),
            staking: StakingSchedule::default(),
        }
    }

    #[must_use]
    pub const fn with_poller(mut self, poller: AcceptancePoller) -> Self {
        self.poller = poller;
        self
    }

    #[must_use]
    pub const fn with_staking_schedule(mut self, staking: StakingSchedule) -> Self {
        self.staking = staking;
        self
    }
}

#[async_trait]
impl ScenarioTest for AddValidatorTest {
    fn name(&self) -> &str {
        "add_validator"
    }

    async fn execute(&self, network: &dyn NetworkControl) -> Result<(), DynError> {
        let node = network
            .node_api(&self.node)
            .ok_or_else(|| format!("no node named '{}'", self.node))?;
        let runner = WorkflowRunner::new(node, UserPass::random(), self.poller)
            .with_staking_schedule(self.staking);
        let p_address = runner
            .import_genesis_funds_and_start_validating(self.seed_amount, self.stake_amount)
            .await?;
        info!(node = %self.node, %p_address, "node is validating");
        Ok(())
    }
}
