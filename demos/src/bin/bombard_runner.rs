use std::process;

use anyhow::{Context as _, Result};
use runner_examples::{init_tracing, load_network};
use testing_framework_config::genesis::NetworkGenesisConfig;
use testing_framework_core::scenario::Scenario;
use testing_framework_workflows::{
    BombardBuilder, StakingNetworkBombardTest, ValidatorSetExpectation,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run_bombard().await {
        warn!("bombard runner failed: {err:#}");
        process::exit(1);
    }
}

async fn run_bombard() -> Result<()> {
    let network = load_network()?;
    let builder = BombardBuilder::from_env().context("reading bombard parameters")?;
    info!(
        txs_per_account = builder.configured_txs_per_account(),
        tx_fee = builder.configured_tx_fee(),
        "building bombard scenario"
    );

    let stakers = NetworkGenesisConfig::local().staker_count();
    let mut scenario = Scenario::new(StakingNetworkBombardTest::new(builder))
        .with_expectation(ValidatorSetExpectation::new().with_count(stakers));
    scenario
        .run(&network)
        .await
        .context("running bombard scenario failed")?;
    info!("scenario complete");

    Ok(())
}
