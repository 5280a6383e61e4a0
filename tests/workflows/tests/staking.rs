use std::time::Duration;

use testing_framework_config::{genesis::NetworkGenesisConfig, staking::StakingSchedule};
use testing_framework_core::{ledger::AcceptancePoller, nodes::UserPass};
use testing_framework_workflows::WorkflowRunner;
use tests_workflows::MockNetwork;
use tokio::time::Instant;

const SEED: u64 = 2_000_000_000_000;
const STAKE: u64 = 1_000_000_000_000;

fn poller() -> AcceptancePoller {
    AcceptancePoller::new(Duration::from_secs(30)).with_poll_interval(Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn validator_is_registered_and_staking_has_started_on_return() {
    let network = MockNetwork::new(1);
    let schedule = StakingSchedule::default();
    let runner = WorkflowRunner::new(network.api(0), UserPass::random(), poller())
        .with_staking_schedule(schedule);

    let started = Instant::now();
    let p_address = runner
        .import_genesis_funds_and_start_validating(SEED, STAKE)
        .await
        .unwrap();
    assert!(started.elapsed() >= schedule.staking_delay + schedule.synchrony_buffer);

    let requests = network.validator_requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.node_id, network.node(0).node_id());
    assert_eq!(request.reward_address, p_address);
    assert_eq!(request.stake_amount, STAKE);
    assert_eq!(
        request.end_time - request.start_time,
        schedule.staking_period.as_secs()
    );

    let genesis_stakers = NetworkGenesisConfig::local().staker_count();
    assert_eq!(network.validators().len(), genesis_stakers + 1);
    runner
        .verify_p_chain_balance(&p_address, SEED - network.tx_fee() - STAKE)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn delegation_targets_an_existing_validator() {
    let network = MockNetwork::new(1);
    let schedule = StakingSchedule::default().with_delays(Duration::from_secs(30), Duration::from_secs(1));
    let runner = WorkflowRunner::new(network.api(0), UserPass::random(), poller())
        .with_staking_schedule(schedule);
    runner.import_genesis_funds().await.unwrap();
    let p_address = runner
        .node()
        .p_chain()
        .create_address(runner.user())
        .await
        .unwrap();
    runner.transfer_x_to_p(&p_address, SEED).await.unwrap();

    let delegatee = NetworkGenesisConfig::local().stakers[0].node_id.clone();
    let started = Instant::now();
    runner
        .add_delegator(&delegatee, &p_address, STAKE)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(31));

    let requests = network.delegator_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].node_id, delegatee);
    assert_eq!(
        requests[0].end_time - requests[0].start_time,
        schedule.delegation_period.as_secs()
    );
}

#[tokio::test(start_paused = true)]
async fn delegating_to_an_unknown_node_fails() {
    let network = MockNetwork::new(1);
    let runner = WorkflowRunner::new(network.api(0), UserPass::random(), poller());
    runner.import_genesis_funds().await.unwrap();
    let p_address = runner
        .node()
        .p_chain()
        .create_address(runner.user())
        .await
        .unwrap();
    runner.transfer_x_to_p(&p_address, SEED).await.unwrap();

    let err = runner
        .add_delegator("NodeID-nobody", &p_address, STAKE)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("NodeID-nobody"), "{err}");
}
