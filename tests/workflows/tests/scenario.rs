use std::time::Duration;

use testing_framework_config::genesis::NetworkGenesisConfig;
use testing_framework_core::{
    ledger::AcceptancePoller,
    scenario::{NetworkControl as _, Scenario, ScenarioError},
};
use testing_framework_workflows::{
    ADDITIONAL_NODES, AddValidatorTest, BombardBuilder, StakingNetworkBombardTest,
    ValidatorSetExpectation,
};
use tests_workflows::MockNetwork;

fn network_with_standby() -> MockNetwork {
    let mut network = MockNetwork::new(3);
    for name in ADDITIONAL_NODES {
        network.add_standby(name).unhealthy_for(2);
    }
    network
}

fn bombard(network: &MockNetwork) -> StakingNetworkBombardTest {
    let builder = BombardBuilder::new()
        .txs_per_account(3)
        .unwrap()
        .tx_fee(network.tx_fee())
        .unwrap()
        .poller(
            AcceptancePoller::new(Duration::from_secs(30))
                .with_poll_interval(Duration::from_secs(1)),
        );
    StakingNetworkBombardTest::new(builder).with_bootstrap_timeout(Duration::from_secs(30))
}

#[tokio::test(start_paused = true)]
async fn bombard_then_bootstrap_additional_nodes() {
    let network = network_with_standby();
    let control = network.static_network();
    let stakers = NetworkGenesisConfig::local().staker_count();

    Scenario::new(bombard(&network))
        .with_expectation(ValidatorSetExpectation::new().with_count(stakers))
        .run(&control)
        .await
        .unwrap();

    for name in ADDITIONAL_NODES {
        assert!(control.node_api(name).is_some());
        let probes = network
            .calls()
            .iter()
            .filter(|c| c.node == name && c.method == "health.getLiveness")
            .count();
        assert_eq!(probes, 3);
    }
}

#[tokio::test(start_paused = true)]
async fn missing_standby_node_fails_the_scenario() {
    let network = MockNetwork::new(3);
    let control = network.static_network();

    let err = Scenario::new(bombard(&network))
        .run(&control)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Execution { .. }), "{err}");
    assert!(err.to_string().contains(ADDITIONAL_NODES[0]));
}

#[tokio::test(start_paused = true)]
async fn unhealthy_node_times_out() {
    let mut network = MockNetwork::new(3);
    for name in ADDITIONAL_NODES {
        network.add_standby(name).unhealthy_for(u32::MAX);
    }
    let control = network.static_network();

    let err = Scenario::new(bombard(&network))
        .run(&control)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Execution { .. }), "{err}");
}

#[tokio::test(start_paused = true)]
async fn validator_expectation_reports_mismatch() {
    let network = network_with_standby();
    let control = network.static_network();

    let err = Scenario::new(bombard(&network))
        .with_expectation(ValidatorSetExpectation::new().with_count(99))
        .run(&control)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected 99 current validators"), "{err}");
}

const VALIDATOR_SEED: u64 = 2_000_000_000_000;
const VALIDATOR_STAKE: u64 = 1_000_000_000_000;

fn add_validator(node: &str) -> AddValidatorTest {
    AddValidatorTest::new(node, VALIDATOR_SEED, VALIDATOR_STAKE).with_poller(
        AcceptancePoller::new(Duration::from_secs(30)).with_poll_interval(Duration::from_secs(1)),
    )
}

#[tokio::test(start_paused = true)]
async fn add_validator_joins_the_current_validator_set() {
    let network = MockNetwork::new(1);
    let control = network.static_network();
    let stakers = NetworkGenesisConfig::local().staker_count();

    Scenario::new(add_validator("node-1"))
        .with_expectation(
            ValidatorSetExpectation::new()
                .with_count(stakers + 1)
                .containing(network.node(0).node_id()),
        )
        .run(&control)
        .await
        .unwrap();

    assert_eq!(network.validator_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn add_validator_on_unknown_node_fails() {
    let network = MockNetwork::new(1);
    let control = network.static_network();

    let err = Scenario::new(add_validator("node-9"))
        .run(&control)
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::Execution { .. }), "{err}");
    assert!(err.to_string().contains("node-9"), "{err}");
    assert!(network.validator_requests().is_empty());
}
