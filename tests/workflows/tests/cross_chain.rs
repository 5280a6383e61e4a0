use std::time::Duration;

use testing_framework_core::{
    ids::Id,
    ledger::{AcceptanceError, AcceptancePoller},
    nodes::UserPass,
};
use testing_framework_workflows::{WorkflowError, WorkflowRunner};
use tests_workflows::{MockNetwork, RecordedCall};

const AMOUNT: u64 = 50_000_000;

fn poller() -> AcceptancePoller {
    AcceptancePoller::new(Duration::from_secs(30)).with_poll_interval(Duration::from_secs(1))
}

fn last_status_poll(calls: &[RecordedCall], method: &str, tx_id: Id) -> usize {
    calls
        .iter()
        .rposition(|c| c.method == method && c.tx_id == Some(tx_id))
        .unwrap()
}

fn submission(calls: &[RecordedCall], method: &str, tx_id: Id) -> usize {
    calls
        .iter()
        .position(|c| c.method == method && c.tx_id == Some(tx_id))
        .unwrap()
}

async fn genesis_runner(network: &MockNetwork) -> (WorkflowRunner, String) {
    let runner = WorkflowRunner::new(network.api(0), UserPass::random(), poller());
    runner.import_genesis_funds().await.unwrap();
    let p_address = runner
        .node()
        .p_chain()
        .create_address(runner.user())
        .await
        .unwrap();
    (runner, p_address)
}

#[tokio::test(start_paused = true)]
async fn x_to_p_imports_only_after_export_is_accepted() {
    let network = MockNetwork::new(1);
    let (runner, p_address) = genesis_runner(&network).await;

    let transfer = runner.transfer_x_to_p(&p_address, AMOUNT).await.unwrap();

    let calls = network.calls();
    assert!(
        last_status_poll(&calls, "avm.getTxStatus", transfer.export_tx)
            < submission(&calls, "platform.importAVAX", transfer.import_tx)
    );
    runner
        .verify_p_chain_balance(&p_address, AMOUNT - network.tx_fee())
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn p_to_x_round_trip() {
    let network = MockNetwork::new(1);
    let fee = network.tx_fee();
    let (runner, p_address) = genesis_runner(&network).await;
    runner.transfer_x_to_p(&p_address, AMOUNT).await.unwrap();

    let x_address = runner
        .node()
        .x_chain()
        .create_address(runner.user())
        .await
        .unwrap();
    let back = AMOUNT / 2;
    let transfer = runner.transfer_p_to_x(&x_address, back).await.unwrap();

    let calls = network.calls();
    assert!(
        last_status_poll(&calls, "platform.getTxStatus", transfer.export_tx)
            < submission(&calls, "avm.importAVAX", transfer.import_tx)
    );
    runner
        .verify_x_chain_balance(&x_address, back - fee)
        .await
        .unwrap();
    runner
        .verify_p_chain_balance(&p_address, AMOUNT - fee - back - fee)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn import_before_export_acceptance_is_refused() {
    let network = MockNetwork::new(1);
    let (runner, p_address) = genesis_runner(&network).await;

    runner
        .node()
        .x_chain()
        .export_avax(runner.user(), AMOUNT, &p_address)
        .await
        .unwrap();
    let early = runner
        .node()
        .p_chain()
        .import_avax(runner.user(), &p_address, "X")
        .await;
    assert!(early.is_err());
}

#[tokio::test(start_paused = true)]
async fn platform_awaits_only_accept_platform_transactions() {
    let network = MockNetwork::new(1);
    let (runner, p_address) = genesis_runner(&network).await;
    let transfer = runner.transfer_x_to_p(&p_address, AMOUNT).await.unwrap();

    runner
        .await_p_chain_txs(&[transfer.import_tx])
        .await
        .unwrap();

    let err = runner
        .await_p_chain_txs(&[transfer.export_tx])
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            WorkflowError::Confirm {
                source: AcceptanceError::TimedOut { .. },
                ..
            }
        ),
        "{err}"
    );
}
