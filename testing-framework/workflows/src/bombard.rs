//! Concurrent submission of many dependent transaction chains.
//!
//! The first node holds the genesis funds and seeds one account on every
//! other node. Each account then builds its own chain offline and all accounts
//! submit at the same time. Acceptance is confirmed only after every
//! submission has returned.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use testing_framework_config::genesis::NetworkGenesisConfig;
use testing_framework_core::{
    ids::Id,
    ledger::AcceptancePoller,
    nodes::{SharedNodeApi, UserPass},
    scenario::panic_message,
};
use thiserror::Error;
use tokio::{task::JoinSet, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    chain::{ChainBuildError, ChainContext, TxChain, build_chain},
    runner::{WorkflowError, WorkflowRunner},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BombardPhase {
    Setup,
    Fund,
    Verify,
    Build,
    Issue,
    Confirm,
}

impl fmt::Display for BombardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Fund => "fund",
            Self::Verify => "verify",
            Self::Build => "build",
            Self::Issue => "issue",
            Self::Confirm => "confirm",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BombardError {
    #[error("bombard requires at least 2 nodes, found {found}")]
    NotEnoughNodes { found: usize },
    #[error("seed amount for {txs_per_account} transactions at fee {tx_fee} overflows")]
    SeedOverflow { txs_per_account: u64, tx_fee: u64 },
    #[error("{phase} phase failed")]
    Phase {
        phase: BombardPhase,
        #[source]
        source: WorkflowError,
    },
    #[error("{phase} phase failed for account {account}")]
    Account {
        phase: BombardPhase,
        account: usize,
        #[source]
        source: WorkflowError,
    },
    #[error("failed to build transaction chain for account {account}")]
    Build {
        account: usize,
        #[source]
        source: ChainBuildError,
    },
    #[error("account {account} ({address}) owns no spendable output")]
    NoUtxo { account: usize, address: String },
    #[error("issuing task for account {account} panicked: {message}")]
    Panicked { account: usize, message: String },
    #[error("issuing task was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(
        "node returned {actual} for transaction {index} of account {account}, expected {expected}"
    )]
    UnexpectedTxId {
        account: usize,
        index: usize,
        expected: Id,
        actual: Id,
    },
}

/// Transactions submitted by a single account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountReport {
    pub address: String,
    pub tx_ids: Vec<Id>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BombardReport {
    pub accounts: Vec<AccountReport>,
    /// Wall-clock time from the first submission until every account's
    /// submissions returned.
    pub issue_duration: Duration,
}

impl BombardReport {
    #[must_use]
    pub fn total_txs(&self) -> usize {
        self.accounts.iter().map(|account| account.tx_ids.len()).sum()
    }

    /// Submitted transactions per second over the issue phase.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.issue_duration.as_secs_f64();
        if secs > 0.0 {
            self.total_txs() as f64 / secs
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn all_tx_ids(&self) -> Vec<Id> {
        self.accounts
            .iter()
            .flat_map(|account| account.tx_ids.iter().copied())
            .collect()
    }
}

struct Account {
    runner: WorkflowRunner,
    address: String,
}

struct PreparedAccount {
    account: Account,
    chain: TxChain,
}

/// Seeds one account per secondary node and has every account submit a
/// chain of `txs_per_account` transactions concurrently.
#[derive(Clone)]
pub struct BombardExecutor {
    nodes: Vec<SharedNodeApi>,
    txs_per_account: u64,
    tx_fee: u64,
    poller: AcceptancePoller,
    genesis: NetworkGenesisConfig,
}

impl BombardExecutor {
    /// `nodes[0]` holds the genesis funds; every other node gets an account.
    #[must_use]
    pub fn new(
        nodes: Vec<SharedNodeApi>,
        txs_per_account: u64,
        tx_fee: u64,
        poller: AcceptancePoller,
    ) -> Self {
        Self {
            nodes,
            txs_per_account,
            tx_fee,
            poller,
            genesis: NetworkGenesisConfig::local(),
        }
    }

    #[must_use]
    pub fn with_genesis(mut self, genesis: NetworkGenesisConfig) -> Self {
        self.genesis = genesis;
        self
    }

    #[must_use]
    pub const fn txs_per_account(&self) -> u64 {
        self.txs_per_account
    }

    #[must_use]
    pub const fn tx_fee(&self) -> u64 {
        self.tx_fee
    }

    /// Amount sent to each account: one fee per transaction plus one left over.
    pub fn seed_amount(&self) -> Result<u64, BombardError> {
        self.txs_per_account
            .checked_add(1)
            .and_then(|n| n.checked_mul(self.tx_fee))
            .ok_or(BombardError::SeedOverflow {
                txs_per_account: self.txs_per_account,
                tx_fee: self.tx_fee,
            })
    }

    pub async fn execute(&self) -> Result<BombardReport, BombardError> {
        let Some((genesis_node, secondary_nodes)) = self.nodes.split_first() else {
            return Err(BombardError::NotEnoughNodes { found: 0 });
        };
        if secondary_nodes.is_empty() {
            return Err(BombardError::NotEnoughNodes { found: 1 });
        }
        let seed_amount = self.seed_amount()?;

        info!(
            accounts = secondary_nodes.len(),
            txs_per_account = self.txs_per_account,
            tx_fee = self.tx_fee,
            "starting bombard"
        );

        let accounts = self.create_accounts(secondary_nodes).await?;
        let genesis = WorkflowRunner::new(
            Arc::clone(genesis_node),
            UserPass::random(),
            self.poller,
        )
        .with_genesis(self.genesis.clone());
        genesis
            .import_genesis_funds()
            .await
            .map_err(phase(BombardPhase::Setup))?;
        let genesis_address = genesis
            .genesis_address()
            .await
            .map_err(phase(BombardPhase::Setup))?;
        info!(%genesis_address, "imported genesis funds");

        let addresses: Vec<String> = accounts.iter().map(|a| a.address.clone()).collect();
        genesis
            .fund_x_chain_addresses(&addresses, seed_amount)
            .await
            .map_err(phase(BombardPhase::Fund))?;
        info!(seed_amount, accounts = addresses.len(), "funded accounts");

        for (index, account) in accounts.iter().enumerate() {
            account
                .runner
                .verify_x_chain_balance(&account.address, seed_amount)
                .await
                .map_err(account_phase(BombardPhase::Verify, index))?;
        }
        info!("verified account balances");

        let context = genesis
            .chain_context()
            .await
            .map_err(phase(BombardPhase::Build))?;
        let prepared = self.build_chains(accounts, context).await?;

        let (accounts, issue_duration) = Self::issue_all(&prepared).await?;
        let report = BombardReport {
            accounts,
            issue_duration,
        };
        info!(
            txs = report.total_txs(),
            secs = issue_duration.as_secs_f64(),
            throughput = report.throughput(),
            "finished issuing transaction chains"
        );

        for (index, account) in report.accounts.iter().enumerate() {
            genesis
                .await_x_chain_txs(&account.tx_ids)
                .await
                .map_err(account_phase(BombardPhase::Confirm, index))?;
        }
        info!(txs = report.total_txs(), "confirmed all issued transactions");

        Ok(report)
    }

    async fn create_accounts(
        &self,
        nodes: &[SharedNodeApi],
    ) -> Result<Vec<Account>, BombardError> {
        let mut accounts = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let runner = WorkflowRunner::new(
                Arc::clone(node),
                UserPass::random(),
                self.poller,
            );
            let addresses = runner
                .create_default_addresses()
                .await
                .map_err(account_phase(BombardPhase::Setup, index))?;
            debug!(account = index, address = %addresses.x_chain, "created account");
            accounts.push(Account {
                runner,
                address: addresses.x_chain,
            });
        }
        Ok(accounts)
    }

    async fn build_chains(
        &self,
        accounts: Vec<Account>,
        context: ChainContext,
    ) -> Result<Vec<PreparedAccount>, BombardError> {
        let mut prepared = Vec::with_capacity(accounts.len());
        for (index, account) in accounts.into_iter().enumerate() {
            let utxos = account
                .runner
                .get_all_utxos(std::slice::from_ref(&account.address))
                .await
                .map_err(account_phase(BombardPhase::Build, index))?;
            let Some(utxo) = utxos.into_iter().next() else {
                return Err(BombardError::NoUtxo {
                    account: index,
                    address: account.address,
                });
            };
            let key = account
                .runner
                .export_private_key(&account.address)
                .await
                .map_err(account_phase(BombardPhase::Build, index))?;
            let chain = build_chain(&utxo, self.txs_per_account, self.tx_fee, &key, context)
                .map_err(|source| BombardError::Build {
                    account: index,
                    source,
                })?;
            debug!(account = index, txs = chain.len(), "built transaction chain");
            prepared.push(PreparedAccount { account, chain });
        }
        Ok(prepared)
    }

    /// Submits every chain concurrently, one task per account. The first
    /// failure aborts the remaining tasks.
    async fn issue_all(
        prepared: &[PreparedAccount],
    ) -> Result<(Vec<AccountReport>, Duration), BombardError> {
        let mut tasks = JoinSet::new();
        let mut accounts = HashMap::with_capacity(prepared.len());
        let started = Instant::now();
        for (index, entry) in prepared.iter().enumerate() {
            let runner = entry.account.runner.clone();
            let txs = entry.chain.bytes();
            let task = tasks.spawn(async move { runner.issue_tx_list(&txs).await });
            accounts.insert(task.id(), index);
        }

        let mut issued: Vec<Option<Vec<Id>>> = vec![None; prepared.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, Ok(tx_ids))) => {
                    issued[accounts[&id]] = Some(tx_ids);
                    continue;
                }
                Ok((id, Err(source))) => BombardError::Account {
                    phase: BombardPhase::Issue,
                    account: accounts[&id],
                    source,
                },
                Err(err) if err.is_panic() => BombardError::Panicked {
                    account: accounts[&err.id()],
                    message: panic_message(err.into_panic()),
                },
                Err(err) => BombardError::Join(err),
            };
            warn!(error = %outcome, "aborting outstanding submissions");
            tasks.abort_all();
            return Err(outcome);
        }
        let issue_duration = started.elapsed();

        let mut reports = Vec::with_capacity(prepared.len());
        for (index, (entry, tx_ids)) in prepared.iter().zip(issued).enumerate() {
            let tx_ids = tx_ids.unwrap_or_default();
            for (position, (expected, actual)) in
                entry.chain.ids().into_iter().zip(&tx_ids).enumerate()
            {
                if expected != *actual {
                    return Err(BombardError::UnexpectedTxId {
                        account: index,
                        index: position,
                        expected,
                        actual: *actual,
                    });
                }
            }
            reports.push(AccountReport {
                address: entry.account.address.clone(),
                tx_ids,
            });
        }
        Ok((reports, issue_duration))
    }
}

fn phase(phase: BombardPhase) -> impl FnOnce(WorkflowError) -> BombardError {
    move |source| BombardError::Phase { phase, source }
}

fn account_phase(phase: BombardPhase, account: usize) -> impl FnOnce(WorkflowError) -> BombardError {
    move |source| BombardError::Account {
        phase,
        account,
        source,
    }
}
