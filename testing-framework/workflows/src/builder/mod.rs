use std::num::NonZeroU64;

use testing_framework_config::genesis::NetworkGenesisConfig;
use testing_framework_core::{ledger::AcceptancePoller, nodes::SharedNodeApi};
use testing_framework_env as tf_env;

use crate::bombard::BombardExecutor;

pub const DEFAULT_BOMBARD_TXS_PER_ACCOUNT: u64 = 10;
/// Flat fee charged by the local network for a base transaction.
pub const DEFAULT_BOMBARD_TX_FEE: u64 = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum BuilderInputError {
    #[error("{field} must be non-zero")]
    ZeroValue { field: &'static str },
}

/// Collects bombard parameters before binding them to a set of nodes.
#[derive(Clone, Debug)]
pub struct BombardBuilder {
    txs_per_account: NonZeroU64,
    tx_fee: NonZeroU64,
    poller: AcceptancePoller,
    genesis: NetworkGenesisConfig,
}

impl Default for BombardBuilder {
    fn default() -> Self {
        Self {
            txs_per_account: NonZeroU64::new(DEFAULT_BOMBARD_TXS_PER_ACCOUNT)
                .unwrap_or(NonZeroU64::MIN),
            tx_fee: NonZeroU64::new(DEFAULT_BOMBARD_TX_FEE).unwrap_or(NonZeroU64::MIN),
            poller: AcceptancePoller::default(),
            genesis: NetworkGenesisConfig::local(),
        }
    }
}

impl BombardBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `AVALANCHE_BOMBARD_TXS` and
    /// `AVALANCHE_BOMBARD_TX_FEE`.
    pub fn from_env() -> Result<Self, BuilderInputError> {
        let mut builder = Self::default();
        if let Some(txs) = tf_env::avalanche_bombard_txs() {
            builder = builder.txs_per_account(txs)?;
        }
        if let Some(fee) = tf_env::avalanche_bombard_tx_fee() {
            builder = builder.tx_fee(fee)?;
        }
        Ok(builder)
    }

    pub fn txs_per_account(mut self, txs: u64) -> Result<Self, BuilderInputError> {
        self.txs_per_account = NonZeroU64::new(txs).ok_or(BuilderInputError::ZeroValue {
            field: "txs_per_account",
        })?;
        Ok(self)
    }

    pub fn tx_fee(mut self, fee: u64) -> Result<Self, BuilderInputError> {
        self.tx_fee =
            NonZeroU64::new(fee).ok_or(BuilderInputError::ZeroValue { field: "tx_fee" })?;
        Ok(self)
    }

    #[must_use]
    pub const fn poller(mut self, poller: AcceptancePoller) -> Self {
        self.poller = poller;
        self
    }

    #[must_use]
    pub fn genesis(mut self, genesis: NetworkGenesisConfig) -> Self {
        self.genesis = genesis;
        self
    }

    #[must_use]
    pub const fn configured_txs_per_account(&self) -> u64 {
        self.txs_per_account.get()
    }

    #[must_use]
    pub const fn configured_tx_fee(&self) -> u64 {
        self.tx_fee.get()
    }

    #[must_use]
    pub fn build(&self, nodes: Vec<SharedNodeApi>) -> BombardExecutor {
        BombardExecutor::new(
            nodes,
            self.txs_per_account.get(),
            self.tx_fee.get(),
            self.poller,
        )
        .with_genesis(self.genesis.clone())
    }
}
