//! Offline construction of dependent transaction chains.
//!
//! A chain starts from one spendable output and produces `count` transfers in
//! which transaction `k` spends the only output of transaction `k - 1`, paying
//! the fee each time and sending the remainder back to the same owners. The
//! ledger accepts the chain only if it is issued in order.

use testing_framework_core::{
    codec::{BaseTx, SignedTx, TransferOutput, TransferableInput, TransferableOutput, Utxo},
    crypto::PrivateKey,
    ids::Id,
    nodes::{ApiClientError, NodeApi},
};
use testing_framework_config::constants::X_CHAIN_ALIAS;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainBuildError {
    #[error("transaction chain must contain at least one transaction")]
    EmptyChain,
    #[error("fee schedule for {count} transactions at fee {fee} overflows")]
    FeeOverflow { count: u64, fee: u64 },
    #[error("output of {available} cannot fund {count} transactions at fee {fee} (requires {required})")]
    InsufficientFunds {
        available: u64,
        required: u64,
        count: u64,
        fee: u64,
    },
    #[error("output with threshold {threshold} over {owners} owners cannot be spent with a single key")]
    UnsupportedOwner { threshold: u32, owners: usize },
}

/// Ledger identity baked into every transaction of a chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainContext {
    pub network_id: u32,
    pub blockchain_id: Id,
}

impl ChainContext {
    /// Reads the network ID and the asset chain's blockchain ID from `node`.
    pub async fn fetch(node: &dyn NodeApi) -> Result<Self, ApiClientError> {
        let network_id = node.info().network_id().await?;
        let blockchain_id = node.info().blockchain_id(X_CHAIN_ALIAS).await?;
        Ok(Self {
            network_id,
            blockchain_id,
        })
    }
}

/// Signed transactions of one chain, in the order they must be issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxChain {
    txs: Vec<SignedTx>,
}

impl TxChain {
    #[must_use]
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    #[must_use]
    pub fn transactions(&self) -> &[SignedTx] {
        &self.txs
    }

    #[must_use]
    pub fn ids(&self) -> Vec<Id> {
        self.txs.iter().map(SignedTx::id).collect()
    }

    /// Serialized transactions, index-aligned with [`Self::ids`].
    #[must_use]
    pub fn bytes(&self) -> Vec<Vec<u8>> {
        self.txs.iter().map(|tx| tx.bytes().to_vec()).collect()
    }

    /// Amount left in the output of the final transaction.
    #[must_use]
    pub fn final_amount(&self) -> u64 {
        self.txs
            .last()
            .and_then(|tx| tx.unsigned().outputs.first())
            .map_or(0, |output| output.output.amount)
    }
}

/// Builds `count` chained transfers out of `utxo`, each burning `fee`.
///
/// Fails unless `utxo` holds at least `(count + 1) * fee`, so the final output
/// always keeps one more fee's worth. Construction is deterministic.
pub fn build_chain(
    utxo: &Utxo,
    count: u64,
    fee: u64,
    key: &PrivateKey,
    context: ChainContext,
) -> Result<TxChain, ChainBuildError> {
    if count == 0 {
        return Err(ChainBuildError::EmptyChain);
    }
    let owner = &utxo.output;
    if owner.threshold != 1 || owner.addresses.is_empty() {
        return Err(ChainBuildError::UnsupportedOwner {
            threshold: owner.threshold,
            owners: owner.addresses.len(),
        });
    }
    let required = count
        .checked_add(1)
        .and_then(|n| n.checked_mul(fee))
        .ok_or(ChainBuildError::FeeOverflow { count, fee })?;
    if utxo.amount() < required {
        return Err(ChainBuildError::InsufficientFunds {
            available: utxo.amount(),
            required,
            count,
            fee,
        });
    }

    let mut txs = Vec::new();
    let mut spending = utxo.clone();
    for _ in 0..count {
        let remaining = spending.amount() - fee;
        let output = TransferOutput {
            amount: remaining,
            locktime: 0,
            threshold: 1,
            addresses: owner.addresses.clone(),
        };
        let tx = BaseTx {
            network_id: context.network_id,
            blockchain_id: context.blockchain_id,
            outputs: vec![TransferableOutput {
                asset_id: spending.asset_id,
                output: output.clone(),
            }],
            inputs: vec![TransferableInput::spending(&spending)],
            memo: Vec::new(),
        }
        .sign(key);

        spending = Utxo {
            tx_id: tx.id(),
            output_index: 0,
            asset_id: spending.asset_id,
            output,
        };
        txs.push(tx);
    }

    debug!(
        txs = txs.len(),
        seed = utxo.amount(),
        remaining = spending.amount(),
        "built transaction chain"
    );
    Ok(TxChain { txs })
}
