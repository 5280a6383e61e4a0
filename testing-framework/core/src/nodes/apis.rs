//! Narrow views of a node's RPC surface.
//!
//! Workflows only talk to nodes through these traits, so the same workflow can
//! drive a live network over JSON-RPC or an in-memory ledger in tests.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use rand::{Rng as _, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use super::ApiClientError;
use crate::{
    codec::Utxo,
    ids::Id,
    ledger::{Chain, TxStatusReport, TxStatusSource},
};

const RANDOM_CREDENTIAL_LEN: usize = 24;

/// Keystore credentials scoping every state-changing call.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserPass {
    pub username: String,
    pub password: String,
}

impl UserPass {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Fresh credentials that will not collide with another run's keystore user.
    #[must_use]
    pub fn random() -> Self {
        Self::new(random_credential(), random_credential())
    }
}

fn random_credential() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_CREDENTIAL_LEN)
        .map(char::from)
        .collect();
    format!("rand:{suffix}")
}

impl fmt::Debug for UserPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPass")
            .field("username", &self.username)
            .field("password", &"..")
            .finish()
    }
}

/// Pagination cursor returned by UTXO queries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtxoIndex {
    pub address: String,
    pub utxo: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UtxoPage {
    pub utxos: Vec<Utxo>,
    pub end_index: UtxoIndex,
}

/// Parameters of an add-validator request. Times are unix seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct AddValidatorRequest {
    pub node_id: String,
    pub reward_address: String,
    pub stake_amount: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub delegation_fee_rate: f32,
}

/// Parameters of an add-delegator request. Times are unix seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddDelegatorRequest {
    pub node_id: String,
    pub reward_address: String,
    pub stake_amount: u64,
    pub start_time: u64,
    pub end_time: u64,
}

/// An entry of the platform chain's current validator set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub node_id: String,
    pub start_time: u64,
    pub end_time: u64,
    pub stake_amount: Option<u64>,
}

#[async_trait]
pub trait KeystoreApi: Send + Sync {
    async fn create_user(&self, user: &UserPass) -> Result<(), ApiClientError>;
}

/// Asset-transfer chain API.
#[async_trait]
pub trait XChainApi: Send + Sync {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError>;

    async fn get_balance(&self, address: &str, asset_id: &str) -> Result<u64, ApiClientError>;

    /// One page of UTXOs owned by `addresses`, starting after `start` when
    /// given.
    async fn get_utxos(
        &self,
        addresses: &[String],
        limit: u32,
        start: Option<&UtxoIndex>,
    ) -> Result<UtxoPage, ApiClientError>;

    async fn send(
        &self,
        user: &UserPass,
        amount: u64,
        asset_id: &str,
        to: &str,
    ) -> Result<Id, ApiClientError>;

    /// Exports AVAX to an address on the platform chain.
    async fn export_avax(&self, user: &UserPass, amount: u64, to: &str)
    -> Result<Id, ApiClientError>;

    /// Imports AVAX previously exported from `source_chain` into `to`.
    async fn import_avax(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<Id, ApiClientError>;

    async fn get_tx_status(&self, tx_id: &Id) -> Result<TxStatusReport, ApiClientError>;

    /// Submits a signed transaction without waiting for it to be accepted.
    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, ApiClientError>;

    async fn export_key(&self, user: &UserPass, address: &str) -> Result<String, ApiClientError>;

    async fn import_key(&self, user: &UserPass, private_key: &str)
    -> Result<String, ApiClientError>;

    async fn list_addresses(&self, user: &UserPass) -> Result<Vec<String>, ApiClientError>;
}

/// Platform chain API.
#[async_trait]
pub trait PChainApi: Send + Sync {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError>;

    async fn get_balance(&self, address: &str) -> Result<u64, ApiClientError>;

    async fn add_validator(
        &self,
        user: &UserPass,
        request: &AddValidatorRequest,
    ) -> Result<Id, ApiClientError>;

    async fn add_delegator(
        &self,
        user: &UserPass,
        request: &AddDelegatorRequest,
    ) -> Result<Id, ApiClientError>;

    async fn get_current_validators(&self) -> Result<Vec<ValidatorInfo>, ApiClientError>;

    async fn get_tx_status(&self, tx_id: &Id) -> Result<TxStatusReport, ApiClientError>;

    async fn import_avax(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<Id, ApiClientError>;

    async fn export_avax(&self, user: &UserPass, to: &str, amount: u64)
    -> Result<Id, ApiClientError>;
}

#[async_trait]
pub trait InfoApi: Send + Sync {
    async fn node_id(&self) -> Result<String, ApiClientError>;

    async fn network_id(&self) -> Result<u32, ApiClientError>;

    async fn blockchain_id(&self, alias: &str) -> Result<Id, ApiClientError>;
}

#[async_trait]
pub trait HealthApi: Send + Sync {
    async fn liveness(&self) -> Result<bool, ApiClientError>;
}

/// Every API a single node exposes.
pub trait NodeApi: Send + Sync {
    fn keystore(&self) -> &dyn KeystoreApi;

    fn x_chain(&self) -> &dyn XChainApi;

    fn p_chain(&self) -> &dyn PChainApi;

    fn info(&self) -> &dyn InfoApi;

    fn health(&self) -> &dyn HealthApi;
}

pub type SharedNodeApi = Arc<dyn NodeApi>;

#[async_trait]
impl TxStatusSource for dyn NodeApi {
    async fn tx_status(&self, chain: Chain, tx_id: &Id) -> Result<TxStatusReport, ApiClientError> {
        match chain {
            Chain::X => self.x_chain().get_tx_status(tx_id).await,
            Chain::P => self.p_chain().get_tx_status(tx_id).await,
        }
    }
}
