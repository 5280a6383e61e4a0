use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use testing_framework_config::{
    constants::{AVAX_ASSET_ID, DEFAULT_UTXO_PAGE_LIMIT, P_CHAIN_ALIAS, X_CHAIN_ALIAS},
    genesis::NetworkGenesisConfig,
    staking::StakingSchedule,
};
use testing_framework_core::{
    codec::Utxo,
    crypto::{KeyError, PrivateKey},
    ids::Id,
    ledger::{AcceptanceError, AcceptancePoller, Chain},
    nodes::{
        AddDelegatorRequest, AddValidatorRequest, ApiClientError, NodeApi, SharedNodeApi,
        UserPass, UtxoIndex,
    },
};
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::chain::ChainContext;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to create keystore user '{username}'")]
    CreateUser {
        username: String,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to create an address on the {chain}")]
    CreateAddress {
        chain: Chain,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to take control of the genesis account")]
    ImportGenesisKey {
        #[source]
        source: ApiClientError,
    },
    #[error("failed to list addresses of the keystore user")]
    ListAddresses {
        #[source]
        source: ApiClientError,
    },
    #[error("expected exactly one address for the genesis user, found {count}")]
    UnexpectedAddressCount { count: usize },
    #[error("failed to get the staker node id")]
    NodeId {
        #[source]
        source: ApiClientError,
    },
    #[error("failed to send {amount} to {to}")]
    Send {
        to: String,
        amount: u64,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to export {amount} from the {chain} to {to}")]
    Export {
        chain: Chain,
        to: String,
        amount: u64,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to import funds into {to} on the {chain}")]
    Import {
        chain: Chain,
        to: String,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to add validator {node_id}")]
    AddValidator {
        node_id: String,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to add delegator to {node_id}")]
    AddDelegator {
        node_id: String,
        #[source]
        source: ApiClientError,
    },
    #[error("failed to issue transaction {index} of {total}")]
    Issue {
        index: usize,
        total: usize,
        #[source]
        source: ApiClientError,
    },
    #[error("{step} did not complete")]
    Confirm {
        step: &'static str,
        #[source]
        source: AcceptanceError,
    },
    #[error("failed to retrieve {chain} balance of {address}")]
    Balance {
        chain: Chain,
        address: String,
        #[source]
        source: ApiClientError,
    },
    #[error("unexpected {chain} balance for {address}: expected {expected}, found {actual}")]
    BalanceMismatch {
        chain: Chain,
        address: String,
        expected: u64,
        actual: u64,
    },
    #[error("failed to fetch UTXOs")]
    Utxos {
        #[source]
        source: ApiClientError,
    },
    #[error("failed to export the key of {address}")]
    ExportKey {
        address: String,
        #[source]
        source: ApiClientError,
    },
    #[error("exported key of {address} is unusable")]
    Key {
        address: String,
        #[source]
        source: KeyError,
    },
    #[error("failed to read chain context from the node")]
    ChainContext {
        #[source]
        source: ApiClientError,
    },
}

impl WorkflowError {
    fn confirm(step: &'static str) -> impl FnOnce(AcceptanceError) -> Self {
        move |source| Self::Confirm { step, source }
    }
}

/// Addresses created for a fresh keystore user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultAddresses {
    pub x_chain: String,
    pub p_chain: String,
}

/// Both halves of a cross-chain transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossChainTransfer {
    pub export_tx: Id,
    pub import_tx: Id,
}

/// Standard multi-step workflows run against a single node with one set of
/// keystore credentials.
///
/// The runner holds no ledger state; every operation observes the node and
/// blocks on acceptance before any step that depends on it.
#[derive(Clone)]
pub struct WorkflowRunner {
    node: SharedNodeApi,
    user: UserPass,
    poller: AcceptancePoller,
    staking: StakingSchedule,
    genesis: Arc<NetworkGenesisConfig>,
}

impl WorkflowRunner {
    #[must_use]
    pub fn new(node: SharedNodeApi, user: UserPass, poller: AcceptancePoller) -> Self {
        Self {
            node,
            user,
            poller,
            staking: StakingSchedule::default(),
            genesis: Arc::new(NetworkGenesisConfig::local()),
        }
    }

    #[must_use]
    pub fn with_staking_schedule(mut self, staking: StakingSchedule) -> Self {
        self.staking = staking;
        self
    }

    #[must_use]
    pub fn with_genesis(mut self, genesis: NetworkGenesisConfig) -> Self {
        self.genesis = Arc::new(genesis);
        self
    }

    #[must_use]
    pub const fn user(&self) -> &UserPass {
        &self.user
    }

    #[must_use]
    pub fn node(&self) -> &dyn NodeApi {
        self.node.as_ref()
    }

    #[must_use]
    pub const fn poller(&self) -> &AcceptancePoller {
        &self.poller
    }

    async fn create_user(&self) -> Result<(), WorkflowError> {
        self.node
            .keystore()
            .create_user(&self.user)
            .await
            .map_err(|source| WorkflowError::CreateUser {
                username: self.user.username.clone(),
                source,
            })
    }

    /// Creates the keystore user and imports the genesis funded key into it,
    /// returning the asset chain address that now controls the genesis funds.
    pub async fn import_genesis_funds(&self) -> Result<String, WorkflowError> {
        self.create_user().await?;
        let address = self
            .node
            .x_chain()
            .import_key(&self.user, &self.genesis.funded_address.private_key)
            .await
            .map_err(|source| WorkflowError::ImportGenesisKey { source })?;
        debug!(%address, "imported genesis funds");
        Ok(address)
    }

    /// Imports the genesis funds, moves `seed_amount` to a new platform
    /// address, and registers this node as a validator staking
    /// `stake_amount`. Returns the platform address.
    pub async fn import_genesis_funds_and_start_validating(
        &self,
        seed_amount: u64,
        stake_amount: u64,
    ) -> Result<String, WorkflowError> {
        let node_id = self
            .node
            .info()
            .node_id()
            .await
            .map_err(|source| WorkflowError::NodeId { source })?;
        self.import_genesis_funds().await?;
        let p_address = self.create_address(Chain::P).await?;
        self.transfer_x_to_p(&p_address, seed_amount).await?;
        self.add_validator(&node_id, &p_address, stake_amount)
            .await?;
        Ok(p_address)
    }

    /// Creates the keystore user plus one address on each chain.
    pub async fn create_default_addresses(&self) -> Result<DefaultAddresses, WorkflowError> {
        self.create_user().await?;
        let x_chain = self.create_address(Chain::X).await?;
        let p_chain = self.create_address(Chain::P).await?;
        Ok(DefaultAddresses { x_chain, p_chain })
    }

    async fn create_address(&self, chain: Chain) -> Result<String, WorkflowError> {
        let created = match chain {
            Chain::X => self.node.x_chain().create_address(&self.user).await,
            Chain::P => self.node.p_chain().create_address(&self.user).await,
        };
        created.map_err(|source| WorkflowError::CreateAddress { chain, source })
    }

    /// The single address owned by the user after [`Self::import_genesis_funds`].
    pub async fn genesis_address(&self) -> Result<String, WorkflowError> {
        let mut addresses = self
            .node
            .x_chain()
            .list_addresses(&self.user)
            .await
            .map_err(|source| WorkflowError::ListAddresses { source })?;
        if addresses.len() != 1 {
            return Err(WorkflowError::UnexpectedAddressCount {
                count: addresses.len(),
            });
        }
        Ok(addresses.remove(0))
    }

    /// Sends AVAX without waiting for acceptance.
    pub async fn send_avax(&self, to: &str, amount: u64) -> Result<Id, WorkflowError> {
        self.node
            .x_chain()
            .send(&self.user, amount, AVAX_ASSET_ID, to)
            .await
            .map_err(|source| WorkflowError::Send {
                to: to.to_owned(),
                amount,
                source,
            })
    }

    /// Sends `amount` to each address in turn, waiting for every transfer to
    /// be accepted before starting the next.
    pub async fn fund_x_chain_addresses(
        &self,
        addresses: &[String],
        amount: u64,
    ) -> Result<Vec<Id>, WorkflowError> {
        let mut tx_ids = Vec::with_capacity(addresses.len());
        for address in addresses {
            let tx_id = self.send_avax(address, amount).await?;
            self.poller
                .await_accepted(self.node.as_ref(), Chain::X, tx_id)
                .await
                .map_err(WorkflowError::confirm("funding transfer"))?;
            debug!(%address, amount, %tx_id, "funded address");
            tx_ids.push(tx_id);
        }
        Ok(tx_ids)
    }

    /// Exports AVAX from the asset chain and imports it on the platform chain.
    /// The import is only submitted after the export has been accepted.
    pub async fn transfer_x_to_p(
        &self,
        p_address: &str,
        amount: u64,
    ) -> Result<CrossChainTransfer, WorkflowError> {
        let export_tx = self
            .node
            .x_chain()
            .export_avax(&self.user, amount, p_address)
            .await
            .map_err(|source| WorkflowError::Export {
                chain: Chain::X,
                to: p_address.to_owned(),
                amount,
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::X, export_tx)
            .await
            .map_err(WorkflowError::confirm("export"))?;

        let import_tx = self
            .node
            .p_chain()
            .import_avax(&self.user, p_address, X_CHAIN_ALIAS)
            .await
            .map_err(|source| WorkflowError::Import {
                chain: Chain::P,
                to: p_address.to_owned(),
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::P, import_tx)
            .await
            .map_err(WorkflowError::confirm("import"))?;

        info!(%p_address, amount, %export_tx, %import_tx, "transferred X-Chain funds to P-Chain");
        Ok(CrossChainTransfer {
            export_tx,
            import_tx,
        })
    }

    /// Exports AVAX from the platform chain and imports it on the asset chain.
    /// The import is only submitted after the export has been committed.
    pub async fn transfer_p_to_x(
        &self,
        x_address: &str,
        amount: u64,
    ) -> Result<CrossChainTransfer, WorkflowError> {
        let export_tx = self
            .node
            .p_chain()
            .export_avax(&self.user, x_address, amount)
            .await
            .map_err(|source| WorkflowError::Export {
                chain: Chain::P,
                to: x_address.to_owned(),
                amount,
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::P, export_tx)
            .await
            .map_err(WorkflowError::confirm("export"))?;

        let import_tx = self
            .node
            .x_chain()
            .import_avax(&self.user, x_address, P_CHAIN_ALIAS)
            .await
            .map_err(|source| WorkflowError::Import {
                chain: Chain::X,
                to: x_address.to_owned(),
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::X, import_tx)
            .await
            .map_err(WorkflowError::confirm("import"))?;

        info!(%x_address, amount, %export_tx, %import_tx, "transferred P-Chain funds to X-Chain");
        Ok(CrossChainTransfer {
            export_tx,
            import_tx,
        })
    }

    /// Registers `node_id` as a primary network validator, then blocks until
    /// its staking period has started.
    pub async fn add_validator(
        &self,
        node_id: &str,
        p_address: &str,
        stake_amount: u64,
    ) -> Result<Id, WorkflowError> {
        let window = StakingWindow::starting_in(
            self.staking.staking_delay,
            self.staking.staking_period,
        );
        let request = AddValidatorRequest {
            node_id: node_id.to_owned(),
            reward_address: p_address.to_owned(),
            stake_amount,
            start_time: window.start_time,
            end_time: window.end_time,
            delegation_fee_rate: self.staking.delegation_fee_rate,
        };
        let tx_id = self
            .node
            .p_chain()
            .add_validator(&self.user, &request)
            .await
            .map_err(|source| WorkflowError::AddValidator {
                node_id: node_id.to_owned(),
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::P, tx_id)
            .await
            .map_err(WorkflowError::confirm("add validator"))?;

        info!(node_id, %tx_id, start_time = window.start_time, "validator registered; waiting for staking period");
        window.wait_for_start(self.staking.synchrony_buffer).await;
        Ok(tx_id)
    }

    /// Delegates `stake_amount` to `delegatee_node_id`, then blocks until the
    /// delegation period has started.
    pub async fn add_delegator(
        &self,
        delegatee_node_id: &str,
        p_address: &str,
        stake_amount: u64,
    ) -> Result<Id, WorkflowError> {
        let window = StakingWindow::starting_in(
            self.staking.delegation_delay,
            self.staking.delegation_period,
        );
        let request = AddDelegatorRequest {
            node_id: delegatee_node_id.to_owned(),
            reward_address: p_address.to_owned(),
            stake_amount,
            start_time: window.start_time,
            end_time: window.end_time,
        };
        let tx_id = self
            .node
            .p_chain()
            .add_delegator(&self.user, &request)
            .await
            .map_err(|source| WorkflowError::AddDelegator {
                node_id: delegatee_node_id.to_owned(),
                source,
            })?;
        self.poller
            .await_accepted(self.node.as_ref(), Chain::P, tx_id)
            .await
            .map_err(WorkflowError::confirm("add delegator"))?;

        info!(delegatee_node_id, %tx_id, start_time = window.start_time, "delegation registered; waiting for delegation period");
        window.wait_for_start(self.staking.synchrony_buffer).await;
        Ok(tx_id)
    }

    /// Submits each transaction in order without waiting for acceptance and
    /// returns the IDs reported by the node.
    pub async fn issue_tx_list(&self, txs: &[Vec<u8>]) -> Result<Vec<Id>, WorkflowError> {
        let mut tx_ids = Vec::with_capacity(txs.len());
        for (index, tx) in txs.iter().enumerate() {
            let tx_id = self
                .node
                .x_chain()
                .issue_tx(tx)
                .await
                .map_err(|source| WorkflowError::Issue {
                    index,
                    total: txs.len(),
                    source,
                })?;
            tx_ids.push(tx_id);
        }
        Ok(tx_ids)
    }

    pub async fn await_x_chain_txs(&self, tx_ids: &[Id]) -> Result<(), WorkflowError> {
        self.poller
            .await_all(self.node.as_ref(), Chain::X, tx_ids)
            .await
            .map_err(WorkflowError::confirm("X-Chain transactions"))
    }

    pub async fn await_p_chain_txs(&self, tx_ids: &[Id]) -> Result<(), WorkflowError> {
        self.poller
            .await_all(self.node.as_ref(), Chain::P, tx_ids)
            .await
            .map_err(WorkflowError::confirm("P-Chain transactions"))
    }

    pub async fn verify_x_chain_balance(
        &self,
        address: &str,
        expected: u64,
    ) -> Result<(), WorkflowError> {
        let actual = self
            .node
            .x_chain()
            .get_balance(address, AVAX_ASSET_ID)
            .await
            .map_err(|source| WorkflowError::Balance {
                chain: Chain::X,
                address: address.to_owned(),
                source,
            })?;
        check_balance(Chain::X, address, expected, actual)
    }

    pub async fn verify_p_chain_balance(
        &self,
        address: &str,
        expected: u64,
    ) -> Result<(), WorkflowError> {
        let actual = self
            .node
            .p_chain()
            .get_balance(address)
            .await
            .map_err(|source| WorkflowError::Balance {
                chain: Chain::P,
                address: address.to_owned(),
                source,
            })?;
        check_balance(Chain::P, address, expected, actual)
    }

    /// Walks every page of UTXOs owned by `addresses`.
    pub async fn get_all_utxos(&self, addresses: &[String]) -> Result<Vec<Utxo>, WorkflowError> {
        let mut utxos = Vec::new();
        let mut cursor: Option<UtxoIndex> = None;
        loop {
            let page = self
                .node
                .x_chain()
                .get_utxos(addresses, DEFAULT_UTXO_PAGE_LIMIT, cursor.as_ref())
                .await
                .map_err(|source| WorkflowError::Utxos { source })?;
            let fetched = page.utxos.len();
            utxos.extend(page.utxos);
            if fetched < DEFAULT_UTXO_PAGE_LIMIT as usize {
                break;
            }
            cursor = Some(page.end_index);
        }
        debug!(addresses = addresses.len(), utxos = utxos.len(), "fetched utxos");
        Ok(utxos)
    }

    /// Exports and parses the private key controlling `address`.
    pub async fn export_private_key(&self, address: &str) -> Result<PrivateKey, WorkflowError> {
        let encoded = self
            .node
            .x_chain()
            .export_key(&self.user, address)
            .await
            .map_err(|source| WorkflowError::ExportKey {
                address: address.to_owned(),
                source,
            })?;
        encoded.parse().map_err(|source| WorkflowError::Key {
            address: address.to_owned(),
            source,
        })
    }

    pub async fn chain_context(&self) -> Result<ChainContext, WorkflowError> {
        ChainContext::fetch(self.node.as_ref())
            .await
            .map_err(|source| WorkflowError::ChainContext { source })
    }
}

fn check_balance(
    chain: Chain,
    address: &str,
    expected: u64,
    actual: u64,
) -> Result<(), WorkflowError> {
    if actual != expected {
        return Err(WorkflowError::BalanceMismatch {
            chain,
            address: address.to_owned(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// A staking window starting `delay` from now.
struct StakingWindow {
    start_time: u64,
    end_time: u64,
    starts_at: Instant,
}

impl StakingWindow {
    fn starting_in(delay: Duration, period: Duration) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let start = now + delay;
        Self {
            start_time: start.as_secs(),
            end_time: (start + period).as_secs(),
            starts_at: Instant::now() + delay,
        }
    }

    async fn wait_for_start(&self, synchrony_buffer: Duration) {
        sleep_until(self.starts_at + synchrony_buffer).await;
    }
}
