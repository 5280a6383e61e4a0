//! Shared state of the in-memory network: keystore users, both ledgers, and
//! the atomic memory between them.

use std::{
    collections::{BTreeMap, HashMap},
    time::{SystemTime, UNIX_EPOCH},
};

use testing_framework_config::genesis::NetworkGenesisConfig;
use testing_framework_core::{
    codec::{SignedTx, TransferOutput, Utxo},
    crypto::PrivateKey,
    ids::{Id, ShortId},
    ledger::{Chain, TxStatus, TxStatusReport},
    nodes::{AddDelegatorRequest, AddValidatorRequest, UserPass, UtxoIndex, UtxoPage, ValidatorInfo},
};

use crate::MockConfig;

const GENESIS_VALIDATOR_END: u64 = u64::MAX / 2;

/// Deterministic owner of an address string.
#[must_use]
pub fn owner_of(address: &str) -> ShortId {
    ShortId::from_slice(&Id::from_digest(address.as_bytes()).as_bytes()[..ShortId::LEN])
        .unwrap_or_default()
}

#[must_use]
pub fn avax_asset_id() -> Id {
    Id::from_digest(b"AVAX")
}

#[must_use]
pub fn x_chain_id() -> Id {
    Id::from_digest(b"mock-x-chain")
}

struct KeystoreUser {
    password: String,
    x_addresses: Vec<String>,
    p_addresses: Vec<String>,
}

struct AtomicTransfer {
    export_tx: Id,
    destination: Chain,
    to: String,
    amount: u64,
    exported: bool,
    imported: bool,
}

struct TxRecord {
    chain: Chain,
    polls_left: u32,
    final_status: TxStatus,
    reason: Option<String>,
}

pub(crate) struct LedgerState {
    config: MockConfig,
    next_seq: u64,
    users: HashMap<(usize, String), KeystoreUser>,
    keys: HashMap<ShortId, PrivateKey>,
    utxos: BTreeMap<(Id, u32), Utxo>,
    p_balances: HashMap<String, u64>,
    atomic: Vec<AtomicTransfer>,
    txs: HashMap<Id, TxRecord>,
    validators: Vec<ValidatorInfo>,
    pub(crate) validator_requests: Vec<AddValidatorRequest>,
    pub(crate) delegator_requests: Vec<AddDelegatorRequest>,
    reject_new: Option<String>,
}

pub(crate) type LedgerResult<T> = Result<T, String>;

impl LedgerState {
    pub(crate) fn new(config: MockConfig) -> LedgerResult<Self> {
        let genesis = NetworkGenesisConfig::local();
        let genesis_key: PrivateKey = genesis
            .funded_address
            .private_key
            .parse()
            .map_err(|err| format!("genesis key: {err}"))?;
        let genesis_owner = owner_of(&genesis.funded_address.address);
        let genesis_utxo = Utxo {
            tx_id: Id::from_digest(b"genesis"),
            output_index: 0,
            asset_id: avax_asset_id(),
            output: TransferOutput::single_owner(config.genesis_balance, genesis_owner),
        };

        let validators = genesis
            .stakers
            .iter()
            .map(|staker| ValidatorInfo {
                node_id: staker.node_id.clone(),
                start_time: 0,
                end_time: GENESIS_VALIDATOR_END,
                stake_amount: None,
            })
            .collect();

        Ok(Self {
            config,
            next_seq: 0,
            users: HashMap::new(),
            keys: HashMap::from([(genesis_owner, genesis_key)]),
            utxos: BTreeMap::from([((genesis_utxo.tx_id, 0), genesis_utxo)]),
            p_balances: HashMap::new(),
            atomic: Vec::new(),
            txs: HashMap::new(),
            validators,
            validator_requests: Vec::new(),
            delegator_requests: Vec::new(),
            reject_new: None,
        })
    }

    pub(crate) const fn config(&self) -> &MockConfig {
        &self.config
    }

    pub(crate) fn reject_new_txs(&mut self, reason: Option<String>) {
        self.reject_new = reason;
    }

    fn next(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn record_tx(&mut self, chain: Chain, tx_id: Id) {
        let (final_status, reason) = match (&self.reject_new, chain) {
            (Some(reason), Chain::X) => (TxStatus::Rejected, Some(reason.clone())),
            (Some(reason), Chain::P) => (TxStatus::Dropped, Some(reason.clone())),
            (None, Chain::X) => (TxStatus::Accepted, None),
            (None, Chain::P) => (TxStatus::Committed, None),
        };
        self.txs.insert(
            tx_id,
            TxRecord {
                chain,
                polls_left: self.config.processing_polls,
                final_status,
                reason,
            },
        );
    }

    fn new_tx(&mut self, chain: Chain) -> Id {
        let seq = self.next();
        let tx_id = Id::from_digest(format!("mock-tx-{seq}").as_bytes());
        self.record_tx(chain, tx_id);
        tx_id
    }

    fn user(&self, node: usize, user: &UserPass) -> LedgerResult<&KeystoreUser> {
        let entry = self
            .users
            .get(&(node, user.username.clone()))
            .ok_or_else(|| format!("user '{}' not found", user.username))?;
        if entry.password != user.password {
            return Err("incorrect password".to_owned());
        }
        Ok(entry)
    }

    fn user_mut(&mut self, node: usize, user: &UserPass) -> LedgerResult<&mut KeystoreUser> {
        self.user(node, user)?;
        self.users
            .get_mut(&(node, user.username.clone()))
            .ok_or_else(|| format!("user '{}' not found", user.username))
    }

    pub(crate) fn create_user(&mut self, node: usize, user: &UserPass) -> LedgerResult<()> {
        let key = (node, user.username.clone());
        if self.users.contains_key(&key) {
            return Err(format!("user '{}' already exists", user.username));
        }
        self.users.insert(
            key,
            KeystoreUser {
                password: user.password.clone(),
                x_addresses: Vec::new(),
                p_addresses: Vec::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn create_address(
        &mut self,
        node: usize,
        user: &UserPass,
        chain: Chain,
    ) -> LedgerResult<String> {
        self.user(node, user)?;
        let seq = self.next();
        let address = format!("{}-mock{seq}", chain.alias());
        let key = PrivateKey::from_bytes(Id::from_digest(format!("mock-key-{seq}").as_bytes()).as_bytes())
            .map_err(|err| err.to_string())?;
        self.keys.insert(owner_of(&address), key);
        let entry = self.user_mut(node, user)?;
        match chain {
            Chain::X => entry.x_addresses.push(address.clone()),
            Chain::P => entry.p_addresses.push(address.clone()),
        }
        Ok(address)
    }

    pub(crate) fn import_key(
        &mut self,
        node: usize,
        user: &UserPass,
        private_key: &str,
    ) -> LedgerResult<String> {
        let key: PrivateKey = private_key.parse().map_err(|err| format!("{err}"))?;
        let genesis = NetworkGenesisConfig::local();
        let address = if private_key == genesis.funded_address.private_key {
            genesis.funded_address.address
        } else {
            let seq = self.next();
            format!("X-imported{seq}")
        };
        self.keys.insert(owner_of(&address), key);
        let entry = self.user_mut(node, user)?;
        if !entry.x_addresses.contains(&address) {
            entry.x_addresses.push(address.clone());
        }
        Ok(address)
    }

    pub(crate) fn export_key(
        &self,
        node: usize,
        user: &UserPass,
        address: &str,
    ) -> LedgerResult<String> {
        let entry = self.user(node, user)?;
        if !entry.x_addresses.iter().any(|a| a == address) {
            return Err(format!("user does not control {address}"));
        }
        self.keys
            .get(&owner_of(address))
            .map(ToString::to_string)
            .ok_or_else(|| format!("no key for {address}"))
    }

    pub(crate) fn list_addresses(&self, node: usize, user: &UserPass) -> LedgerResult<Vec<String>> {
        Ok(self.user(node, user)?.x_addresses.clone())
    }

    pub(crate) fn x_balance(&self, address: &str) -> u64 {
        let owner = owner_of(address);
        self.utxos
            .values()
            .filter(|utxo| utxo.output.addresses.contains(&owner))
            .map(Utxo::amount)
            .sum()
    }

    pub(crate) fn p_balance(&self, address: &str) -> u64 {
        self.p_balances.get(address).copied().unwrap_or_default()
    }

    pub(crate) fn get_utxos(
        &self,
        addresses: &[String],
        limit: u32,
        start: Option<&UtxoIndex>,
    ) -> LedgerResult<UtxoPage> {
        let owners: Vec<ShortId> = addresses.iter().map(|a| owner_of(a)).collect();
        let after = start
            .filter(|index| !index.utxo.is_empty())
            .map(|index| parse_utxo_key(&index.utxo))
            .transpose()?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let utxos: Vec<Utxo> = self
            .utxos
            .iter()
            .filter(|(key, _)| after.is_none_or(|after| **key > after))
            .filter(|(_, utxo)| utxo.output.addresses.iter().any(|a| owners.contains(a)))
            .take(limit)
            .map(|(_, utxo)| utxo.clone())
            .collect();

        let end_index = match utxos.last() {
            Some(last) => UtxoIndex {
                address: addresses
                    .iter()
                    .find(|a| last.output.addresses.contains(&owner_of(a)))
                    .cloned()
                    .unwrap_or_default(),
                utxo: format!("{}:{}", last.tx_id, last.output_index),
            },
            None => start.cloned().unwrap_or_default(),
        };
        Ok(UtxoPage { utxos, end_index })
    }

    /// Consumes enough of the user's asset chain outputs to cover `needed`,
    /// returning the change to the user's first address.
    fn spend_x(&mut self, node: usize, user: &UserPass, needed: u64) -> LedgerResult<()> {
        let addresses = self.user(node, user)?.x_addresses.clone();
        let change_address = addresses
            .first()
            .cloned()
            .ok_or_else(|| "user controls no addresses".to_owned())?;
        let owners: Vec<ShortId> = addresses.iter().map(|a| owner_of(a)).collect();

        let mut selected = Vec::new();
        let mut total = 0u64;
        for (key, utxo) in &self.utxos {
            if total >= needed {
                break;
            }
            if utxo.output.addresses.iter().any(|a| owners.contains(a)) {
                total = total.saturating_add(utxo.amount());
                selected.push(*key);
            }
        }
        if total < needed {
            return Err(format!("insufficient funds: have {total}, need {needed}"));
        }
        for key in selected {
            self.utxos.remove(&key);
        }
        if total > needed {
            let change_tx = self.next();
            self.add_utxo(
                Id::from_digest(format!("mock-change-{change_tx}").as_bytes()),
                0,
                total - needed,
                &change_address,
            );
        }
        Ok(())
    }

    fn add_utxo(&mut self, tx_id: Id, output_index: u32, amount: u64, address: &str) {
        let utxo = Utxo {
            tx_id,
            output_index,
            asset_id: avax_asset_id(),
            output: TransferOutput::single_owner(amount, owner_of(address)),
        };
        self.utxos.insert((tx_id, output_index), utxo);
    }

    fn spend_p(&mut self, node: usize, user: &UserPass, needed: u64) -> LedgerResult<()> {
        let addresses = self.user(node, user)?.p_addresses.clone();
        let total: u64 = addresses.iter().map(|a| self.p_balance(a)).sum();
        if total < needed {
            return Err(format!("insufficient P-Chain funds: have {total}, need {needed}"));
        }
        let mut remaining = needed;
        for address in addresses {
            let balance = self.p_balances.entry(address).or_default();
            let taken = remaining.min(*balance);
            *balance -= taken;
            remaining -= taken;
        }
        Ok(())
    }

    fn fee_plus(&self, amount: u64) -> LedgerResult<u64> {
        amount
            .checked_add(self.config.tx_fee)
            .ok_or_else(|| "amount overflows".to_owned())
    }

    pub(crate) fn send(
        &mut self,
        node: usize,
        user: &UserPass,
        amount: u64,
        asset_id: &str,
        to: &str,
    ) -> LedgerResult<Id> {
        if asset_id != "AVAX" {
            return Err(format!("unknown asset {asset_id}"));
        }
        let needed = self.fee_plus(amount)?;
        self.spend_x(node, user, needed)?;
        let tx_id = self.new_tx(Chain::X);
        self.add_utxo(tx_id, 0, amount, to);
        Ok(tx_id)
    }

    pub(crate) fn export_x(
        &mut self,
        node: usize,
        user: &UserPass,
        amount: u64,
        to: &str,
    ) -> LedgerResult<Id> {
        let needed = self.fee_plus(amount)?;
        self.spend_x(node, user, needed)?;
        let tx_id = self.new_tx(Chain::X);
        self.push_atomic(tx_id, Chain::P, to, amount);
        Ok(tx_id)
    }

    pub(crate) fn export_p(
        &mut self,
        node: usize,
        user: &UserPass,
        to: &str,
        amount: u64,
    ) -> LedgerResult<Id> {
        let needed = self.fee_plus(amount)?;
        self.spend_p(node, user, needed)?;
        let tx_id = self.new_tx(Chain::P);
        self.push_atomic(tx_id, Chain::X, to, amount);
        Ok(tx_id)
    }

    fn push_atomic(&mut self, export_tx: Id, destination: Chain, to: &str, amount: u64) {
        self.atomic.push(AtomicTransfer {
            export_tx,
            destination,
            to: to.to_owned(),
            amount,
            exported: false,
            imported: false,
        });
    }

    /// Imports every accepted export addressed to `to` on `destination`.
    pub(crate) fn import(
        &mut self,
        node: usize,
        user: &UserPass,
        destination: Chain,
        to: &str,
        source_chain: &str,
    ) -> LedgerResult<Id> {
        self.user(node, user)?;
        let expected_source = match destination {
            Chain::X => "P",
            Chain::P => "X",
        };
        if source_chain != expected_source {
            return Err(format!("cannot import from chain '{source_chain}'"));
        }
        let mut total = 0u64;
        for transfer in self.atomic.iter_mut().filter(|t| {
            t.destination == destination && t.to == to && t.exported && !t.imported
        }) {
            transfer.imported = true;
            total = total.saturating_add(transfer.amount);
        }
        if total == 0 {
            return Err("no importable funds".to_owned());
        }
        let received = total
            .checked_sub(self.config.tx_fee)
            .ok_or_else(|| "imported funds do not cover the fee".to_owned())?;
        let tx_id = self.new_tx(destination);
        match destination {
            Chain::X => self.add_utxo(tx_id, 0, received, to),
            Chain::P => *self.p_balances.entry(to.to_owned()).or_default() += received,
        }
        Ok(tx_id)
    }

    pub(crate) fn add_validator(
        &mut self,
        node: usize,
        user: &UserPass,
        request: &AddValidatorRequest,
    ) -> LedgerResult<Id> {
        check_window(request.start_time, request.end_time)?;
        if self.validators.iter().any(|v| v.node_id == request.node_id) {
            return Err(format!("{} is already a validator", request.node_id));
        }
        self.spend_p(node, user, request.stake_amount)?;
        self.validators.push(ValidatorInfo {
            node_id: request.node_id.clone(),
            start_time: request.start_time,
            end_time: request.end_time,
            stake_amount: Some(request.stake_amount),
        });
        self.validator_requests.push(request.clone());
        Ok(self.new_tx(Chain::P))
    }

    pub(crate) fn add_delegator(
        &mut self,
        node: usize,
        user: &UserPass,
        request: &AddDelegatorRequest,
    ) -> LedgerResult<Id> {
        check_window(request.start_time, request.end_time)?;
        if !self.validators.iter().any(|v| v.node_id == request.node_id) {
            return Err(format!("{} is not a validator", request.node_id));
        }
        self.spend_p(node, user, request.stake_amount)?;
        self.delegator_requests.push(request.clone());
        Ok(self.new_tx(Chain::P))
    }

    pub(crate) fn validators(&self) -> Vec<ValidatorInfo> {
        self.validators.clone()
    }

    /// Applies a signed transfer, rejecting it unless every input is unspent,
    /// correctly signed, and the fee is covered.
    pub(crate) fn issue(&mut self, bytes: &[u8]) -> LedgerResult<Id> {
        let tx = SignedTx::decode(bytes).map_err(|err| format!("couldn't parse tx: {err}"))?;
        let unsigned = tx.unsigned();
        if unsigned.network_id != self.config.network_id {
            return Err(format!("wrong network id {}", unsigned.network_id));
        }
        if unsigned.blockchain_id != x_chain_id() {
            return Err("wrong blockchain id".to_owned());
        }
        if self.txs.contains_key(&tx.id()) {
            return Err(format!("tx {} already issued", tx.id()));
        }
        if tx.credentials().len() != unsigned.inputs.len() {
            return Err("credential count does not match inputs".to_owned());
        }

        let payload = unsigned.unsigned_bytes();
        let mut consumed = 0u64;
        for (input, credential) in unsigned.inputs.iter().zip(tx.credentials()) {
            let utxo = self
                .utxos
                .get(&(input.tx_id, input.output_index))
                .ok_or_else(|| format!("missing utxo {}:{}", input.tx_id, input.output_index))?;
            if utxo.amount() != input.amount || utxo.asset_id != input.asset_id {
                return Err("input does not match the utxo it spends".to_owned());
            }
            let signer = input
                .sig_indices
                .first()
                .and_then(|i| utxo.output.addresses.get(usize::try_from(*i).ok()?))
                .and_then(|owner| self.keys.get(owner))
                .ok_or_else(|| "unknown input owner".to_owned())?;
            let signature = credential
                .signatures
                .first()
                .ok_or_else(|| "missing signature".to_owned())?;
            let recovered =
                PrivateKey::recover(&payload, signature).map_err(|err| err.to_string())?;
            if recovered != signer.public_key() {
                return Err("invalid signature".to_owned());
            }
            consumed = consumed.saturating_add(input.amount);
        }
        let produced: u64 = unsigned.outputs.iter().map(|o| o.output.amount).sum();
        if consumed < produced.saturating_add(self.config.tx_fee) {
            return Err(format!("insufficient fee: consumed {consumed}, produced {produced}"));
        }

        for input in &unsigned.inputs {
            self.utxos.remove(&(input.tx_id, input.output_index));
        }
        for (index, output) in unsigned.outputs.iter().enumerate() {
            let output_index = u32::try_from(index).map_err(|err| err.to_string())?;
            self.utxos.insert(
                (tx.id(), output_index),
                Utxo {
                    tx_id: tx.id(),
                    output_index,
                    asset_id: output.asset_id,
                    output: output.output.clone(),
                },
            );
        }
        self.record_tx(Chain::X, tx.id());
        Ok(tx.id())
    }

    /// Reports the status of `tx_id`, advancing it one poll closer to its
    /// final state.
    pub(crate) fn poll_status(&mut self, chain: Chain, tx_id: &Id) -> TxStatusReport {
        let Some(record) = self.txs.get_mut(tx_id).filter(|r| r.chain == chain) else {
            return TxStatus::Unknown.into();
        };
        if record.polls_left > 0 {
            record.polls_left -= 1;
            return TxStatus::Processing.into();
        }
        let report = TxStatusReport {
            status: record.final_status,
            reason: record.reason.clone(),
        };
        if matches!(report.status, TxStatus::Accepted | TxStatus::Committed) {
            for transfer in self.atomic.iter_mut().filter(|t| t.export_tx == *tx_id) {
                transfer.exported = true;
            }
        }
        report
    }

    pub(crate) fn peek_status(&self, tx_id: &Id) -> Option<TxStatus> {
        self.txs.get(tx_id).map(|record| {
            if record.polls_left > 0 {
                TxStatus::Processing
            } else {
                record.final_status
            }
        })
    }
}

fn parse_utxo_key(value: &str) -> LedgerResult<(Id, u32)> {
    let (tx_id, index) = value
        .split_once(':')
        .ok_or_else(|| format!("malformed utxo index '{value}'"))?;
    let tx_id = tx_id.parse::<Id>().map_err(|err| err.to_string())?;
    let index = index.parse::<u32>().map_err(|err| err.to_string())?;
    Ok((tx_id, index))
}

fn check_window(start_time: u64, end_time: u64) -> LedgerResult<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    if start_time <= now {
        return Err(format!("start time {start_time} is not in the future"));
    }
    if end_time <= start_time {
        return Err("end time must follow start time".to_owned());
    }
    Ok(())
}
