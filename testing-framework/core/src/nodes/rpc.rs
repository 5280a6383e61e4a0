use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use testing_framework_config::constants::{P_CHAIN_ALIAS, X_CHAIN_ALIAS};

use super::{
    ApiClient, ApiClientError,
    api_client::{HEALTH_ENDPOINT, INFO_ENDPOINT, KEYSTORE_ENDPOINT, chain_endpoint},
    apis::{
        AddDelegatorRequest, AddValidatorRequest, HealthApi, InfoApi, KeystoreApi, NodeApi,
        PChainApi, UserPass, UtxoIndex, UtxoPage, ValidatorInfo, XChainApi,
    },
};
use crate::{
    codec::{
        Utxo,
        formatting::{hex_decode, hex_encode},
    },
    ids::Id,
    ledger::TxStatusReport,
};

const HEX_ENCODING: &str = "hex";

/// Numbers the node encodes as decimal strings.
mod json_u64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(value),
            Raw::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

#[derive(Serialize)]
struct UserParams<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a UserPass> for UserParams<'a> {
    fn from(user: &'a UserPass) -> Self {
        Self {
            username: &user.username,
            password: &user.password,
        }
    }
}

#[derive(Serialize)]
struct WithUser<'a, T> {
    #[serde(flatten)]
    user: UserParams<'a>,
    #[serde(flatten)]
    params: T,
}

fn with_user<'a, T>(user: &'a UserPass, params: T) -> WithUser<'a, T> {
    WithUser {
        user: user.into(),
        params,
    }
}

#[derive(Deserialize)]
struct AddressReply {
    address: String,
}

#[derive(Deserialize)]
struct AddressesReply {
    addresses: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxIdReply {
    #[serde(rename = "txID")]
    tx_id: Id,
}

#[derive(Deserialize)]
struct BalanceReply {
    #[serde(with = "json_u64")]
    balance: u64,
}

#[derive(Deserialize)]
struct SuccessReply {
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateKeyReply {
    private_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUtxosParams<'a> {
    addresses: &'a [String],
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_index: Option<&'a UtxoIndex>,
    encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUtxosReply {
    utxos: Vec<String>,
    #[serde(default)]
    end_index: UtxoIndex,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddValidatorParams<'a> {
    #[serde(rename = "nodeID")]
    node_id: &'a str,
    #[serde(with = "json_u64")]
    start_time: u64,
    #[serde(with = "json_u64")]
    end_time: u64,
    #[serde(with = "json_u64")]
    stake_amount: u64,
    reward_address: &'a str,
    delegation_fee_rate: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddDelegatorParams<'a> {
    #[serde(rename = "nodeID")]
    node_id: &'a str,
    #[serde(with = "json_u64")]
    start_time: u64,
    #[serde(with = "json_u64")]
    end_time: u64,
    #[serde(with = "json_u64")]
    stake_amount: u64,
    reward_address: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatorEntry {
    #[serde(rename = "nodeID")]
    node_id: String,
    #[serde(with = "json_u64")]
    start_time: u64,
    #[serde(with = "json_u64")]
    end_time: u64,
    #[serde(default)]
    stake_amount: Option<String>,
}

#[derive(Deserialize)]
struct ValidatorsReply {
    validators: Vec<ValidatorEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeIdReply {
    #[serde(rename = "nodeID")]
    node_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkIdReply {
    #[serde(rename = "networkID", with = "json_u64")]
    network_id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockchainIdReply {
    #[serde(rename = "blockchainID")]
    blockchain_id: Id,
}

#[derive(Deserialize)]
struct HealthReply {
    healthy: bool,
}

fn x_endpoint() -> String {
    chain_endpoint(X_CHAIN_ALIAS)
}

fn p_endpoint() -> String {
    chain_endpoint(P_CHAIN_ALIAS)
}

/// The node expects the fee rate as a percentage with four decimals.
fn format_fee_rate(rate: f32) -> String {
    format!("{rate:.4}")
}

impl NodeApi for ApiClient {
    fn keystore(&self) -> &dyn KeystoreApi {
        self
    }

    fn x_chain(&self) -> &dyn XChainApi {
        self
    }

    fn p_chain(&self) -> &dyn PChainApi {
        self
    }

    fn info(&self) -> &dyn InfoApi {
        self
    }

    fn health(&self) -> &dyn HealthApi {
        self
    }
}

#[async_trait]
impl KeystoreApi for ApiClient {
    async fn create_user(&self, user: &UserPass) -> Result<(), ApiClientError> {
        const METHOD: &str = "keystore.createUser";
        let reply: SuccessReply = self
            .call(KEYSTORE_ENDPOINT, METHOD, UserParams::from(user))
            .await?;
        if !reply.success {
            return Err(ApiClientError::malformed(METHOD, "user creation not acknowledged"));
        }
        Ok(())
    }
}

#[async_trait]
impl XChainApi for ApiClient {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        let reply: AddressReply = self
            .call(&x_endpoint(), "avm.createAddress", UserParams::from(user))
            .await?;
        Ok(reply.address)
    }

    async fn get_balance(&self, address: &str, asset_id: &str) -> Result<u64, ApiClientError> {
        let reply: BalanceReply = self
            .call(
                &x_endpoint(),
                "avm.getBalance",
                json!({ "address": address, "assetID": asset_id }),
            )
            .await?;
        Ok(reply.balance)
    }

    async fn get_utxos(
        &self,
        addresses: &[String],
        limit: u32,
        start: Option<&UtxoIndex>,
    ) -> Result<UtxoPage, ApiClientError> {
        let reply: GetUtxosReply = self
            .call(
                &x_endpoint(),
                "avm.getUTXOs",
                GetUtxosParams {
                    addresses,
                    limit,
                    start_index: start,
                    encoding: HEX_ENCODING,
                },
            )
            .await?;
        let utxos = reply
            .utxos
            .iter()
            .map(|encoded| Ok(Utxo::decode(&hex_decode(encoded)?)?))
            .collect::<Result<Vec<_>, ApiClientError>>()?;
        Ok(UtxoPage {
            utxos,
            end_index: reply.end_index,
        })
    }

    async fn send(
        &self,
        user: &UserPass,
        amount: u64,
        asset_id: &str,
        to: &str,
    ) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &x_endpoint(),
                "avm.send",
                with_user(
                    user,
                    json!({ "amount": amount, "assetID": asset_id, "to": to }),
                ),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn export_avax(
        &self,
        user: &UserPass,
        amount: u64,
        to: &str,
    ) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &x_endpoint(),
                "avm.exportAVAX",
                with_user(user, json!({ "amount": amount, "to": to })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn import_avax(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &x_endpoint(),
                "avm.importAVAX",
                with_user(user, json!({ "to": to, "sourceChain": source_chain })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn get_tx_status(&self, tx_id: &Id) -> Result<TxStatusReport, ApiClientError> {
        self.call(
            &x_endpoint(),
            "avm.getTxStatus",
            json!({ "txID": tx_id }),
        )
        .await
    }

    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &x_endpoint(),
                "avm.issueTx",
                json!({ "tx": hex_encode(tx), "encoding": HEX_ENCODING }),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn export_key(&self, user: &UserPass, address: &str) -> Result<String, ApiClientError> {
        let reply: PrivateKeyReply = self
            .call(
                &x_endpoint(),
                "avm.exportKey",
                with_user(user, json!({ "address": address })),
            )
            .await?;
        Ok(reply.private_key)
    }

    async fn import_key(
        &self,
        user: &UserPass,
        private_key: &str,
    ) -> Result<String, ApiClientError> {
        let reply: AddressReply = self
            .call(
                &x_endpoint(),
                "avm.importKey",
                with_user(user, json!({ "privateKey": private_key })),
            )
            .await?;
        Ok(reply.address)
    }

    async fn list_addresses(&self, user: &UserPass) -> Result<Vec<String>, ApiClientError> {
        let reply: AddressesReply = self
            .call(&x_endpoint(), "avm.listAddresses", UserParams::from(user))
            .await?;
        Ok(reply.addresses)
    }
}

#[async_trait]
impl PChainApi for ApiClient {
    async fn create_address(&self, user: &UserPass) -> Result<String, ApiClientError> {
        let reply: AddressReply = self
            .call(&p_endpoint(), "platform.createAddress", UserParams::from(user))
            .await?;
        Ok(reply.address)
    }

    async fn get_balance(&self, address: &str) -> Result<u64, ApiClientError> {
        let reply: BalanceReply = self
            .call(
                &p_endpoint(),
                "platform.getBalance",
                json!({ "address": address }),
            )
            .await?;
        Ok(reply.balance)
    }

    async fn add_validator(
        &self,
        user: &UserPass,
        request: &AddValidatorRequest,
    ) -> Result<Id, ApiClientError> {
        let params = AddValidatorParams {
            node_id: &request.node_id,
            start_time: request.start_time,
            end_time: request.end_time,
            stake_amount: request.stake_amount,
            reward_address: &request.reward_address,
            delegation_fee_rate: format_fee_rate(request.delegation_fee_rate),
        };
        let reply: TxIdReply = self
            .call(&p_endpoint(), "platform.addValidator", with_user(user, params))
            .await?;
        Ok(reply.tx_id)
    }

    async fn add_delegator(
        &self,
        user: &UserPass,
        request: &AddDelegatorRequest,
    ) -> Result<Id, ApiClientError> {
        let params = AddDelegatorParams {
            node_id: &request.node_id,
            start_time: request.start_time,
            end_time: request.end_time,
            stake_amount: request.stake_amount,
            reward_address: &request.reward_address,
        };
        let reply: TxIdReply = self
            .call(&p_endpoint(), "platform.addDelegator", with_user(user, params))
            .await?;
        Ok(reply.tx_id)
    }

    async fn get_current_validators(&self) -> Result<Vec<ValidatorInfo>, ApiClientError> {
        const METHOD: &str = "platform.getCurrentValidators";
        let reply: ValidatorsReply = self.call(&p_endpoint(), METHOD, json!({})).await?;
        reply
            .validators
            .into_iter()
            .map(|entry| {
                let stake_amount = entry
                    .stake_amount
                    .map(|raw| {
                        raw.parse::<u64>().map_err(|err| {
                            ApiClientError::malformed(METHOD, format!("stake amount '{raw}': {err}"))
                        })
                    })
                    .transpose()?;
                Ok(ValidatorInfo {
                    node_id: entry.node_id,
                    start_time: entry.start_time,
                    end_time: entry.end_time,
                    stake_amount,
                })
            })
            .collect()
    }

    async fn get_tx_status(&self, tx_id: &Id) -> Result<TxStatusReport, ApiClientError> {
        self.call(
            &p_endpoint(),
            "platform.getTxStatus",
            json!({ "txID": tx_id, "includeReason": true }),
        )
        .await
    }

    async fn import_avax(
        &self,
        user: &UserPass,
        to: &str,
        source_chain: &str,
    ) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &p_endpoint(),
                "platform.importAVAX",
                with_user(user, json!({ "to": to, "sourceChain": source_chain })),
            )
            .await?;
        Ok(reply.tx_id)
    }

    async fn export_avax(
        &self,
        user: &UserPass,
        to: &str,
        amount: u64,
    ) -> Result<Id, ApiClientError> {
        let reply: TxIdReply = self
            .call(
                &p_endpoint(),
                "platform.exportAVAX",
                with_user(user, json!({ "to": to, "amount": amount })),
            )
            .await?;
        Ok(reply.tx_id)
    }
}

#[async_trait]
impl InfoApi for ApiClient {
    async fn node_id(&self) -> Result<String, ApiClientError> {
        let reply: NodeIdReply = self.call(INFO_ENDPOINT, "info.getNodeID", json!({})).await?;
        Ok(reply.node_id)
    }

    async fn network_id(&self) -> Result<u32, ApiClientError> {
        const METHOD: &str = "info.getNetworkID";
        let reply: NetworkIdReply = self.call(INFO_ENDPOINT, METHOD, json!({})).await?;
        u32::try_from(reply.network_id).map_err(|_| {
            ApiClientError::malformed(METHOD, format!("network id {} out of range", reply.network_id))
        })
    }

    async fn blockchain_id(&self, alias: &str) -> Result<Id, ApiClientError> {
        let reply: BlockchainIdReply = self
            .call(
                INFO_ENDPOINT,
                "info.getBlockchainID",
                json!({ "alias": alias }),
            )
            .await?;
        Ok(reply.blockchain_id)
    }
}

#[async_trait]
impl HealthApi for ApiClient {
    async fn liveness(&self) -> Result<bool, ApiClientError> {
        let reply: HealthReply = self
            .call(HEALTH_ENDPOINT, "health.getLiveness", json!({}))
            .await?;
        Ok(reply.healthy)
    }
}
