mod api_client;
pub mod apis;
mod rpc;

pub use api_client::{ApiClient, ApiClientError, chain_endpoint};
pub use apis::{
    AddDelegatorRequest, AddValidatorRequest, HealthApi, InfoApi, KeystoreApi, NodeApi,
    PChainApi, SharedNodeApi, UserPass, UtxoIndex, UtxoPage, ValidatorInfo, XChainApi,
};
