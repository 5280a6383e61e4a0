//! Identities baked into the genesis of a locally launched network.
//!
//! A local network cannot register new stakers without an existing staking
//! quorum, so the genesis ships five pre-registered validators together with a
//! single pre-funded address whose private key is public knowledge.

use serde::{Deserialize, Serialize};

/// A pre-funded address together with the key controlling it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedAddress {
    pub address: String,
    pub private_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerIdentity {
    pub node_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkGenesisConfig {
    pub stakers: Vec<StakerIdentity>,
    pub funded_address: FundedAddress,
}

const LOCAL_FUNDED_ADDRESS: &str = "X-local18jma8ppw3nhx5r4ap8clazz0dps7rv5u00z96u";
const LOCAL_FUNDED_PRIVATE_KEY: &str =
    "PrivateKey-ewoqjP7PxY4yr3iLTpLisriqt94hdyDFNgchSxGGztUrTXtNN";

const LOCAL_STAKER_NODE_IDS: [&str; 5] = [
    "NodeID-7Xhw2mDxuDS44j42TCB6U5579esbSt3Lg",
    "NodeID-MFrZFVCXPv5iCn6M9K6XduxGTYp891xXZ",
    "NodeID-NFBbbJ4qCmNaCzeW7sxErhvWqvEQMnYcN",
    "NodeID-GWPcbFJZFfZreETSoWjPimr846mXEKCtu",
    "NodeID-P7oB2McjBGgW2NXXWVYjV8JEDFoW9xDE5",
];

impl NetworkGenesisConfig {
    /// Genesis used by every locally launched network.
    #[must_use]
    pub fn local() -> Self {
        Self {
            stakers: LOCAL_STAKER_NODE_IDS
                .iter()
                .map(|id| StakerIdentity {
                    node_id: (*id).to_owned(),
                })
                .collect(),
            funded_address: FundedAddress {
                address: LOCAL_FUNDED_ADDRESS.to_owned(),
                private_key: LOCAL_FUNDED_PRIVATE_KEY.to_owned(),
            },
        }
    }

    #[must_use]
    pub fn staker_count(&self) -> usize {
        self.stakers.len()
    }
}

impl Default for NetworkGenesisConfig {
    fn default() -> Self {
        Self::local()
    }
}
