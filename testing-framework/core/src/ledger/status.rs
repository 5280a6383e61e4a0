use std::fmt;

use serde::{Deserialize, Serialize};

/// The two ledgers exposed by every node under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    /// Asset-transfer chain.
    X,
    /// Platform (staking) chain.
    P,
}

impl Chain {
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::P => "P",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Chain", self.alias())
    }
}

/// Raw status vocabulary reported by either chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Unknown,
    Processing,
    Accepted,
    Rejected,
    Committed,
    Aborted,
    Dropped,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOutcome {
    Accepted,
    Pending,
    Rejected,
}

impl TxStatus {
    /// Classifies the status using the vocabulary of `chain`. Statuses that do
    /// not belong to that chain's terminal vocabulary are treated as pending.
    #[must_use]
    pub const fn outcome(self, chain: Chain) -> StatusOutcome {
        match (chain, self) {
            (Chain::X, Self::Accepted) | (Chain::P, Self::Committed) => StatusOutcome::Accepted,
            (Chain::X, Self::Rejected) | (Chain::P, Self::Dropped | Self::Aborted) => {
                StatusOutcome::Rejected
            }
            _ => StatusOutcome::Pending,
        }
    }
}

/// Status of a transaction plus the ledger's explanation, when it gives one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatusReport {
    pub status: TxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<TxStatus> for TxStatusReport {
    fn from(status: TxStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }
}
