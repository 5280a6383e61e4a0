use std::time::Duration;

use async_trait::async_trait;
use testing_framework_config::timeouts;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use super::status::{Chain, StatusOutcome, TxStatus, TxStatusReport};
use crate::{ids::Id, nodes::ApiClientError};

/// Anything able to report the ledger status of a transaction.
#[async_trait]
pub trait TxStatusSource: Send + Sync {
    async fn tx_status(&self, chain: Chain, tx_id: &Id) -> Result<TxStatusReport, ApiClientError>;
}

#[derive(Debug, Error)]
pub enum AcceptanceError {
    #[error("transaction {tx_id} was {status} on the {chain}{}", reason_suffix(.reason))]
    Rejected {
        chain: Chain,
        tx_id: Id,
        status: TxStatus,
        reason: Option<String>,
    },
    #[error(
        "timed out after {timeout:?} waiting for transaction {tx_id} to be accepted on the {chain} (last status: {})",
        last_status.map_or_else(|| "none".to_owned(), |s| s.to_string())
    )]
    TimedOut {
        chain: Chain,
        tx_id: Id,
        timeout: Duration,
        last_status: Option<TxStatus>,
    },
    #[error("failed to get status of transaction {tx_id} on the {chain}")]
    StatusQuery {
        chain: Chain,
        tx_id: Id,
        #[source]
        source: ApiClientError,
    },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

impl AcceptanceError {
    #[must_use]
    pub const fn tx_id(&self) -> Id {
        match self {
            Self::Rejected { tx_id, .. }
            | Self::TimedOut { tx_id, .. }
            | Self::StatusQuery { tx_id, .. } => *tx_id,
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Polls a status source until a transaction reaches a terminal state or the
/// acceptance timeout elapses.
///
/// A single poller never overlaps its own queries; concurrent callers must run
/// independent polls from their own tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptancePoller {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for AcceptancePoller {
    fn default() -> Self {
        Self::new(timeouts::acceptance_timeout()).with_poll_interval(timeouts::poll_interval())
    }
}

impl AcceptancePoller {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Blocks until `tx_id` is accepted on `chain`.
    pub async fn await_accepted<S>(
        &self,
        source: &S,
        chain: Chain,
        tx_id: Id,
    ) -> Result<(), AcceptanceError>
    where
        S: TxStatusSource + ?Sized,
    {
        let mut last_status = None;
        let polled = timeout(
            self.timeout,
            self.poll(source, chain, tx_id, &mut last_status),
        )
        .await;

        polled.unwrap_or(Err(AcceptanceError::TimedOut {
            chain,
            tx_id,
            timeout: self.timeout,
            last_status,
        }))
    }

    /// Awaits every transaction in order, stopping at the first failure.
    pub async fn await_all<S>(
        &self,
        source: &S,
        chain: Chain,
        tx_ids: &[Id],
    ) -> Result<(), AcceptanceError>
    where
        S: TxStatusSource + ?Sized,
    {
        for tx_id in tx_ids {
            self.await_accepted(source, chain, *tx_id).await?;
        }
        Ok(())
    }

    async fn poll<S>(
        &self,
        source: &S,
        chain: Chain,
        tx_id: Id,
        last_status: &mut Option<TxStatus>,
    ) -> Result<(), AcceptanceError>
    where
        S: TxStatusSource + ?Sized,
    {
        loop {
            let report = source
                .tx_status(chain, &tx_id)
                .await
                .map_err(|source| AcceptanceError::StatusQuery {
                    chain,
                    tx_id,
                    source,
                })?;
            trace!(%chain, %tx_id, status = %report.status, "transaction status");
            *last_status = Some(report.status);

            match report.status.outcome(chain) {
                StatusOutcome::Accepted => {
                    debug!(%chain, %tx_id, status = %report.status, "transaction accepted");
                    return Ok(());
                }
                StatusOutcome::Rejected => {
                    return Err(AcceptanceError::Rejected {
                        chain,
                        tx_id,
                        status: report.status,
                        reason: report.reason,
                    });
                }
                StatusOutcome::Pending => sleep(self.poll_interval).await,
            }
        }
    }
}
