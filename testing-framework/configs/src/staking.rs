use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_STAKING_DELAY: Duration = Duration::from_secs(20);
pub const DEFAULT_STAKING_PERIOD: Duration = Duration::from_secs(72 * 60 * 60);
/// Time until a delegation period begins.
pub const DEFAULT_DELEGATION_DELAY: Duration = Duration::from_secs(20);
pub const DEFAULT_DELEGATION_PERIOD: Duration = Duration::from_secs(36 * 60 * 60);
pub const STAKING_PERIOD_SYNCHRONY_DELAY: Duration = Duration::from_secs(3);
/// Delegation fee rate in percent.
pub const DEFAULT_DELEGATION_FEE_RATE: f32 = 2.0;

/// Wall-clock windows used when registering validators and delegators.
///
/// Staking is gated by start/end timestamps independently of transaction
/// acceptance, so workflows sleep until `delay + synchrony_buffer` has elapsed
/// before handing control back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingSchedule {
    #[serde(with = "secs")]
    pub staking_delay: Duration,
    #[serde(with = "secs")]
    pub staking_period: Duration,
    #[serde(with = "secs")]
    pub delegation_delay: Duration,
    #[serde(with = "secs")]
    pub delegation_period: Duration,
    #[serde(with = "secs")]
    pub synchrony_buffer: Duration,
    pub delegation_fee_rate: f32,
}

impl Default for StakingSchedule {
    fn default() -> Self {
        Self {
            staking_delay: DEFAULT_STAKING_DELAY,
            staking_period: DEFAULT_STAKING_PERIOD,
            delegation_delay: DEFAULT_DELEGATION_DELAY,
            delegation_period: DEFAULT_DELEGATION_PERIOD,
            synchrony_buffer: STAKING_PERIOD_SYNCHRONY_DELAY,
            delegation_fee_rate: DEFAULT_DELEGATION_FEE_RATE,
        }
    }
}

impl StakingSchedule {
    /// Shortens every delay so validators start almost immediately. Periods
    /// are left untouched because the ledger enforces a minimum stake
    /// duration.
    #[must_use]
    pub const fn with_delays(mut self, delay: Duration, synchrony_buffer: Duration) -> Self {
        self.staking_delay = delay;
        self.delegation_delay = delay;
        self.synchrony_buffer = synchrony_buffer;
        self
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
