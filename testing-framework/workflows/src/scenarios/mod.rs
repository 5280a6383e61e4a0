mod bombard;
mod staking;

pub use bombard::{ADDITIONAL_NODES, StakingNetworkBombardTest};
pub use staking::AddValidatorTest;
