pub mod bombard;
pub mod builder;
pub mod chain;
pub mod expectations;
pub mod runner;
pub mod scenarios;

pub use bombard::{AccountReport, BombardError, BombardExecutor, BombardPhase, BombardReport};
pub use builder::{BombardBuilder, BuilderInputError};
pub use chain::{ChainBuildError, ChainContext, TxChain, build_chain};
pub use expectations::ValidatorSetExpectation;
pub use runner::{CrossChainTransfer, DefaultAddresses, WorkflowError, WorkflowRunner};
pub use scenarios::{ADDITIONAL_NODES, AddValidatorTest, StakingNetworkBombardTest};
