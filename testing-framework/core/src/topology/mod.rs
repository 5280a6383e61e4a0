pub mod descriptor;
pub mod network;
pub mod readiness;

pub use descriptor::{DescriptorError, NetworkDescriptor, NodeDescriptor, NodeRole};
pub use network::StaticNetwork;
