//! 虚拟私有云: VPC、子网、安全组、EIP、对等连接

mod eip;
mod peering;
mod secgroup;
mod subnet;
#[allow(clippy::module_inception)]
mod vpc;

pub use eip::{AllocateEip, Eip, EipProfile, Port};
pub use peering::{PeerVpc, Peering};
pub use secgroup::{RuleSpec, SecurityGroup, SecurityGroupRule};
pub use subnet::{CreateSubnet, Subnet};
pub use vpc::{Route, Vpc};
