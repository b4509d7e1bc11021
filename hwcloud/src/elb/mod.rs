//! 弹性负载均衡(ELB v3)
//!
//! 所有列表接口都使用`page_info.next_marker`翻页

mod acl;
mod cert;
mod listener;
mod loadbalancer;
mod pool;

pub use acl::{AclEntry, CreateLbAcl, CreateLbAclBuilder, LbAcl};
pub use cert::LbCertificate;
pub use listener::{CreateListener, InsertHeaders, Listener, ListenerIpGroup, UpdateListener};
pub use loadbalancer::{CreateLoadBalancer, LbEip, LoadBalancer};
pub use pool::{
    CreatePool, HealthCheck, HealthMonitor, Member, Pool, Scheduler, StickySession,
    health_codes_from_wire, health_codes_to_wire,
};

use serde::Deserialize;

pub(crate) const ELB_PAGE: u32 = 2000;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdRef {
    pub id: String,
}
