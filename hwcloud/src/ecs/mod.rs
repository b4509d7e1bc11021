//! 弹性云服务器: 可用区、云主机

mod create;
mod instance;
mod zone;

pub use create::{CreateInstance, DiskSpec};
pub use instance::*;
pub use zone::{Zone, ZoneState};
