//! 云数据库RDS

mod account;
mod instance;

pub use account::{Database, DbAccount, DbPrivilege};
pub use instance::{Datastore, DbFlavor, DbInstance, DbNode, DbVolume};
