//! 云硬盘、快照和磁盘类型

mod disk;
mod snapshot;
mod storage;

pub use disk::{Attachment, CreateDisk, Disk};
pub use snapshot::Snapshot;
pub use storage::{DiskType, ExtraSpecs, Storage};
