//! 厂商状态到通用状态的映射
//!
//! 每个映射都是全函数：未知的厂商状态一律落到`Unknown`(或对应的兜底值)，不会panic

use serde::Serialize;
use std::fmt::{Display, Formatter};

macro_rules! canonical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $s,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

canonical! {
    /// 云主机状态
    VmStatus {
        Running => "running",
        Starting => "starting",
        Stopping => "stopping",
        Ready => "ready",
        Unknown => "unknown",
    }
}

canonical! {
    PowerState {
        On => "on",
        Off => "off",
    }
}

canonical! {
    DiskStatus {
        Creating => "creating",
        Ready => "ready",
        Failed => "failed",
        Attaching => "attaching",
        Detaching => "detaching",
        Resizing => "resizing",
        Deleting => "deleting",
        BackupRestoring => "backup_restoring",
        Unknown => "unknown",
    }
}

canonical! {
    SnapshotStatus {
        Creating => "creating",
        Ready => "ready",
        Failed => "failed",
        Deleting => "deleting",
        Unknown => "unknown",
    }
}

canonical! {
    ImageStatus {
        Caching => "caching",
        Active => "active",
        CacheFailed => "cache_failed",
        Unknown => "unknown",
    }
}

canonical! {
    ImageType {
        System => "system",
        Customized => "customized",
        Shared => "shared",
    }
}

canonical! {
    VpcStatus {
        Available => "available",
        Pending => "pending",
        Unknown => "unknown",
    }
}

canonical! {
    /// 子网
    NetworkStatus {
        Available => "available",
        Failed => "failed",
        Unknown => "unknown",
    }
}

canonical! {
    EipStatus {
        Ready => "ready",
        Allocating => "allocating",
        Associating => "associating",
        Failed => "failed",
        Deallocating => "deallocating",
        Unknown => "unknown",
    }
}

canonical! {
    PeeringStatus {
        Pending => "pending",
        Active => "active",
        Deleted => "deleted",
        Unknown => "unknown",
    }
}

canonical! {
    NatStatus {
        Available => "available",
        Allocating => "allocating",
        Deploying => "deploying",
        Deleting => "deleting",
        Unknown => "unknown",
    }
}

canonical! {
    NasStatus {
        Creating => "creating",
        Available => "available",
        CreateFailed => "create_failed",
        Unavailable => "unavailable",
        Unknown => "unknown",
    }
}

canonical! {
    DbStatus {
        Deploying => "deploying",
        Running => "running",
        Rebooting => "rebooting",
        Restoring => "restoring",
        Migrating => "migrating",
        BackingUp => "backing_up",
        Unknown => "unknown",
    }
}

canonical! {
    CacheStatus {
        Running => "running",
        Deploying => "deploying",
        CreateFailed => "create_failed",
        Error => "error",
        Restarting => "restarting",
        Unavailable => "unavailable",
        Changing => "changing",
        Transforming => "transforming",
        Flushing => "flushing",
        Unknown => "unknown",
    }
}

canonical! {
    CdnStatus {
        Online => "online",
        Offline => "offline",
        Processing => "processing",
        Failed => "failed",
        Unknown => "unknown",
    }
}

canonical! {
    ModelartsStatus {
        Running => "running",
        Creating => "creating",
        Deleting => "deleting",
        CreateFailed => "create_failed",
        Error => "error",
        Unknown => "unknown",
    }
}

canonical! {
    LbStatus {
        Enabled => "enabled",
        Disabled => "disabled",
        Unknown => "unknown",
    }
}

impl VmStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Running,
            "MIGRATING" | "REBUILD" | "BUILD" | "RESIZE" | "VERIFY_RESIZE" => Self::Starting,
            "REBOOT" | "HARD_REBOOT" => Self::Stopping,
            "SHUTOFF" => Self::Ready,
            _ => Self::Unknown,
        }
    }
}

impl PowerState {
    pub fn from_vendor(power_state: i64) -> Self {
        if power_state == 1 { Self::On } else { Self::Off }
    }
}

impl DiskStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "creating" => Self::Creating,
            "available" | "in-use" | "downloading" => Self::Ready,
            "attaching" => Self::Attaching,
            "detaching" => Self::Detaching,
            "extending" => Self::Resizing,
            "deleting" => Self::Deleting,
            "restoring-backup" => Self::BackupRestoring,
            s if s == "error" || s.starts_with("error_") => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl SnapshotStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "creating" => Self::Creating,
            "available" => Self::Ready,
            "error" => Self::Failed,
            "deleting" => Self::Deleting,
            _ => Self::Unknown,
        }
    }
}

impl ImageStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "queued" => Self::Caching,
            "active" => Self::Active,
            "killed" => Self::CacheFailed,
            _ => Self::Unknown,
        }
    }
}

impl ImageType {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "gold" => Self::System,
            "shared" => Self::Shared,
            _ => Self::Customized,
        }
    }
}

impl VpcStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "OK" => Self::Available,
            "CREATING" => Self::Pending,
            _ => Self::Unknown,
        }
    }
}

impl NetworkStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Available,
            "ERROR" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl EipStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "ACTIVE" | "DOWN" | "ELB" => Self::Ready,
            "PENDING_CREATE" => Self::Allocating,
            "PENDING_UPDATE" => Self::Associating,
            "ERROR" | "BIND_ERROR" => Self::Failed,
            "PENDING_DELETE" | "NOTIFYING" => Self::Deallocating,
            _ => Self::Unknown,
        }
    }
}

impl PeeringStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "PENDING_ACCEPTANCE" => Self::Pending,
            "ACTIVE" => Self::Active,
            "DELETED" => Self::Deleted,
            _ => Self::Unknown,
        }
    }
}

impl NatStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Available,
            "PENDING_CREATE" => Self::Allocating,
            "PENDING_UPDATE" => Self::Deploying,
            "PENDING_DELETE" => Self::Deleting,
            _ => Self::Unknown,
        }
    }
}

impl NasStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "100" => Self::Creating,
            "200" => Self::Available,
            "303" => Self::CreateFailed,
            "800" => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

impl DbStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "BUILD" | "MODIFYING" | "MODIFYING INSTANCE TYPE" | "SWITCHOVER"
            | "MODIFYING DATABASE PORT" => Self::Deploying,
            "ACTIVE" => Self::Running,
            "REBOOTING" => Self::Rebooting,
            "RESTORING" => Self::Restoring,
            "MIGRATING" => Self::Migrating,
            "BACKING UP" => Self::BackingUp,
            // FAILED FROZEN STORAGE FULL
            _ => Self::Unknown,
        }
    }
}

impl CacheStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "RUNNING" => Self::Running,
            "CREATING" => Self::Deploying,
            "CREATEFAILED" => Self::CreateFailed,
            "ERROR" => Self::Error,
            "RESTARTING" => Self::Restarting,
            "FROZEN" => Self::Unavailable,
            "EXTENDING" => Self::Changing,
            "RESTORING" => Self::Transforming,
            "FLUSHING" => Self::Flushing,
            _ => Self::Unknown,
        }
    }
}

impl CdnStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "offline" => Self::Offline,
            "configuring" | "checking" => Self::Processing,
            "configure_failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl LbStatus {
    pub fn from_admin_state(admin_state_up: bool) -> Self {
        if admin_state_up { Self::Enabled } else { Self::Disabled }
    }
}

impl ModelartsStatus {
    pub fn from_vendor(s: &str) -> Self {
        match s {
            "created" => Self::Running,
            "creating" => Self::Creating,
            "deleting" => Self::Deleting,
            "failed" => Self::CreateFailed,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_status_table() {
        assert_eq!(VmStatus::from_vendor("ACTIVE"), VmStatus::Running);
        assert_eq!(VmStatus::from_vendor("VERIFY_RESIZE"), VmStatus::Starting);
        assert_eq!(VmStatus::from_vendor("HARD_REBOOT"), VmStatus::Stopping);
        assert_eq!(VmStatus::from_vendor("SHUTOFF"), VmStatus::Ready);
        assert_eq!(VmStatus::from_vendor("ERROR"), VmStatus::Unknown);
        assert_eq!(PowerState::from_vendor(0), PowerState::Off);
        assert_eq!(PowerState::from_vendor(1), PowerState::On);
    }

    #[test]
    fn arbitrary_strings_never_panic() {
        for s in ["", "active", "\u{0}", "ACTIVE ", "生产中", "error_deleting", "x".repeat(4096).as_str()] {
            let _ = VmStatus::from_vendor(s);
            let _ = DiskStatus::from_vendor(s);
            let _ = SnapshotStatus::from_vendor(s);
            let _ = EipStatus::from_vendor(s);
            let _ = DbStatus::from_vendor(s);
            let _ = CacheStatus::from_vendor(s);
            let _ = NasStatus::from_vendor(s);
            let _ = CdnStatus::from_vendor(s);
            let _ = ModelartsStatus::from_vendor(s);
        }
    }

    #[test]
    fn disk_error_prefix() {
        assert_eq!(DiskStatus::from_vendor("error_restoring"), DiskStatus::Failed);
        assert_eq!(DiskStatus::from_vendor("error"), DiskStatus::Failed);
        assert_eq!(DiskStatus::from_vendor("errors"), DiskStatus::Unknown);
        assert_eq!(DiskStatus::from_vendor("downloading"), DiskStatus::Ready);
    }

    #[test]
    fn image_and_misc() {
        assert_eq!(ImageType::from_vendor("gold"), ImageType::System);
        assert_eq!(ImageType::from_vendor("market"), ImageType::Customized);
        assert_eq!(ImageStatus::from_vendor("killed"), ImageStatus::CacheFailed);
        assert_eq!(DbStatus::from_vendor("STORAGE FULL"), DbStatus::Unknown);
        assert_eq!(CacheStatus::from_vendor("RESTORING"), CacheStatus::Transforming);
        assert_eq!(NasStatus::from_vendor("303"), NasStatus::CreateFailed);
        assert_eq!(serde_json::to_value(EipStatus::Deallocating).unwrap(), "deallocating");
        assert_eq!(VmStatus::Ready.to_string(), "ready");
    }
}
