//! 云硬盘
//!
//! [EVS API文档](https://support.huaweicloud.com/api-evs/evs_04_0001.html)

use crate::error::{Error, Result, ResultExt};
use crate::job::{JobService, JobSubmitted, WaitJob};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::DiskStatus;
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub attachment_id: String,
    #[serde(default)]
    pub device: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Disk {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// GB
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub volume_type: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub description: String,
    /// "true" 或 "false"
    #[serde(default)]
    pub bootable: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub multiattach: bool,
}

impl Disk {
    pub fn status(&self) -> DiskStatus {
        DiskStatus::from_vendor(&self.status)
    }

    pub fn is_bootable(&self) -> bool {
        self.bootable == "true"
    }

    pub fn is_prepaid(&self) -> bool {
        self.metadata
            .get("orderID")
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty())
    }

    /// 挂载的云主机
    pub fn server_ids(&self) -> Vec<&str> {
        self.attachments.iter().map(|a| a.server_id.as_str()).collect()
    }
}

/// 创建云硬盘，完成后返回磁盘id
#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateDisk<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    zone_id: String,
    name: String,
    /// GB
    size: u32,
    volume_type: String,
    #[builder(default)]
    description: String,
    snapshot_id: Option<String>,
    enterprise_project_id: Option<String>,
}

impl CreateDisk<'_> {
    pub async fn send(&self) -> Result<String> {
        let mut volume = json!({
            "availability_zone": self.zone_id,
            "name": self.name,
            "size": self.size,
            "volume_type": self.volume_type,
            "description": self.description,
        });
        if let Some(id) = self.snapshot_id.as_deref().filter(|s| !s.is_empty()) {
            volume["snapshot_id"] = id.into();
        }
        let mut body = json!({ "volume": volume });
        if let Some(pid) = self.enterprise_project_id.as_deref().filter(|s| !s.is_empty()) {
            body["volume"]["enterprise_project_id"] = pid.into();
        }
        let resp = self
            .region
            .post(Service::EvsV2_1, "cloudvolumes", &body)
            .await
            .context(format!("create disk {}", self.name))?;
        let submitted: JobSubmitted = serde_json::from_value(resp)?;
        let job = WaitJob::builder(self.region, JobService::Evs, &submitted.job_id)
            .build()
            .wait()
            .await
            .context(format!("create disk {}", self.name))?;
        job.entity("volume_id")
            .or_else(|| job.sub_job_entities().into_iter().next())
            .ok_or_else(|| Error::Fatal(format!("job {} returned no volume_id", submitted.job_id)))
    }
}

impl Region {
    /// `zone_id`为空时列出所有可用区的磁盘
    pub async fn disks(&self, zone_id: Option<&str>) -> Result<Vec<Disk>> {
        let q = query(zone_id.filter(|z| !z.is_empty()).map(|z| ("availability_zone", z)));
        self.list_all_as(
            Service::Evs,
            "cloudvolumes/detail",
            &q,
            &Paginator::offset("volumes", 100).total_key("count"),
        )
        .await
        .context("list disks")
    }

    pub async fn disk(&self, disk_id: &str) -> Result<Disk> {
        let resp = self
            .get(Service::Evs, &format!("cloudvolumes/{disk_id}"), &[])
            .await
            .context(format!("get disk {disk_id}"))?;
        decode(&resp, "volume")
    }

    pub async fn delete_disk(&self, disk_id: &str) -> Result<()> {
        self.delete(Service::Evs, &format!("cloudvolumes/{disk_id}"))
            .await
            .context(format!("delete disk {disk_id}"))?;
        Ok(())
    }

    /// 扩容到`new_size_gb`，等待任务完成
    pub async fn resize_disk(&self, disk_id: &str, new_size_gb: u32) -> Result<()> {
        let body = json!({"os-extend": {"new_size": new_size_gb}});
        let resp = self
            .post(Service::EvsV2_1, &format!("cloudvolumes/{disk_id}/action"), &body)
            .await
            .context(format!("resize disk {disk_id}"))?;
        let submitted: JobSubmitted = serde_json::from_value(resp)?;
        if submitted.job_id.is_empty() {
            // 包周期磁盘返回订单号，没有任务
            return Ok(());
        }
        WaitJob::builder(self, JobService::Evs, &submitted.job_id)
            .interval(Duration::from_secs(10))
            .build()
            .wait()
            .await
            .context(format!("resize disk {disk_id}"))?;
        Ok(())
    }

    /// 用快照回滚磁盘
    pub async fn reset_disk(&self, disk_id: &str, snapshot_id: &str) -> Result<String> {
        let body = json!({"rollback": {"volume_id": disk_id}});
        self.post(
            Service::Evs,
            &format!("os-vendor-snapshots/{snapshot_id}/rollback"),
            &body,
        )
        .await
        .context(format!("reset disk {disk_id} with snapshot {snapshot_id}"))?;
        Ok(disk_id.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_decode() {
        let d: Disk = serde_json::from_value(json!({
            "id": "d-1",
            "status": "in-use",
            "size": 40,
            "bootable": "true",
            "attachments": [{"server_id": "i-1", "device": "/dev/vda"}],
            "metadata": {"orderID": "CS2101"}
        }))
        .unwrap();
        assert_eq!(d.status(), DiskStatus::Ready);
        assert!(d.is_bootable());
        assert!(d.is_prepaid());
        assert_eq!(d.server_ids(), vec!["i-1"]);
    }
}
