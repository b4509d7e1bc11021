//! SFS Turbo文件系统

use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::NasStatus;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct SfsShare {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `100`创建中 `200`可用 `303`创建失败 `800`冻结
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sub_status: String,
    /// NFS
    #[serde(default)]
    pub share_proto: String,
    /// STANDARD / PERFORMANCE
    #[serde(default)]
    pub share_type: String,
    /// GB，厂商返回如`500.00`
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub avail_capacity: String,
    /// `0`按需 `1`包周期
    #[serde(default)]
    pub pay_model: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub security_group_id: String,
    #[serde(default)]
    pub export_location: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl SfsShare {
    pub fn status(&self) -> NasStatus {
        NasStatus::from_vendor(&self.status)
    }

    pub fn capacity_gb(&self) -> f64 {
        self.size.parse().unwrap_or_default()
    }

    pub fn is_prepaid(&self) -> bool {
        self.pay_model == "1"
    }
}

#[serde_with::skip_serializing_none]
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(on(String, into))]
pub struct CreateSfsShare {
    pub name: String,
    #[builder(default = "NFS".to_owned())]
    pub share_proto: String,
    #[builder(default = "STANDARD".to_owned())]
    pub share_type: String,
    /// GB
    pub size: u32,
    pub availability_zone: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
    pub description: Option<String>,
    pub enterprise_project_id: Option<String>,
}

impl Region {
    pub async fn sfs_shares(&self) -> Result<Vec<SfsShare>> {
        self.list_all_as(
            Service::SfsTurbo,
            "sfs-turbo/shares/detail",
            &[],
            &Paginator::offset("shares", 200).total_key("count"),
        )
        .await
        .context("list sfs turbo shares")
    }

    pub async fn sfs_share(&self, share_id: &str) -> Result<SfsShare> {
        let resp = self
            .get(Service::SfsTurbo, &format!("sfs-turbo/shares/{share_id}"), &[])
            .await
            .context(format!("get sfs turbo share {share_id}"))?;
        decode(&resp, "")
    }

    /// 返回新建文件系统的id，创建为异步过程
    pub async fn create_sfs_share(&self, opts: &CreateSfsShare) -> Result<String> {
        let resp = self
            .post(Service::SfsTurbo, "sfs-turbo/shares", &json!({ "share": opts }))
            .await
            .context(format!("create sfs turbo share {}", opts.name))?;
        decode(&resp, "id")
    }

    pub async fn extend_sfs_share(&self, share_id: &str, new_size: u32) -> Result<()> {
        self.post(
            Service::SfsTurbo,
            &format!("sfs-turbo/shares/{share_id}/action"),
            &json!({"extend": {"new_size": new_size}}),
        )
        .await
        .context(format!("extend sfs turbo share {share_id}"))?;
        Ok(())
    }

    pub async fn delete_sfs_share(&self, share_id: &str) -> Result<()> {
        self.delete(Service::SfsTurbo, &format!("sfs-turbo/shares/{share_id}"))
            .await
            .context(format!("delete sfs turbo share {share_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_from_json() {
        let s: SfsShare = serde_json::from_value(json!({
            "id": "sfs-1",
            "status": "303",
            "size": "500.00",
            "pay_model": "0"
        }))
        .unwrap();
        assert_eq!(s.status(), NasStatus::CreateFailed);
        assert_eq!(s.capacity_gb(), 500.0);
        assert!(!s.is_prepaid());
    }

    #[test]
    fn create_body_skips_none() {
        let opts = CreateSfsShare::builder()
            .name("nas")
            .size(500)
            .availability_zone("cn-north-4a")
            .vpc_id("vpc-1")
            .subnet_id("net-1")
            .security_group_id("sg-1")
            .build();
        let v = serde_json::to_value(&opts).unwrap();
        assert_eq!(v["share_proto"], "NFS");
        assert!(v.get("description").is_none());
    }
}
