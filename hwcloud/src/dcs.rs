//! 分布式缓存DCS(Redis/Memcached)

use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::CacheStatus;
use crate::transport::query;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Clone, Debug, Deserialize)]
pub struct CacheInstance {
    pub instance_id: String,
    #[serde(default)]
    pub name: String,
    /// Redis / Memcached
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    /// GB
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub capacity_minor: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "domainName", default)]
    pub domain_name: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    /// MB
    #[serde(default)]
    pub max_memory: u64,
    #[serde(default)]
    pub used_memory: u64,
    #[serde(default)]
    pub resource_spec_code: String,
    /// 0按需 1包周期
    #[serde(default)]
    pub charging_mode: i64,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub security_group_id: String,
    #[serde(default)]
    pub available_zones: Vec<String>,
    #[serde(default)]
    pub maintain_begin: String,
    #[serde(default)]
    pub maintain_end: String,
    #[serde(default)]
    pub no_password_access: String,
    #[serde(default)]
    pub access_user: Option<String>,
    #[serde(default)]
    pub enable_publicip: bool,
    #[serde(default)]
    pub publicip_address: Option<String>,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl CacheInstance {
    pub fn status(&self) -> CacheStatus {
        CacheStatus::from_vendor(&self.status)
    }

    pub fn is_prepaid(&self) -> bool {
        self.charging_mode == 1
    }

    pub fn password_access(&self) -> bool {
        self.no_password_access != "true"
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheBackup {
    #[serde(default)]
    pub backup_id: String,
    #[serde(default)]
    pub backup_name: String,
    #[serde(default)]
    pub status: String,
    /// manual / auto
    #[serde(default)]
    pub backup_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheParameter {
    pub param_name: String,
    #[serde(default)]
    pub param_value: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub need_restart: bool,
}

impl Region {
    /// 取满`instance_num`即停止
    pub async fn cache_instances(&self) -> Result<Vec<CacheInstance>> {
        self.list_all_as(
            Service::Dcs,
            "instances",
            &[],
            &Paginator::offset("instances", 1000).total_key("instance_num"),
        )
        .await
        .context("list cache instances")
    }

    pub async fn cache_instance(&self, instance_id: &str) -> Result<CacheInstance> {
        let resp = self
            .get(Service::Dcs, &format!("instances/{instance_id}"), &[])
            .await
            .context(format!("get cache instance {instance_id}"))?;
        decode(&resp, "")
    }

    pub async fn delete_cache_instance(&self, instance_id: &str) -> Result<()> {
        self.delete(Service::Dcs, &format!("instances/{instance_id}"))
            .await
            .context(format!("delete cache instance {instance_id}"))?;
        Ok(())
    }

    async fn cache_status_action(&self, instance_id: &str, action: &str) -> Result<()> {
        let body = json!({"instances": [instance_id], "action": action});
        self.put(Service::Dcs, "instances/status", &body)
            .await
            .context(format!("{action} cache instance {instance_id}"))?;
        Ok(())
    }

    pub async fn restart_cache_instance(&self, instance_id: &str) -> Result<()> {
        self.cache_status_action(instance_id, "restart").await
    }

    /// 清空实例数据
    pub async fn flush_cache_instance(&self, instance_id: &str) -> Result<()> {
        self.cache_status_action(instance_id, "flush").await
    }

    pub async fn change_cache_spec(&self, instance_id: &str, spec_code: &str) -> Result<()> {
        let instance = self.cache_instance(instance_id).await?;
        let body = json!({"spec_code": spec_code, "new_capacity": instance.capacity});
        self.post(Service::Dcs, &format!("instances/{instance_id}/resize"), &body)
            .await
            .context(format!("resize cache instance {instance_id}"))?;
        Ok(())
    }

    /// 时间格式`HH:mm:ss`
    pub async fn set_cache_maintain_time(&self, instance_id: &str, begin: &str, end: &str) -> Result<()> {
        let body = json!({"maintain_begin": begin, "maintain_end": end});
        self.put(Service::Dcs, &format!("instances/{instance_id}"), &body)
            .await
            .context(format!("set maintain time of {instance_id}"))?;
        Ok(())
    }

    pub async fn cache_backups(&self, instance_id: &str, begin: &str, end: &str) -> Result<Vec<CacheBackup>> {
        self.list_all_as(
            Service::Dcs,
            &format!("instances/{instance_id}/backups"),
            &query([("begin_time", begin), ("end_time", end)]),
            &Paginator::offset("backup_record_response", 1000).total_key("total_num"),
        )
        .await
        .context(format!("list backups of {instance_id}"))
    }

    pub async fn cache_parameters(&self, instance_id: &str) -> Result<Vec<CacheParameter>> {
        let resp = self
            .get(Service::Dcs, &format!("instances/{instance_id}/configs"), &[])
            .await
            .context(format!("list parameters of {instance_id}"))?;
        decode(&resp, "redis_config")
    }

    /// `config`为`[{"param_id", "param_name", "param_value"}]`
    pub async fn update_cache_parameters(&self, instance_id: &str, config: &Value) -> Result<()> {
        self.put(
            Service::Dcs,
            &format!("instances/{instance_id}/async-configs"),
            &json!({ "redis_config": config }),
        )
        .await
        .context(format!("update parameters of {instance_id}"))?;
        Ok(())
    }
}

/// `Monday,Friday` -> `["1", "5"]`
pub fn backup_weekdays(period: &str) -> Vec<&'static str> {
    period
        .split(',')
        .filter_map(|d| match d.trim() {
            "Monday" => Some("1"),
            "Tuesday" => Some("2"),
            "Wednesday" => Some("3"),
            "Thursday" => Some("4"),
            "Friday" => Some("5"),
            "Saturday" => Some("6"),
            "Sunday" => Some("7"),
            _ => None,
        })
        .collect()
}

impl Region {
    /// `begin_at`如`00:00-01:00`，UTC
    pub async fn set_cache_backup_policy(
        &self,
        instance_id: &str,
        save_days: u32,
        backup_type: &str,
        begin_at: &str,
        period: &str,
    ) -> Result<()> {
        let policy = json!({
            "save_days": save_days,
            "backup_type": backup_type,
            "periodical_backup_plan": {
                "begin_at": begin_at.replace('Z', ""),
                "period_type": "weekly",
                "backup_at": backup_weekdays(period),
            },
        });
        self.put(
            Service::Dcs,
            &format!("instances/{instance_id}"),
            &json!({ "instance_backup_policy": policy }),
        )
        .await
        .context(format!("set backup policy of {instance_id}"))?;
        Ok(())
    }
}
