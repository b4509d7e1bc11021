use crate::bss::BillingCycle;
use crate::error::{Error, Result, ResultExt};
use crate::job::wait_until;
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::DbStatus;
use crate::transport::query;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Datastore {
    /// MySQL / PostgreSQL / SQLServer
    #[serde(rename = "type", default)]
    pub engine: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DbNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// master / slave / readreplica
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DbVolume {
    #[serde(rename = "type", default)]
    pub volume_type: String,
    /// GB
    #[serde(default)]
    pub size: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DbInstance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alias: String,
    /// Single / Ha / Replica
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(default)]
    pub datastore: Datastore,
    #[serde(default)]
    pub flavor_ref: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub private_ips: Vec<String>,
    #[serde(default)]
    pub public_ips: Vec<String>,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub security_group_id: String,
    #[serde(default)]
    pub nodes: Vec<DbNode>,
    #[serde(default)]
    pub volume: DbVolume,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub charge_info: Option<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

impl DbInstance {
    pub fn status(&self) -> DbStatus {
        DbStatus::from_vendor(&self.status)
    }

    /// 主节点所在可用区
    pub fn master_zone(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.role == "master")
            .or(self.nodes.first())
            .map(|n| n.availability_zone.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DbFlavor {
    #[serde(default)]
    pub vcpus: String,
    /// GB
    #[serde(default)]
    pub ram: u32,
    pub spec_code: String,
    /// single / ha / replica
    #[serde(default)]
    pub instance_mode: String,
    #[serde(default)]
    pub az_status: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RdsJob {
    #[serde(default)]
    status: String,
    #[serde(default)]
    process: Option<String>,
}

impl Region {
    /// 实例列表，`offset`翻页，取满`total_count`即停止
    pub async fn db_instances(&self, instance_id: Option<&str>) -> Result<Vec<DbInstance>> {
        let q = query(instance_id.filter(|i| !i.is_empty()).map(|i| ("id", i)));
        self.list_all_as(
            Service::Rds,
            "instances",
            &q,
            &Paginator::offset("instances", 100).total_key("total_count"),
        )
        .await
        .context("list db instances")
    }

    pub async fn db_instance(&self, instance_id: &str) -> Result<DbInstance> {
        self.db_instances(Some(instance_id))
            .await?
            .into_iter()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| Error::NotFound(format!("db instance {instance_id}")))
    }

    pub async fn delete_db_instance(&self, instance_id: &str) -> Result<()> {
        self.delete(Service::Rds, &format!("instances/{instance_id}"))
            .await
            .context(format!("delete db instance {instance_id}"))?;
        Ok(())
    }

    async fn db_job_status(&self, job_id: &str) -> Result<String> {
        let resp = self.get(Service::Rds, "jobs", &query([("id", job_id)])).await?;
        let job: RdsJob = decode(&resp, "job")?;
        tracing::debug!(job_id, status = %job.status, process = ?job.process, "rds job");
        Ok(job.status)
    }

    /// 等待响应中`job_id`对应的任务完成，没有任务id时直接返回
    async fn wait_db_job(&self, resp: &Value, what: &str) -> Result<()> {
        let Some(job_id) = resp.get("job_id").and_then(Value::as_str).filter(|j| !j.is_empty()) else {
            return Ok(());
        };
        let failed = AtomicBool::new(false);
        let failed_ref = &failed;
        wait_until(
            Duration::from_secs(10),
            Duration::from_secs(20 * 60),
            &format!("{what} job {job_id}"),
            move || async move {
                let status = self.db_job_status(job_id).await?;
                if status == "Failed" {
                    failed_ref.store(true, Ordering::Relaxed);
                }
                Ok::<_, Error>(status == "Completed" || status == "Failed")
            },
        )
        .await?;
        if failed.load(Ordering::Relaxed) {
            return Err(Error::Fatal(format!("rds job {job_id} failed")));
        }
        Ok(())
    }

    pub async fn reboot_db_instance(&self, instance_id: &str) -> Result<()> {
        let resp = self
            .post(
                Service::Rds,
                &format!("instances/{instance_id}/action"),
                &json!({"restart": {}}),
            )
            .await
            .context(format!("reboot db instance {instance_id}"))?;
        self.wait_db_job(&resp, "reboot").await
    }

    /// `action`为`openSSL`之类的连接操作
    pub async fn db_connection_action(&self, instance_id: &str, action: &str) -> Result<()> {
        let resp = self
            .post(Service::Rds, &format!("instances/{instance_id}/{action}"), &json!({}))
            .await
            .context(format!("rds {action} of {instance_id}"))?;
        self.wait_db_job(&resp, action).await
    }

    /// 规格和磁盘分别变更，每次变更后等待实例恢复运行
    pub async fn change_db_instance_config(
        &self,
        instance_id: &str,
        spec_code: Option<&str>,
        disk_size_gb: Option<u32>,
    ) -> Result<()> {
        let mut actions = Vec::new();
        if let Some(spec) = spec_code.filter(|s| !s.is_empty()) {
            actions.push(("resize_flavor", json!({"resize_flavor": {"spec_code": spec}})));
        }
        if let Some(size) = disk_size_gb.filter(|s| *s > 0) {
            actions.push(("enlarge_volume", json!({"enlarge_volume": {"size": size}})));
        }
        for (name, body) in actions {
            self.post(Service::Rds, &format!("instances/{instance_id}/action"), &body)
                .await
                .context(format!("{name} of db instance {instance_id}"))?;
            wait_until(
                Duration::from_secs(5),
                Duration::from_secs(30 * 60),
                &format!("db instance {instance_id} running"),
                || async move {
                    Ok::<_, Error>(self.db_instance(instance_id).await?.status() == DbStatus::Running)
                },
            )
            .await?;
        }
        Ok(())
    }

    pub async fn update_db_instance(&self, instance_id: &str, name: Option<&str>, desc: &str) -> Result<()> {
        if let Some(n) = name.filter(|n| !n.is_empty()) {
            self.put(Service::Rds, &format!("instances/{instance_id}/name"), &json!({"name": n}))
                .await
                .context(format!("rename db instance {instance_id}"))?;
        }
        self.put(Service::Rds, &format!("instances/{instance_id}/alias"), &json!({"alias": desc}))
            .await
            .context(format!("update alias of db instance {instance_id}"))?;
        Ok(())
    }

    pub async fn db_flavors(&self, engine: &str, version: Option<&str>) -> Result<Vec<DbFlavor>> {
        let q = query(version.filter(|v| !v.is_empty()).map(|v| ("version_name", v)));
        let resp = self
            .get(Service::Rds, &format!("flavors/{engine}"), &q)
            .await
            .context(format!("list {engine} flavors"))?;
        decode(&resp, "flavors")
    }

    /// 从备份恢复到`target`实例，`origin`为空时使用`target`本身的备份
    pub async fn recover_db_instance(
        &self,
        target: &str,
        origin: Option<&str>,
        backup_id: &str,
        databases: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut source = json!({"type": "backup", "backup_id": backup_id});
        source["instance_id"] = origin.filter(|o| !o.is_empty()).unwrap_or(target).into();
        if !databases.is_empty() {
            source["database_name"] = json!(databases);
        }
        let body = json!({"source": source, "target": {"instance_id": target}});
        self.post(Service::Rds, "instances/recovery", &body)
            .await
            .context(format!("recover db instance {target}"))?;
        Ok(())
    }

    pub async fn set_db_instance_tags(
        &self,
        instance_id: &str,
        tags: &BTreeMap<String, String>,
        remove: &[String],
    ) -> Result<()> {
        let path = format!("instances/{instance_id}/tags/action");
        if !remove.is_empty() {
            let keys: Vec<_> = remove.iter().map(|k| json!({"key": k})).collect();
            self.post(Service::Rds, &path, &json!({"action": "delete", "tags": keys}))
                .await
                .context(format!("delete tags of db instance {instance_id}"))?;
        }
        if !tags.is_empty() {
            let kvs: Vec<_> = tags.iter().map(|(k, v)| json!({"key": k, "value": v})).collect();
            self.post(Service::Rds, &path, &json!({"action": "create", "tags": kvs}))
                .await
                .context(format!("create tags of db instance {instance_id}"))?;
        }
        Ok(())
    }

    pub async fn renew_db_instance(&self, instance_id: &str, cycle: BillingCycle) -> Result<()> {
        self.client().renew_resource(instance_id, cycle).await
    }
}
