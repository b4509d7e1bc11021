//! 云主机
//!
//! [ECS API文档](https://support.huaweicloud.com/api-ecs/ecs_02_0101.html)

use crate::bss::BillingCycle;
use crate::error::{Error, Result, ResultExt};
use crate::job::{JobService, WaitJob, wait_until};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::{PowerState, VmStatus};
use crate::transport::query;
use crate::utils::{compare_set, sanitize_description};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const INSTANCE_STATUS_RUNNING: &str = "ACTIVE";
pub const INSTANCE_STATUS_STOPPED: &str = "SHUTOFF";

/// 包年包月的`metadata.charging_mode`
const CHARGING_MODE_PREPAID: &str = "1";

// region:    --- types
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IpAddress {
    #[serde(default)]
    pub version: Value,
    #[serde(default)]
    pub addr: String,
    #[serde(rename = "OS-EXT-IPS-MAC:mac_addr", default)]
    pub mac_addr: String,
    #[serde(rename = "OS-EXT-IPS:port_id", default)]
    pub port_id: String,
    /// fixed 或 floating
    #[serde(rename = "OS-EXT-IPS:type", default)]
    pub ip_type: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Flavor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vcpus: String,
    /// MB
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub disk: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InstanceMetadata {
    #[serde(rename = "metering.image_id", default)]
    pub image_id: String,
    #[serde(rename = "metering.order_id", default)]
    pub order_id: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(default)]
    pub os_bit: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub os_type: String,
    /// "0": 按需  "1": 包年包月
    #[serde(default)]
    pub charging_mode: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VolumeAttached {
    pub id: String,
    #[serde(default)]
    pub device: String,
    #[serde(rename = "bootIndex", default)]
    pub boot_index: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SecurityGroupRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "OS-EXT-STS:power_state", default)]
    pub power_state: i64,
    #[serde(default)]
    pub flavor: Flavor,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<IpAddress>>,
    #[serde(default)]
    pub metadata: InstanceMetadata,
    #[serde(default)]
    pub key_name: String,
    #[serde(default)]
    pub created: String,
    #[serde(rename = "os-extended-volumes:volumes_attached", default)]
    pub volumes_attached: Vec<VolumeAttached>,
    #[serde(rename = "OS-EXT-SRV-ATTR:root_device_name", default)]
    pub root_device_name: String,
    #[serde(rename = "OS-EXT-SRV-ATTR:hostname", default)]
    pub hostname: String,
    #[serde(rename = "OS-EXT-AZ:availability_zone", default)]
    pub availability_zone: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroupRef>,
    /// `key=value`
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Instance {
    pub fn status(&self) -> VmStatus {
        VmStatus::from_vendor(&self.status)
    }

    pub fn power_state(&self) -> PowerState {
        PowerState::from_vendor(self.power_state)
    }

    pub fn is_prepaid(&self) -> bool {
        self.metadata.charging_mode == CHARGING_MODE_PREPAID
    }

    pub fn instance_type(&self) -> &str {
        &self.flavor.id
    }

    pub fn vcpu_count(&self) -> u32 {
        self.flavor.vcpus.parse().unwrap_or_default()
    }

    pub fn vmem_size_mb(&self) -> u64 {
        self.flavor.ram.parse().unwrap_or_default()
    }

    pub fn tags(&self) -> BTreeMap<String, String> {
        self.tags
            .iter()
            .map(|t| match t.split_once('=') {
                Some((k, v)) => (k.to_owned(), v.to_owned()),
                None => (t.clone(), String::new()),
            })
            .collect()
    }

    /// 挂载设备名与根设备名一致的磁盘为系统盘
    pub fn root_disk_id(&self) -> Option<&str> {
        self.volumes_attached
            .iter()
            .find(|v| !self.root_device_name.is_empty() && v.device == self.root_device_name)
            .map(|v| v.id.as_str())
    }

    pub fn private_ips(&self) -> Vec<&str> {
        self.ips_of_type("fixed")
    }

    pub fn public_ips(&self) -> Vec<&str> {
        self.ips_of_type("floating")
    }

    fn ips_of_type(&self, ip_type: &str) -> Vec<&str> {
        let mut ips: Vec<&str> = self
            .addresses
            .values()
            .flatten()
            .filter(|a| a.ip_type == ip_type)
            .map(|a| a.addr.as_str())
            .collect();
        ips.sort_unstable();
        ips
    }

    /// 下一个可用的挂载点: virtio根盘用`/dev/vdX`，否则`/dev/sdX`，从b开始
    pub fn next_device_name(&self) -> Result<String> {
        let prefix = if self.root_device_name.contains("/vd") { "v" } else { "s" };
        let current: Vec<String> = self
            .volumes_attached
            .iter()
            .map(|v| v.device.to_lowercase())
            .collect();
        (b'b'..=b'z')
            .map(|c| format!("/dev/{prefix}d{}", c as char))
            .find(|d| !current.contains(d))
            .ok_or_else(|| {
                Error::Fatal(format!(
                    "disk device name out of index, current devices: {current:?}"
                ))
            })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VncInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(rename = "type", default)]
    pub console_type: String,
}
// endregion: --- types

/// 重装或切换系统盘
#[derive(Clone, Debug, Default)]
pub struct RebuildRoot {
    /// 为空或与当前镜像相同时重装，否则切换操作系统
    pub image_id: Option<String>,
    pub keypair: Option<String>,
    pub password: Option<String>,
    pub user_data: Option<String>,
    pub user_id: Option<String>,
}

impl Region {
    // region:    --- query
    pub async fn instances(&self) -> Result<Vec<Instance>> {
        self.list_all_as(
            Service::Ecs,
            "cloudservers/detail",
            &[],
            &Paginator::offset("servers", 100).total_key("count"),
        )
        .await
        .context("list instances")
    }

    pub async fn instance(&self, instance_id: &str) -> Result<Instance> {
        let resp = self
            .get(Service::Ecs, &format!("cloudservers/{instance_id}"), &[])
            .await
            .context(format!("get instance {instance_id}"))?;
        decode(&resp, "server")
    }

    pub async fn instances_by_ids(&self, ids: &[&str]) -> Result<Vec<Instance>> {
        let mut ret = Vec::with_capacity(ids.len());
        for id in ids {
            ret.push(self.instance(id).await?);
        }
        Ok(ret)
    }

    async fn instance_status(&self, instance_id: &str) -> Result<String> {
        Ok(self.instance(instance_id).await?.status)
    }

    pub async fn instance_security_group_ids(&self, instance_id: &str) -> Result<Vec<String>> {
        let resp = self
            .get(
                Service::EcsV2_1,
                &format!("servers/{instance_id}/os-security-groups"),
                &[],
            )
            .await
            .context(format!("get security groups of {instance_id}"))?;
        let groups: Vec<SecurityGroupRef> = decode(&resp, "security_groups")?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }
    // endregion: --- query

    // region:    --- power
    /// 已运行时直接返回，非关机状态返回`InvalidStatus`
    pub async fn start_instance(&self, instance_id: &str) -> Result<()> {
        match self.instance_status(instance_id).await?.as_str() {
            INSTANCE_STATUS_RUNNING => return Ok(()),
            INSTANCE_STATUS_STOPPED => {}
            other => {
                return Err(Error::InvalidStatus(format!(
                    "instance {instance_id} status is {other}, expect {INSTANCE_STATUS_STOPPED}"
                )));
            }
        }
        let body = json!({"os-start": {"servers": [{"id": instance_id}]}});
        self.post(Service::Ecs, "cloudservers/action", &body)
            .await
            .context(format!("start instance {instance_id}"))?;
        Ok(())
    }

    /// `force`为true时强制关机
    pub async fn stop_instance(&self, instance_id: &str, force: bool) -> Result<()> {
        match self.instance_status(instance_id).await?.as_str() {
            INSTANCE_STATUS_STOPPED => return Ok(()),
            INSTANCE_STATUS_RUNNING => {}
            other => {
                return Err(Error::InvalidStatus(format!(
                    "instance {instance_id} status is {other}, expect {INSTANCE_STATUS_RUNNING}"
                )));
            }
        }
        let body = json!({"os-stop": {
            "servers": [{"id": instance_id}],
            "type": if force { "HARD" } else { "SOFT" },
        }});
        self.post(Service::Ecs, "cloudservers/action", &body)
            .await
            .context(format!("stop instance {instance_id}"))?;
        Ok(())
    }

    /// 只删除云主机，弹性IP和数据盘需要单独删除
    pub async fn delete_instance(&self, instance_id: &str) -> Result<()> {
        let status = self.instance_status(instance_id).await?;
        if status != INSTANCE_STATUS_STOPPED {
            return Err(Error::InvalidStatus(format!(
                "delete instance {instance_id}: status is {status}, expect {INSTANCE_STATUS_STOPPED}"
            )));
        }
        let body = json!({
            "servers": [{"id": instance_id}],
            "delete_publicip": false,
            "delete_volume": false,
        });
        self.post(Service::Ecs, "cloudservers/delete", &body)
            .await
            .context(format!("delete instance {instance_id}"))?;
        Ok(())
    }
    // endregion: --- power

    // region:    --- update
    pub async fn update_instance(&self, instance_id: &str, name: &str, description: &str) -> Result<()> {
        let body = json!({"server": {"name": name, "description": description}});
        self.put(Service::Ecs, &format!("cloudservers/{instance_id}"), &body)
            .await
            .context(format!("update instance {instance_id}"))?;
        Ok(())
    }

    /// 修改名称和重置密码，重置密码需要镜像安装了一键式重置密码插件
    pub async fn deploy_instance(
        &self,
        instance_id: &str,
        name: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.put(
                Service::EcsV2_1,
                &format!("servers/{instance_id}"),
                &json!({"server": {"name": name}}),
            )
            .await
            .context(format!("rename instance {instance_id}"))?;
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.put(
                Service::EcsV2_1,
                &format!("servers/{instance_id}/os-reset-password"),
                &json!({"reset-password": {"new_password": password}}),
            )
            .await
            .context(format!("reset password of {instance_id}"))?;
        }
        Ok(())
    }

    pub async fn change_instance_config(&self, instance_id: &str, instance_type: &str) -> Result<()> {
        let body = json!({"resize": {"flavorRef": instance_type}});
        self.post(
            Service::EcsV1_1,
            &format!("cloudservers/{instance_id}/resize"),
            &body,
        )
        .await
        .context(format!("resize instance {instance_id}"))?;
        Ok(())
    }

    /// 重装或切换系统，完成后返回新的系统盘id
    pub async fn rebuild_root(&self, instance_id: &str, opts: &RebuildRoot) -> Result<String> {
        let instance = self.instance(instance_id).await?;
        let mut spec = Map::new();
        match (opts.keypair.as_deref(), opts.password.as_deref()) {
            (Some(k), _) if !k.is_empty() => spec.insert("keyname".into(), k.into()),
            (_, Some(p)) if !p.is_empty() => spec.insert("adminpass".into(), p.into()),
            _ => return Err(Error::Fatal("both password and publicKey are empty".to_owned())),
        };
        if let Some(ud) = opts.user_data.as_deref().filter(|s| !s.is_empty()) {
            spec.insert("metadata".into(), json!({"user_data": ud}));
        }
        if let Some(uid) = opts.user_id.as_deref().filter(|s| !s.is_empty()) {
            spec.insert("userid".into(), uid.into());
        }

        let change = opts
            .image_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != instance.metadata.image_id);
        let (action, body) = match change {
            Some(image_id) => {
                spec.insert("imageid".into(), image_id.into());
                ("changeos", json!({"os-change": spec}))
            }
            None => ("reinstallos", json!({"os-reinstall": spec})),
        };
        let resp = self
            .post(
                Service::EcsV2,
                &format!("cloudservers/{instance_id}/{action}"),
                &body,
            )
            .await
            .context(format!("{action} {instance_id}"))?;
        let job_id: String = decode(&resp, "job_id")?;
        WaitJob::builder(self, JobService::Ecs, &job_id)
            .interval(Duration::from_secs(15))
            .timeout(Duration::from_secs(900))
            .build()
            .wait()
            .await
            .context(format!("{action} {instance_id}"))?;

        let instance = self.instance(instance_id).await?;
        instance
            .root_disk_id()
            .map(str::to_owned)
            .ok_or_else(|| Error::NotFound(format!("root disk of instance {instance_id}")))
    }

    pub async fn instance_vnc(&self, instance_id: &str) -> Result<VncInfo> {
        let body = json!({"remote_console": {"type": "novnc", "protocol": "vnc"}});
        let resp = self
            .post(
                Service::Ecs,
                &format!("cloudservers/{instance_id}/remote_console"),
                &body,
            )
            .await
            .context(format!("get vnc of {instance_id}"))?;
        decode(&resp, "remote_console")
    }

    /// 设置为`secgroup_ids`，多余的移除，缺少的添加
    pub async fn set_instance_security_groups(&self, instance_id: &str, secgroup_ids: &[String]) -> Result<()> {
        let current = self.instance_security_group_ids(instance_id).await?;
        let diff = compare_set(&current, secgroup_ids);
        let resource = format!("servers/{instance_id}/action");
        for id in &diff.add {
            self.post(Service::EcsV2_1, &resource, &json!({"addSecurityGroup": {"name": id}}))
                .await
                .context(format!("assign security group {id} to {instance_id}"))?;
        }
        for id in &diff.remove {
            self.post(Service::EcsV2_1, &resource, &json!({"removeSecurityGroup": {"name": id}}))
                .await
                .context(format!("revoke security group {id} from {instance_id}"))?;
        }
        Ok(())
    }
    // endregion: --- update

    // region:    --- disks
    /// 挂载后等待磁盘变为`in-use`
    pub async fn attach_disk(&self, instance_id: &str, disk_id: &str) -> Result<()> {
        let instance = self.instance(instance_id).await?;
        let device = instance.next_device_name()?;
        let body = json!({"volumeAttachment": {"volumeId": disk_id, "device": device}});
        self.post(
            Service::Ecs,
            &format!("cloudservers/{instance_id}/attachvolume"),
            &body,
        )
        .await
        .context(format!("attach disk {disk_id} to {instance_id}"))?;
        self.wait_disk_status(disk_id, "in-use").await
    }

    /// 磁盘不在挂载列表中时视为成功
    pub async fn detach_disk(&self, instance_id: &str, disk_id: &str) -> Result<()> {
        let r = self
            .call(
                Method::DELETE,
                Service::Ecs,
                &format!("cloudservers/{instance_id}/detachvolume/{disk_id}"),
                &[],
                None,
            )
            .await;
        match r {
            Ok(_) => {}
            Err(e) if is_not_attached(&e) => {
                tracing::debug!(instance_id, disk_id, "disk already detached");
                return Ok(());
            }
            Err(e) => return Err(e).context(format!("detach disk {disk_id} from {instance_id}")),
        }
        self.wait_disk_status(disk_id, "available").await
    }

    async fn wait_disk_status(&self, disk_id: &str, status: &str) -> Result<()> {
        wait_until(
            Duration::from_secs(5),
            Duration::from_secs(60),
            &format!("disk {disk_id} to be {status}"),
            || async move { Ok::<_, Error>(self.disk(disk_id).await?.status == status) },
        )
        .await
    }
    // endregion: --- disks

    // region:    --- tags
    pub async fn create_instance_tags(&self, instance_id: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }
        let tags: Vec<Value> = tags
            .iter()
            .map(|(k, v)| json!({"key": k, "value": v}))
            .collect();
        self.post(
            Service::Ecs,
            &format!("cloudservers/{instance_id}/tags/action"),
            &json!({"action": "create", "tags": tags}),
        )
        .await
        .context(format!("create tags of {instance_id}"))?;
        Ok(())
    }

    pub async fn delete_instance_tags(&self, instance_id: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let tags: Vec<Value> = keys.iter().map(|k| json!({"key": k})).collect();
        self.post(
            Service::Ecs,
            &format!("cloudservers/{instance_id}/tags/action"),
            &json!({"action": "delete", "tags": tags}),
        )
        .await
        .context(format!("delete tags of {instance_id}"))?;
        Ok(())
    }

    /// `replace`为true时删除不在`tags`中的标签
    pub async fn set_instance_tags(
        &self,
        instance_id: &str,
        tags: &BTreeMap<String, String>,
        replace: bool,
    ) -> Result<()> {
        let current = self.instance(instance_id).await?.tags();
        let obsolete: Vec<String> = current
            .iter()
            .filter(|(k, v)| match tags.get(*k) {
                Some(new) => new != *v,
                None => replace,
            })
            .map(|(k, _)| k.clone())
            .collect();
        self.delete_instance_tags(instance_id, &obsolete).await?;
        let added: BTreeMap<String, String> = tags
            .iter()
            .filter(|(k, v)| current.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.create_instance_tags(instance_id, &added).await
    }
    // endregion: --- tags

    pub async fn renew_instance(&self, instance_id: &str, cycle: BillingCycle) -> Result<()> {
        self.client().renew_resource(instance_id, cycle).await
    }

    /// 由云主机创建私有镜像，返回镜像id
    pub async fn save_image(&self, instance_id: &str, name: &str, notes: Option<&str>) -> Result<String> {
        let mut body = json!({"name": name, "instance_id": instance_id});
        if let Some(notes) = notes.filter(|n| !n.is_empty()) {
            body["description"] = sanitize_description(notes, 1024).into();
        }
        let resp = self
            .post(Service::Ims, "cloudimages/action", &body)
            .await
            .context(format!("save image of {instance_id}"))?;
        let job_id: String = decode(&resp, "job_id")?;
        let job = WaitJob::builder(self, JobService::Ims, &job_id)
            .interval(Duration::from_secs(15))
            .timeout(Duration::from_secs(600))
            .build()
            .wait()
            .await
            .context(format!("save image of {instance_id}"))?;
        job.entity("image_id")
            .ok_or_else(|| Error::Fatal(format!("job {job_id} returned no image_id")))
    }

    /// 按可用区列出可用规格
    pub async fn instance_flavors(&self, zone_id: Option<&str>) -> Result<Vec<Value>> {
        let q = query(zone_id.map(|z| ("availability_zone", z)));
        let resp = self
            .get(Service::Ecs, "cloudservers/flavors", &q)
            .await
            .context("list flavors")?;
        decode(&resp, "flavors")
    }
}

fn is_not_attached(e: &Error) -> bool {
    let s = e.to_string();
    s.contains("is not in server") && s.contains("attach volume list")
}
