use crate::bss::BillingCycle;
use crate::error::{Error, Result, ResultExt};
use crate::job::{JobService, JobSubmitted, WaitJob};
use crate::region::Region;
use crate::service::Service;
use bon::Builder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

const PRE_PAID: &str = "prePaid";
const POST_PAID: &str = "postPaid";

// region:    --- request body
#[derive(Serialize, Debug, Clone)]
pub struct DiskSpec {
    #[serde(rename = "volumetype")]
    pub volume_type: String,
    /// GB
    pub size: u32,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Default)]
struct ServerExtendParam<'a> {
    #[serde(rename = "chargingMode")]
    charging_mode: &'a str,
    #[serde(rename = "periodType")]
    period_type: Option<&'a str>,
    #[serde(rename = "periodNum")]
    period_num: Option<String>,
    #[serde(rename = "isAutoRenew")]
    is_auto_renew: Option<&'a str>,
    #[serde(rename = "isAutoPay")]
    is_auto_pay: Option<&'a str>,
    #[serde(rename = "regionID")]
    region_id: Option<&'a str>,
    enterprise_project_id: Option<&'a str>,
}

#[derive(Serialize, Debug)]
struct IdRef<'a> {
    id: &'a str,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug)]
struct Nic<'a> {
    subnet_id: &'a str,
    ip_address: Option<&'a str>,
}

#[derive(Serialize, Debug)]
struct ServerTag<'a> {
    key: &'a str,
    value: &'a str,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug)]
struct ServerCreate<'a> {
    availability_zone: &'a str,
    name: &'a str,
    #[serde(rename = "imageRef")]
    image_ref: &'a str,
    root_volume: &'a DiskSpec,
    data_volumes: &'a [DiskSpec],
    #[serde(rename = "flavorRef")]
    flavor_ref: &'a str,
    user_data: Option<&'a str>,
    vpcid: &'a str,
    security_groups: Vec<IdRef<'a>>,
    nics: Vec<Nic<'a>>,
    key_name: Option<&'a str>,
    #[serde(rename = "adminPass")]
    admin_pass: Option<&'a str>,
    count: u32,
    extendparam: ServerExtendParam<'a>,
    server_tags: Vec<ServerTag<'a>>,
    description: Option<&'a str>,
    metadata: BTreeMap<&'a str, String>,
}
// endregion: --- request body

/// 创建云主机，完成后返回云主机id
///
/// 第一块磁盘为系统盘，其余为数据盘
#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateInstance<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    name: String,
    image_id: String,
    instance_type: String,
    zone_id: String,
    vpc_id: String,
    subnet_id: String,
    #[builder(default)]
    security_group_ids: Vec<String>,
    disks: Vec<DiskSpec>,
    ip_addr: Option<String>,
    keypair: Option<String>,
    password: Option<String>,
    user_data: Option<String>,
    description: Option<String>,
    /// 不设置时为按需计费
    billing_cycle: Option<BillingCycle>,
    enterprise_project_id: Option<String>,
    #[builder(default)]
    tags: BTreeMap<String, String>,
    #[builder(default = Duration::from_secs(1800))]
    timeout: Duration,
}

impl CreateInstance<'_> {
    fn body(&self, owner_id: &str) -> Result<serde_json::Value> {
        let (root, data) = self
            .disks
            .split_first()
            .ok_or_else(|| Error::Fatal("system disk is required".to_owned()))?;

        let mut extendparam = ServerExtendParam {
            charging_mode: POST_PAID,
            enterprise_project_id: self.enterprise_project_id.as_deref().filter(|s| !s.is_empty()),
            ..Default::default()
        };
        let mut metadata = BTreeMap::new();
        if let Some(bc) = &self.billing_cycle {
            let (period_type, period_num) = bc.create_period();
            extendparam.charging_mode = PRE_PAID;
            extendparam.period_type = Some(period_type);
            extendparam.period_num = Some(period_num.to_string());
            extendparam.region_id = Some(self.region.id());
            extendparam.is_auto_renew = Some(if bc.auto_renew { "true" } else { "false" });
            extendparam.is_auto_pay = Some("true");
            metadata.insert("op_svc_userid", owner_id.to_owned());
        }

        let keypair = self.keypair.as_deref().filter(|s| !s.is_empty());
        let server = ServerCreate {
            availability_zone: &self.zone_id,
            name: &self.name,
            image_ref: &self.image_id,
            root_volume: root,
            data_volumes: data,
            flavor_ref: &self.instance_type,
            user_data: self.user_data.as_deref().filter(|s| !s.is_empty()),
            vpcid: &self.vpc_id,
            security_groups: self
                .security_group_ids
                .iter()
                .map(|id| IdRef { id })
                .collect(),
            nics: vec![Nic {
                subnet_id: &self.subnet_id,
                ip_address: self.ip_addr.as_deref().filter(|s| !s.is_empty()),
            }],
            admin_pass: if keypair.is_none() { self.password.as_deref() } else { None },
            key_name: keypair,
            count: 1,
            extendparam,
            server_tags: self
                .tags
                .iter()
                .map(|(key, value)| ServerTag { key, value })
                .collect(),
            description: self.description.as_deref(),
            metadata,
        };
        Ok(serde_json::json!({ "server": server }))
    }

    pub async fn send(&self) -> Result<String> {
        let owner_id = self.region.client().account_id();
        let body = self.body(&owner_id)?;
        let resp = self
            .region
            .post(Service::EcsV1_1, "cloudservers", &body)
            .await
            .context(format!("create instance {}", self.name))?;
        let submitted: JobSubmitted = serde_json::from_value(resp)?;
        let job = WaitJob::builder(self.region, JobService::Ecs, &submitted.job_id)
            .interval(Duration::from_secs(10))
            .timeout(self.timeout)
            .build()
            .wait()
            .await
            .context(format!("create instance {}", self.name))?;

        // 子任务中还包含磁盘id，只取云主机
        let ids: Vec<String> = job
            .entities
            .get("sub_jobs")
            .and_then(|v| v.as_array())
            .into_iter()
            .flatten()
            .filter_map(|j| j.pointer("/entities/server_id")?.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        match ids.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(Error::Fatal(format!(
                "create instance job {} result is empty",
                submitted.job_id
            ))),
            _ => Err(Error::DuplicateId(format!(
                "create instance job {} returned multiple instance ids: {ids:?}",
                submitted.job_id
            ))),
        }
    }
}
