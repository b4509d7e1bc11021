//! 弹性公网IP

use crate::error::{Error, Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::EipStatus;
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EipProfile {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub product_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Eip {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub public_ip_address: String,
    #[serde(default)]
    pub private_ip_address: String,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub bandwidth_id: String,
    #[serde(default)]
    pub bandwidth_name: String,
    /// Mbit/s
    #[serde(default)]
    pub bandwidth_size: u32,
    /// PER / WHOLE
    #[serde(default)]
    pub bandwidth_share_type: String,
    #[serde(rename = "type", default)]
    pub ip_type: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub profile: Option<EipProfile>,
}

impl Eip {
    pub fn status(&self) -> EipStatus {
        EipStatus::from_vendor(&self.status)
    }

    /// 包周期的EIP带有订单号
    pub fn is_prepaid(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| !p.order_id.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_owner: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub status: String,
}

/// 申请EIP，计费方式`traffic`(按流量)或`bandwidth`(按带宽)
#[derive(Builder)]
#[builder(on(String, into))]
pub struct AllocateEip<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    name: String,
    /// Mbit/s
    bandwidth: u32,
    #[builder(default = "traffic".to_owned())]
    charge_mode: String,
    #[builder(default = "5_bgp".to_owned())]
    ip_type: String,
    enterprise_project_id: Option<String>,
}

impl AllocateEip<'_> {
    pub async fn send(&self) -> Result<Eip> {
        let mut body = json!({
            "publicip": {"type": self.ip_type},
            "bandwidth": {
                "name": self.name,
                "size": self.bandwidth,
                "share_type": "PER",
                "charge_mode": self.charge_mode,
            },
        });
        if let Some(pid) = self.enterprise_project_id.as_deref().filter(|p| !p.is_empty()) {
            body["enterprise_project_id"] = pid.into();
        }
        let resp = self
            .region
            .post(Service::Vpc, "publicips", &body)
            .await
            .context(format!("allocate eip {}", self.name))?;
        decode(&resp, "publicip")
    }
}

impl Region {
    pub async fn eips(&self) -> Result<Vec<Eip>> {
        self.list_all_as(Service::Vpc, "publicips", &[], &Paginator::marker("publicips", Some(1000)))
            .await
            .context("list eips")
    }

    pub async fn eip(&self, eip_id: &str) -> Result<Eip> {
        let resp = self
            .get(Service::Vpc, &format!("publicips/{eip_id}"), &[])
            .await
            .context(format!("get eip {eip_id}"))?;
        decode(&resp, "publicip")
    }

    pub async fn delete_eip(&self, eip_id: &str) -> Result<()> {
        self.delete(Service::Vpc, &format!("publicips/{eip_id}"))
            .await
            .context(format!("delete eip {eip_id}"))?;
        Ok(())
    }

    pub async fn ports(&self, device_id: &str) -> Result<Vec<Port>> {
        let resp = self
            .get(Service::Vpc, "ports", &query([("device_id", device_id)]))
            .await
            .context(format!("list ports of {device_id}"))?;
        decode(&resp, "ports")
    }

    /// 绑定到实例的第一块网卡
    pub async fn associate_eip(&self, eip_id: &str, instance_id: &str) -> Result<()> {
        let port = self
            .ports(instance_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("port of instance {instance_id}")))?;
        self.set_eip_port(eip_id, json!(port.id))
            .await
            .context(format!("associate eip {eip_id} with {instance_id}"))
    }

    pub async fn dissociate_eip(&self, eip_id: &str) -> Result<()> {
        self.set_eip_port(eip_id, Value::Null)
            .await
            .context(format!("dissociate eip {eip_id}"))
    }

    async fn set_eip_port(&self, eip_id: &str, port_id: Value) -> Result<()> {
        let body = json!({"publicip": {"port_id": port_id}});
        self.put(Service::Vpc, &format!("publicips/{eip_id}"), &body).await?;
        Ok(())
    }

    pub async fn change_eip_bandwidth(&self, eip_id: &str, bandwidth: u32) -> Result<()> {
        let eip = self.eip(eip_id).await?;
        let body = json!({"bandwidth": {"size": bandwidth}});
        self.put(Service::Vpc, &format!("bandwidths/{}", eip.bandwidth_id), &body)
            .await
            .context(format!("change bandwidth of eip {eip_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip_from_json() {
        let eip: Eip = serde_json::from_value(json!({
            "id": "eip-1",
            "status": "PENDING_UPDATE",
            "public_ip_address": "1.2.3.4",
            "port_id": null,
            "bandwidth_size": 5,
            "type": "5_bgp",
            "profile": {"order_id": "CS2101"}
        }))
        .unwrap();
        assert_eq!(eip.status(), EipStatus::Associating);
        assert!(eip.port_id.is_none());
        assert!(eip.is_prepaid());
        assert_eq!(eip.ip_type, "5_bgp");
    }
}
