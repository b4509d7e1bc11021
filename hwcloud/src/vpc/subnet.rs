use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::NetworkStatus;
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub gateway_ip: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub dhcp_enable: bool,
    #[serde(default)]
    pub neutron_network_id: String,
    #[serde(default)]
    pub neutron_subnet_id: String,
    #[serde(rename = "dnsList", default)]
    pub dns_list: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Subnet {
    pub fn status(&self) -> NetworkStatus {
        NetworkStatus::from_vendor(&self.status)
    }
}

#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateSubnet<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    vpc_id: String,
    name: String,
    cidr: String,
    gateway_ip: String,
    zone_id: Option<String>,
    #[builder(default)]
    description: String,
}

impl CreateSubnet<'_> {
    pub async fn send(&self) -> Result<Subnet> {
        let mut subnet = json!({
            "name": self.name,
            "cidr": self.cidr,
            "gateway_ip": self.gateway_ip,
            "vpc_id": self.vpc_id,
            "dhcp_enable": true,
            "description": self.description,
        });
        if let Some(z) = self.zone_id.as_deref().filter(|z| !z.is_empty()) {
            subnet["availability_zone"] = z.into();
        }
        let resp = self
            .region
            .post(Service::Vpc, "subnets", &json!({ "subnet": subnet }))
            .await
            .context(format!("create subnet {}", self.name))?;
        decode(&resp, "subnet")
    }
}

impl Region {
    /// `vpc_id`为空时列出所有子网
    pub async fn subnets(&self, vpc_id: Option<&str>) -> Result<Vec<Subnet>> {
        let q = query(vpc_id.filter(|v| !v.is_empty()).map(|v| ("vpc_id", v)));
        self.list_all_as(Service::Vpc, "subnets", &q, &Paginator::marker("subnets", Some(1024)))
            .await
            .context("list subnets")
    }

    pub async fn subnet(&self, subnet_id: &str) -> Result<Subnet> {
        let resp = self
            .get(Service::Vpc, &format!("subnets/{subnet_id}"), &[])
            .await
            .context(format!("get subnet {subnet_id}"))?;
        decode(&resp, "subnet")
    }

    pub async fn delete_subnet(&self, vpc_id: &str, subnet_id: &str) -> Result<()> {
        self.delete(Service::Vpc, &format!("vpcs/{vpc_id}/subnets/{subnet_id}"))
            .await
            .context(format!("delete subnet {subnet_id}"))?;
        Ok(())
    }
}
