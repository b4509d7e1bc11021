//! NAT网关以及SNAT/DNAT规则

use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::NatStatus;
use crate::transport::query;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct NatGateway {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 1小型 2中型 3大型 4超大型
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub router_id: String,
    #[serde(default)]
    pub internal_network_id: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl NatGateway {
    pub fn status(&self) -> NatStatus {
        NatStatus::from_vendor(&self.status)
    }

    /// router_id即VPC id
    pub fn vpc_id(&self) -> &str {
        &self.router_id
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SnatRule {
    pub id: String,
    #[serde(default)]
    pub nat_gateway_id: String,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub floating_ip_id: String,
    #[serde(default)]
    pub floating_ip_address: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DnatRule {
    pub id: String,
    #[serde(default)]
    pub nat_gateway_id: String,
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub internal_service_port: u16,
    #[serde(default)]
    pub floating_ip_id: String,
    #[serde(default)]
    pub floating_ip_address: String,
    #[serde(default)]
    pub external_service_port: u16,
    /// tcp / udp / any
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub status: String,
}

/// DNAT端口映射
#[derive(Clone, Debug)]
pub struct DnatSpec {
    pub private_ip: String,
    pub internal_port: u16,
    pub eip_id: String,
    pub external_port: u16,
    pub protocol: String,
}

impl Region {
    pub async fn nat_gateways(&self) -> Result<Vec<NatGateway>> {
        self.list_all_as(
            Service::Nat,
            "nat_gateways",
            &[],
            &Paginator::marker("nat_gateways", Some(2000)),
        )
        .await
        .context("list nat gateways")
    }

    pub async fn nat_gateway(&self, nat_id: &str) -> Result<NatGateway> {
        let resp = self
            .get(Service::Nat, &format!("nat_gateways/{nat_id}"), &[])
            .await
            .context(format!("get nat gateway {nat_id}"))?;
        decode(&resp, "nat_gateway")
    }

    pub async fn delete_nat_gateway(&self, nat_id: &str) -> Result<()> {
        self.delete(Service::Nat, &format!("nat_gateways/{nat_id}"))
            .await
            .context(format!("delete nat gateway {nat_id}"))?;
        Ok(())
    }

    pub async fn snat_rules(&self, nat_id: &str) -> Result<Vec<SnatRule>> {
        self.list_all_as(
            Service::Nat,
            "snat_rules",
            &query([("nat_gateway_id", nat_id)]),
            &Paginator::marker("snat_rules", Some(2000)),
        )
        .await
        .context(format!("list snat rules of {nat_id}"))
    }

    pub async fn dnat_rules(&self, nat_id: &str) -> Result<Vec<DnatRule>> {
        self.list_all_as(
            Service::Nat,
            "dnat_rules",
            &query([("nat_gateway_id", nat_id)]),
            &Paginator::marker("dnat_rules", Some(2000)),
        )
        .await
        .context(format!("list dnat rules of {nat_id}"))
    }

    /// `source`为子网id或CIDR
    pub async fn create_snat_rule(&self, nat_id: &str, source: &str, eip_id: &str) -> Result<SnatRule> {
        let mut rule = json!({"nat_gateway_id": nat_id, "floating_ip_id": eip_id});
        if source.contains('/') {
            rule["cidr"] = source.into();
            rule["source_type"] = 0.into();
        } else {
            rule["network_id"] = source.into();
        }
        let resp = self
            .post(Service::Nat, "snat_rules", &json!({ "snat_rule": rule }))
            .await
            .context(format!("create snat rule on {nat_id}"))?;
        decode(&resp, "snat_rule")
    }

    pub async fn create_dnat_rule(&self, nat_id: &str, spec: &DnatSpec) -> Result<DnatRule> {
        let rule = json!({
            "nat_gateway_id": nat_id,
            "private_ip": spec.private_ip,
            "internal_service_port": spec.internal_port,
            "floating_ip_id": spec.eip_id,
            "external_service_port": spec.external_port,
            "protocol": spec.protocol.to_ascii_lowercase(),
        });
        let resp = self
            .post(Service::Nat, "dnat_rules", &json!({ "dnat_rule": rule }))
            .await
            .context(format!("create dnat rule on {nat_id}"))?;
        decode(&resp, "dnat_rule")
    }

    pub async fn delete_snat_rule(&self, nat_id: &str, rule_id: &str) -> Result<()> {
        self.delete(Service::Nat, &format!("nat_gateways/{nat_id}/snat_rules/{rule_id}"))
            .await
            .context(format!("delete snat rule {rule_id}"))?;
        Ok(())
    }

    pub async fn delete_dnat_rule(&self, nat_id: &str, rule_id: &str) -> Result<()> {
        self.delete(Service::Nat, &format!("nat_gateways/{nat_id}/dnat_rules/{rule_id}"))
            .await
            .context(format!("delete dnat rule {rule_id}"))?;
        Ok(())
    }
}
