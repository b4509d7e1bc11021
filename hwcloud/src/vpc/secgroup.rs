//! 安全组(VPC v3)

use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::transport::query;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub security_group_rules: Vec<SecurityGroupRule>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SecurityGroupRule {
    pub id: String,
    #[serde(default)]
    pub security_group_id: String,
    /// ingress / egress
    #[serde(default)]
    pub direction: String,
    /// IPv4 / IPv6
    #[serde(default)]
    pub ethertype: String,
    /// 为空表示全部协议
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub multiport: String,
    #[serde(default)]
    pub remote_ip_prefix: String,
    /// allow / deny
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub description: String,
}

/// 新增规则
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct RuleSpec {
    pub direction: String,
    pub ethertype: Option<String>,
    pub protocol: Option<String>,
    pub multiport: Option<String>,
    pub remote_ip_prefix: Option<String>,
    pub action: Option<String>,
    pub priority: Option<u32>,
    pub description: Option<String>,
}

impl Region {
    pub async fn security_groups(&self) -> Result<Vec<SecurityGroup>> {
        self.list_all_as(
            Service::VpcV3,
            "vpc/security-groups",
            &[],
            &Paginator::marker("security_groups", Some(2000)),
        )
        .await
        .context("list security groups")
    }

    pub async fn security_group(&self, secgroup_id: &str) -> Result<SecurityGroup> {
        let resp = self
            .get(Service::VpcV3, &format!("vpc/security-groups/{secgroup_id}"), &[])
            .await
            .context(format!("get security group {secgroup_id}"))?;
        decode(&resp, "security_group")
    }

    /// 企业项目为空时使用默认项目`0`
    pub async fn create_security_group(
        &self,
        name: &str,
        desc: &str,
        enterprise_project_id: Option<&str>,
    ) -> Result<SecurityGroup> {
        let pid = enterprise_project_id.filter(|p| !p.is_empty()).unwrap_or("0");
        let body = json!({"security_group": {
            "name": name,
            "description": desc,
            "enterprise_project_id": pid,
        }});
        let resp = self
            .post(Service::VpcV3, "vpc/security-groups", &body)
            .await
            .context(format!("create security group {name}"))?;
        decode(&resp, "security_group")
    }

    pub async fn delete_security_group(&self, secgroup_id: &str) -> Result<()> {
        self.delete(Service::VpcV3, &format!("vpc/security-groups/{secgroup_id}"))
            .await
            .context(format!("delete security group {secgroup_id}"))?;
        Ok(())
    }

    pub async fn security_group_rules(&self, secgroup_id: &str) -> Result<Vec<SecurityGroupRule>> {
        self.list_all_as(
            Service::VpcV3,
            "vpc/security-group-rules",
            &query([("security_group_id", secgroup_id)]),
            &Paginator::marker("security_group_rules", Some(2000)),
        )
        .await
        .context(format!("list rules of {secgroup_id}"))
    }

    pub async fn create_security_group_rule(
        &self,
        secgroup_id: &str,
        rule: &RuleSpec,
    ) -> Result<SecurityGroupRule> {
        let mut spec = serde_json::to_value(rule)?;
        spec["security_group_id"] = secgroup_id.into();
        let resp = self
            .post(
                Service::VpcV3,
                "vpc/security-group-rules",
                &json!({ "security_group_rule": spec }),
            )
            .await
            .context(format!("add rule to {secgroup_id}"))?;
        decode(&resp, "security_group_rule")
    }

    pub async fn delete_security_group_rule(&self, rule_id: &str) -> Result<()> {
        self.delete(Service::VpcV3, &format!("vpc/security-group-rules/{rule_id}"))
            .await
            .context(format!("delete security group rule {rule_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_spec_skips_none() {
        let r = RuleSpec {
            direction: "ingress".to_owned(),
            protocol: Some("tcp".to_owned()),
            multiport: Some("22,80-90".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"direction": "ingress", "protocol": "tcp", "multiport": "22,80-90"})
        );
    }
}
