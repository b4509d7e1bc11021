use super::{ELB_PAGE, IdRef};
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AclEntry {
    /// IP地址或CIDR
    pub ip: String,
    #[serde(default)]
    pub description: String,
}

/// 访问控制的IP地址组，通过监听器的`ipgroup`字段关联
#[derive(Clone, Debug, Deserialize)]
pub struct LbAcl {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ip_list: Vec<AclEntry>,
    #[serde(default)]
    pub listeners: Vec<IdRef>,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl LbAcl {
    pub fn cidrs(&self) -> Vec<&str> {
        self.ip_list.iter().map(|e| e.ip.as_str()).collect()
    }

    pub fn is_bound_to(&self, listener_id: &str) -> bool {
        self.listeners.iter().any(|l| l.id == listener_id)
    }
}

#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateLbAcl<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    name: String,
    #[builder(default)]
    entries: Vec<AclEntry>,
    #[builder(default)]
    description: String,
    enterprise_project_id: Option<String>,
}

impl CreateLbAcl<'_> {
    pub async fn send(&self) -> Result<LbAcl> {
        let mut ipgroup = json!({
            "name": self.name,
            "description": self.description,
            "ip_list": self.entries,
        });
        if let Some(ep) = self.enterprise_project_id.as_deref().filter(|s| !s.is_empty()) {
            ipgroup["enterprise_project_id"] = ep.into();
        }
        let resp = self
            .region
            .post(Service::Elb, "elb/ipgroups", &json!({ "ipgroup": ipgroup }))
            .await
            .context(format!("create elb ipgroup {}", self.name))?;
        decode(&resp, "ipgroup")
    }
}

impl Region {
    pub async fn lb_acls(&self) -> Result<Vec<LbAcl>> {
        self.list_all_as(
            Service::Elb,
            "elb/ipgroups",
            &[],
            &Paginator::next_marker("ipgroups", Some(ELB_PAGE)),
        )
        .await
        .context("list elb ipgroups")
    }

    pub async fn lb_acl(&self, acl_id: &str) -> Result<LbAcl> {
        let resp = self
            .get(Service::Elb, &format!("elb/ipgroups/{acl_id}"), &[])
            .await
            .context(format!("get elb ipgroup {acl_id}"))?;
        decode(&resp, "ipgroup")
    }

    /// 监听器关联的地址组，未关联时返回`None`
    pub async fn listener_acl(&self, listener_id: &str) -> Result<Option<LbAcl>> {
        let acls = self.lb_acls().await?;
        Ok(acls.into_iter().find(|a| a.is_bound_to(listener_id)))
    }

    pub fn create_lb_acl(&self) -> CreateLbAclBuilder<'_> {
        CreateLbAcl::builder(self)
    }

    pub async fn delete_lb_acl(&self, acl_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/ipgroups/{acl_id}"))
            .await
            .context(format!("delete elb ipgroup {acl_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_from_json() {
        let acl: LbAcl = serde_json::from_value(json!({
            "id": "ipg-1",
            "name": "office",
            "ip_list": [{"ip": "10.0.0.0/24", "description": "lan"}, {"ip": "1.1.1.1"}],
            "listeners": [{"id": "ls-1"}]
        }))
        .unwrap();
        assert_eq!(acl.cidrs(), ["10.0.0.0/24", "1.1.1.1"]);
        assert!(acl.is_bound_to("ls-1"));
        assert!(!acl.is_bound_to("ls-2"));
    }
}
