use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::VpcStatus;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub nexthop: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Vpc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl Vpc {
    pub fn status(&self) -> VpcStatus {
        VpcStatus::from_vendor(&self.status)
    }

    /// 企业项目`0`为默认项目
    pub fn project_id(&self) -> &str {
        if self.enterprise_project_id == "0" {
            ""
        } else {
            &self.enterprise_project_id
        }
    }
}

impl Region {
    pub async fn vpcs(&self) -> Result<Vec<Vpc>> {
        self.list_all_as(Service::Vpc, "vpcs", &[], &Paginator::marker("vpcs", Some(1024)))
            .await
            .context("list vpcs")
    }

    pub async fn vpc(&self, vpc_id: &str) -> Result<Vpc> {
        let resp = self
            .get(Service::Vpc, &format!("vpcs/{vpc_id}"), &[])
            .await
            .context(format!("get vpc {vpc_id}"))?;
        decode(&resp, "vpc")
    }

    pub async fn create_vpc(&self, name: &str, cidr: &str, desc: &str) -> Result<Vpc> {
        let body = json!({"vpc": {"name": name, "cidr": cidr, "description": desc}});
        let resp = self
            .post(Service::Vpc, "vpcs", &body)
            .await
            .context(format!("create vpc {name}"))?;
        decode(&resp, "vpc")
    }

    pub async fn update_vpc(&self, vpc_id: &str, name: &str, desc: &str) -> Result<()> {
        let body = json!({"vpc": {"name": name, "description": desc}});
        self.put(Service::Vpc, &format!("vpcs/{vpc_id}"), &body)
            .await
            .context(format!("update vpc {vpc_id}"))?;
        Ok(())
    }

    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.delete(Service::Vpc, &format!("vpcs/{vpc_id}"))
            .await
            .context(format!("delete vpc {vpc_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vpc_status_and_project() {
        let v: Vpc = serde_json::from_value(json!({
            "id": "vpc-1", "status": "CREATING", "enterprise_project_id": "0"
        }))
        .unwrap();
        assert_eq!(v.status(), VpcStatus::Pending);
        assert_eq!(v.project_id(), "");
    }
}
