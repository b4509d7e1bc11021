//! 企业项目

use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{decode, decode_list};
use crate::service::Service;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct EnterpriseProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 1启用 2停用
    #[serde(default)]
    pub status: i64,
    /// prod / poc
    #[serde(rename = "type", default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl EnterpriseProject {
    pub fn is_enabled(&self) -> bool {
        self.status == 1
    }
}

impl HuaweiClient {
    /// 未开通企业项目时返回`NotSupported`
    pub async fn enterprise_projects(&self) -> Result<Vec<EnterpriseProject>> {
        let items = self
            .global_list_all(
                Service::Eps,
                "enterprise-projects",
                &[],
                &Paginator::offset("enterprise_projects", 1000).total_key("total_count"),
            )
            .await
            .context("list enterprise projects")?;
        decode_list(items)
    }

    pub async fn create_enterprise_project(&self, name: &str, desc: &str) -> Result<EnterpriseProject> {
        let body = json!({"name": name, "description": desc});
        let resp = self
            .global(Method::POST, Service::Eps, "enterprise-projects", &[], Some(&body))
            .await
            .context(format!("create enterprise project {name}"))?;
        decode(&resp, "enterprise_project")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_flag() {
        let p: EnterpriseProject = serde_json::from_value(json!({
            "id": "ep-1",
            "name": "prod",
            "status": 2,
            "type": "prod"
        }))
        .unwrap();
        assert!(!p.is_enabled());
        assert_eq!(p.project_type.as_deref(), Some("prod"));
    }
}
