//! 系统权限、自定义策略以及用户组授权

use crate::client::HuaweiClient;
use crate::endpoint::Project;
use crate::error::{Error, Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::decode_list;
use crate::service::Service;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// 所属服务目录，如`OBS`、`ECS`
    #[serde(default)]
    pub catalog: String,
    /// `AX`全局服务，`XA`项目级服务，`AA`两者皆有
    #[serde(rename = "type", default)]
    pub role_type: String,
    #[serde(default)]
    pub policy: Value,
}

impl Role {
    pub fn is_obs(&self) -> bool {
        self.catalog.eq_ignore_ascii_case("obs")
    }
}

/// 授权的作用范围
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleScope {
    Domain(String),
    Project(String),
}

impl RoleScope {
    fn path(&self, group_id: &str, role_id: &str) -> String {
        match self {
            RoleScope::Domain(d) => format!("domains/{d}/groups/{group_id}/roles/{role_id}"),
            RoleScope::Project(p) => format!("projects/{p}/groups/{group_id}/roles/{role_id}"),
        }
    }
}

/// 按角色类型决定在哪些范围授权
///
/// OBS相关的策略额外在`MOS`项目上授权
pub fn role_scopes(role: &Role, domain_id: &str, projects: &[Project]) -> Result<Vec<RoleScope>> {
    let per_project = || {
        projects
            .iter()
            .filter(|p| !p.is_mos())
            .map(|p| RoleScope::Project(p.id.clone()))
    };
    let mut scopes: Vec<RoleScope> = match role.role_type.as_str() {
        "AX" => vec![RoleScope::Domain(domain_id.to_owned())],
        "XA" => per_project().collect(),
        "AA" => std::iter::once(RoleScope::Domain(domain_id.to_owned()))
            .chain(per_project())
            .collect(),
        other => {
            return Err(Error::NotSupported(format!(
                "role {} has unsupported type `{other}`",
                role.name
            )));
        }
    };
    if role.is_obs() {
        scopes.extend(
            projects
                .iter()
                .filter(|p| p.is_mos())
                .map(|p| RoleScope::Project(p.id.clone())),
        );
    }
    Ok(scopes)
}

impl HuaweiClient {
    /// 系统权限
    pub async fn system_roles(&self) -> Result<Vec<Role>> {
        let items = self
            .global_list_all(
                Service::IamV3,
                "roles",
                &[],
                &Paginator::page_number("roles", 300)
                    .page_keys("page", "per_page")
                    .total_key("total_number"),
            )
            .await
            .context("list system roles")?;
        decode_list(items)
    }

    /// 自定义策略
    pub async fn custom_roles(&self) -> Result<Vec<Role>> {
        let items = self
            .global_list_all(
                Service::Iam,
                "OS-ROLE/roles",
                &[],
                &Paginator::page_number("roles", 300)
                    .page_keys("page", "per_page")
                    .total_key("total_number"),
            )
            .await
            .context("list custom roles")?;
        decode_list(items)
    }

    pub async fn role_by_name(&self, name: &str) -> Result<Role> {
        let mut all = self.system_roles().await?;
        all.extend(self.custom_roles().await?);
        all.into_iter()
            .find(|r| r.name == name || r.display_name == name)
            .ok_or_else(|| Error::NotFound(format!("role {name}")))
    }

    pub async fn attach_group_role(&self, group_id: &str, role: &Role) -> Result<()> {
        self.group_role(Method::PUT, group_id, role)
            .await
            .context(format!("attach role {} to group {group_id}", role.name))
    }

    pub async fn detach_group_role(&self, group_id: &str, role: &Role) -> Result<()> {
        self.group_role(Method::DELETE, group_id, role)
            .await
            .context(format!("detach role {} from group {group_id}", role.name))
    }

    async fn group_role(&self, method: Method, group_id: &str, role: &Role) -> Result<()> {
        let scopes = role_scopes(role, &self.account_id(), &self.projects())?;
        for scope in scopes {
            let path = scope.path(group_id, &role.id);
            match self.global(method.clone(), Service::IamV3, &path, &[], None).await {
                Ok(_) => {}
                // 解除不存在的授权视为成功
                Err(e) if method == Method::DELETE && e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(id: &str, name: &str) -> Project {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    fn role(t: &str, catalog: &str) -> Role {
        serde_json::from_value(json!({"id": "r", "name": "n", "type": t, "catalog": catalog})).unwrap()
    }

    #[test]
    fn scopes_follow_role_type() {
        let projects = [project("p1", "cn-north-4"), project("p2", "cn-east-3"), project("pm", "MOS")];
        assert_eq!(
            role_scopes(&role("AX", "IAM"), "d", &projects).unwrap(),
            vec![RoleScope::Domain("d".to_owned())]
        );
        assert_eq!(
            role_scopes(&role("XA", "ECS"), "d", &projects).unwrap(),
            vec![RoleScope::Project("p1".to_owned()), RoleScope::Project("p2".to_owned())]
        );
        assert_eq!(role_scopes(&role("AA", "ECS"), "d", &projects).unwrap().len(), 3);
        assert!(role_scopes(&role("XX", "ECS"), "d", &projects).is_err());
    }

    #[test]
    fn obs_roles_also_target_mos() {
        let projects = [project("p1", "cn-north-4"), project("pm", "MOS")];
        let scopes = role_scopes(&role("AX", "OBS"), "d", &projects).unwrap();
        assert_eq!(
            scopes,
            vec![RoleScope::Domain("d".to_owned()), RoleScope::Project("pm".to_owned())]
        );
        assert_eq!(scopes[1].path("g", "r"), "projects/pm/groups/g/roles/r");
    }
}
