use super::User;
use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::region::decode;
use crate::service::Service;
use crate::transport::query;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(rename = "createTime", default)]
    pub create_time: Option<i64>,
}

impl HuaweiClient {
    pub async fn groups(&self) -> Result<Vec<Group>> {
        let resp = self
            .global(
                Method::GET,
                Service::IamV3,
                "groups",
                &query([("domain_id", self.account_id())]),
                None,
            )
            .await
            .context("list groups")?;
        decode(&resp, "groups")
    }

    pub async fn group(&self, group_id: &str) -> Result<Group> {
        let resp = self
            .global_get(Service::IamV3, &format!("groups/{group_id}"))
            .await
            .context(format!("get group {group_id}"))?;
        decode(&resp, "group")
    }

    pub async fn create_group(&self, name: &str, desc: &str) -> Result<Group> {
        let body = json!({"group": {
            "name": name,
            "description": desc,
            "domain_id": self.account_id(),
        }});
        let resp = self
            .global(Method::POST, Service::IamV3, "groups", &[], Some(&body))
            .await
            .context(format!("create group {name}"))?;
        decode(&resp, "group")
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.global(Method::DELETE, Service::IamV3, &format!("groups/{group_id}"), &[], None)
            .await
            .context(format!("delete group {group_id}"))?;
        Ok(())
    }

    pub async fn group_users(&self, group_id: &str) -> Result<Vec<User>> {
        let resp = self
            .global_get(Service::IamV3, &format!("groups/{group_id}/users"))
            .await
            .context(format!("list users of group {group_id}"))?;
        decode(&resp, "users")
    }

    pub async fn user_groups(&self, user_id: &str) -> Result<Vec<Group>> {
        let resp = self
            .global_get(Service::IamV3, &format!("users/{user_id}/groups"))
            .await
            .context(format!("list groups of user {user_id}"))?;
        decode(&resp, "groups")
    }

    pub async fn add_group_user(&self, group_id: &str, user_id: &str) -> Result<()> {
        self.global(
            Method::PUT,
            Service::IamV3,
            &format!("groups/{group_id}/users/{user_id}"),
            &[],
            None,
        )
        .await
        .context(format!("add user {user_id} to group {group_id}"))?;
        Ok(())
    }

    pub async fn remove_group_user(&self, group_id: &str, user_id: &str) -> Result<()> {
        self.global(
            Method::DELETE,
            Service::IamV3,
            &format!("groups/{group_id}/users/{user_id}"),
            &[],
            None,
        )
        .await
        .context(format!("remove user {user_id} from group {group_id}"))?;
        Ok(())
    }
}
