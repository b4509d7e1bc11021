use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::region::decode;
use crate::service::Service;
use crate::transport::query;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub pwd_status: Option<bool>,
    #[serde(default)]
    pub last_login_time: Option<String>,
}

/// 新建的IAM用户，`password`为空时用户只能通过AK/SK或联邦认证访问
#[derive(Clone, Debug, Default)]
pub struct CreateUser {
    pub name: String,
    pub password: Option<String>,
    pub email: Option<String>,
    pub description: String,
}

impl HuaweiClient {
    pub async fn users(&self) -> Result<Vec<User>> {
        let resp = self
            .global(
                Method::GET,
                Service::IamV3,
                "users",
                &query([("domain_id", self.account_id())]),
                None,
            )
            .await
            .context("list users")?;
        decode(&resp, "users")
    }

    pub async fn user(&self, user_id: &str) -> Result<User> {
        let resp = self
            .global_get(Service::IamV3, &format!("users/{user_id}"))
            .await
            .context(format!("get user {user_id}"))?;
        decode(&resp, "user")
    }

    /// 用户名不合法时返回[`crate::Error`]的`InvalidName`
    pub async fn create_user(&self, opts: &CreateUser) -> Result<User> {
        let mut user = json!({
            "name": opts.name,
            "domain_id": self.account_id(),
            "enabled": true,
            "description": opts.description,
        });
        if let Some(p) = opts.password.as_deref().filter(|p| !p.is_empty()) {
            user["password"] = p.into();
        }
        if let Some(e) = opts.email.as_deref().filter(|e| !e.is_empty()) {
            user["email"] = e.into();
        }
        let resp = self
            .global(
                Method::POST,
                Service::Iam,
                "OS-USER/users",
                &[],
                Some(&json!({ "user": user })),
            )
            .await
            .context(format!("create user {}", opts.name))?;
        decode(&resp, "user")
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.global(Method::DELETE, Service::IamV3, &format!("users/{user_id}"), &[], None)
            .await
            .context(format!("delete user {user_id}"))?;
        Ok(())
    }

    pub async fn reset_user_password(&self, user_id: &str, password: &str) -> Result<()> {
        let body = json!({"user": {"password": password}});
        self.global(
            Method::PUT,
            Service::Iam,
            &format!("OS-USER/users/{user_id}"),
            &[],
            Some(&body),
        )
        .await
        .context(format!("reset password of user {user_id}"))?;
        Ok(())
    }
}
