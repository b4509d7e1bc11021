use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::region::decode;
use crate::service::Service;
use crate::transport::query;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct AccessKey {
    pub access: String,
    #[serde(default)]
    pub user_id: String,
    /// active / inactive
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub create_time: String,
}

/// 只在创建时返回secret
#[derive(Clone, Deserialize)]
pub struct NewAccessKey {
    pub access: String,
    pub secret: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub create_time: String,
}

impl std::fmt::Debug for NewAccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccessKey")
            .field("access", &self.access)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl HuaweiClient {
    pub async fn access_keys(&self, user_id: &str) -> Result<Vec<AccessKey>> {
        let resp = self
            .global(
                Method::GET,
                Service::Iam,
                "OS-CREDENTIAL/credentials",
                &query([("user_id", user_id)]),
                None,
            )
            .await
            .context(format!("list access keys of {user_id}"))?;
        decode(&resp, "credentials")
    }

    pub async fn create_access_key(&self, user_id: &str, desc: &str) -> Result<NewAccessKey> {
        let body = json!({"credential": {"user_id": user_id, "description": desc}});
        let resp = self
            .global(Method::POST, Service::Iam, "OS-CREDENTIAL/credentials", &[], Some(&body))
            .await
            .context(format!("create access key for {user_id}"))?;
        decode(&resp, "credential")
    }

    pub async fn delete_access_key(&self, access_key: &str) -> Result<()> {
        self.global(
            Method::DELETE,
            Service::Iam,
            &format!("OS-CREDENTIAL/credentials/{access_key}"),
            &[],
            None,
        )
        .await
        .context(format!("delete access key {access_key}"))?;
        Ok(())
    }
}
