//! SAML身份提供商
//!
//! 配置顺序: 创建身份提供商 -> 上传元数据 -> 创建映射 -> 注册协议

use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::region::decode;
use crate::service::Service;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

pub const SAML_PROTOCOL: &str = "saml";

#[derive(Clone, Debug, Deserialize)]
pub struct IdentityProvider {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    /// virtual_user_sso / iam_user_sso
    #[serde(default)]
    pub sso_type: String,
    #[serde(default)]
    pub remote_ids: Vec<String>,
}

impl IdentityProvider {
    /// SP发起的登录地址
    pub fn login_url(&self, domain_id: &str) -> String {
        format!(
            "https://auth.huaweicloud.com/authui/federation/websso?domain_id={domain_id}&idp={}&protocol={SAML_PROTOCOL}",
            self.id
        )
    }
}

/// 把断言中的`Name`映射为用户名，`Groups`中的每一项映射为同名用户组
pub fn default_mapping_rules() -> Value {
    json!([{
        "local": [
            {"user": {"name": "{0}"}},
            {"groups": "{1}"}
        ],
        "remote": [
            {"type": "Name"},
            {"type": "Groups"}
        ]
    }])
}

impl HuaweiClient {
    pub async fn identity_providers(&self) -> Result<Vec<IdentityProvider>> {
        let resp = self
            .global_get(Service::IamV3, "OS-FEDERATION/identity_providers")
            .await
            .context("list identity providers")?;
        decode(&resp, "identity_providers")
    }

    pub async fn identity_provider(&self, idp_id: &str) -> Result<IdentityProvider> {
        let resp = self
            .global_get(Service::IamV3, &format!("OS-FEDERATION/identity_providers/{idp_id}"))
            .await
            .context(format!("get identity provider {idp_id}"))?;
        decode(&resp, "identity_provider")
    }

    /// 创建身份提供商并完成元数据、映射和协议的配置
    pub async fn create_saml_provider(&self, name: &str, metadata: &str, desc: &str) -> Result<IdentityProvider> {
        let body = json!({"identity_provider": {
            "sso_type": "virtual_user_sso",
            "description": desc,
            "enabled": true,
        }});
        let resp = self
            .global(
                Method::PUT,
                Service::IamV3,
                &format!("OS-FEDERATION/identity_providers/{name}"),
                &[],
                Some(&body),
            )
            .await
            .context(format!("create identity provider {name}"))?;
        let idp: IdentityProvider = decode(&resp, "identity_provider")?;
        self.update_saml_metadata(&idp.id, metadata).await?;
        self.set_saml_mapping(&idp.id, &default_mapping_rules()).await?;
        self.register_saml_protocol(&idp.id).await?;
        Ok(idp)
    }

    pub async fn saml_metadata(&self, idp_id: &str) -> Result<String> {
        let resp = self
            .global_get(
                Service::IamV3Ext,
                &format!("OS-FEDERATION/identity_providers/{idp_id}/protocols/{SAML_PROTOCOL}/metadata"),
            )
            .await
            .context(format!("get metadata of identity provider {idp_id}"))?;
        Ok(resp
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    pub async fn update_saml_metadata(&self, idp_id: &str, metadata: &str) -> Result<()> {
        let body = json!({
            "domain_id": self.account_id(),
            "metadata": metadata,
            "xaccount_type": "",
        });
        self.global(
            Method::POST,
            Service::IamV3Ext,
            &format!("OS-FEDERATION/identity_providers/{idp_id}/protocols/{SAML_PROTOCOL}/metadata"),
            &[],
            Some(&body),
        )
        .await
        .context(format!("upload metadata of identity provider {idp_id}"))?;
        Ok(())
    }

    /// 映射id与身份提供商id相同
    pub async fn set_saml_mapping(&self, idp_id: &str, rules: &Value) -> Result<()> {
        let body = json!({"mapping": {"rules": rules}});
        let path = format!("OS-FEDERATION/mappings/{idp_id}");
        let exists = match self.global_get(Service::IamV3, &path).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e).context(format!("get mapping {idp_id}")),
        };
        let method = if exists { Method::PATCH } else { Method::PUT };
        self.global(method, Service::IamV3, &path, &[], Some(&body))
            .await
            .context(format!("set mapping {idp_id}"))?;
        Ok(())
    }

    pub async fn register_saml_protocol(&self, idp_id: &str) -> Result<()> {
        let body = json!({"protocol": {"mapping_id": idp_id}});
        let path = format!("OS-FEDERATION/identity_providers/{idp_id}/protocols/{SAML_PROTOCOL}");
        match self
            .global(Method::PUT, Service::IamV3, &path, &[], Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            // 协议已存在
            Err(e) if e.report().is_some_and(|r| r.status == 409) => Ok(()),
            Err(e) => Err(e).context(format!("register protocol of {idp_id}")),
        }
    }

    pub async fn delete_identity_provider(&self, idp_id: &str) -> Result<()> {
        self.global(
            Method::DELETE,
            Service::IamV3,
            &format!("OS-FEDERATION/identity_providers/{idp_id}"),
            &[],
            None,
        )
        .await
        .context(format!("delete identity provider {idp_id}"))?;
        match self
            .global(
                Method::DELETE,
                Service::IamV3,
                &format!("OS-FEDERATION/mappings/{idp_id}"),
                &[],
                None,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e).context(format!("delete mapping {idp_id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_and_rules() {
        let idp: IdentityProvider = serde_json::from_value(json!({"id": "okta"})).unwrap();
        assert_eq!(
            idp.login_url("d1"),
            "https://auth.huaweicloud.com/authui/federation/websso?domain_id=d1&idp=okta&protocol=saml"
        );
        let rules = default_mapping_rules();
        assert_eq!(rules[0]["remote"][1]["type"], "Groups");
    }
}
