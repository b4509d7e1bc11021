use crate::error::{Error, Result};
use bon::Builder;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REGION: &str = "cn-north-1";

/// 403时回调: (service, "{METHOD} {path}")
pub type PermissionObserver = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloudEnv {
    #[default]
    China,
    International,
}

impl CloudEnv {
    pub fn access_env(&self) -> &'static str {
        match self {
            CloudEnv::China => "Huawei-China",
            CloudEnv::International => "Huawei-Global",
        }
    }
}

#[derive(Builder, Clone)]
#[builder(on(String, into))]
pub struct ProviderConfig {
    /// 云账号名称，用于生成子账号名称
    #[builder(default)]
    pub name: String,
    pub account_id: Option<String>,
    #[builder(default)]
    pub cloud_env: CloudEnv,
    #[builder(default = false)]
    pub read_only: bool,
    pub update_permission: Option<PermissionObserver>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    /// 外部构建好的http client，设置后忽略timeout相关配置
    pub http_client: Option<reqwest::Client>,
    /// 替换所有请求url的scheme/host/port，用于私有部署或mock server
    pub endpoint_override: Option<Url>,
    #[builder(default = DEFAULT_REGION.to_owned())]
    pub default_region: String,
}

impl ProviderConfig {
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        if let Some(c) = &self.http_client {
            return Ok(c.clone());
        }
        let mut builder = reqwest::Client::builder();
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = self.connect_timeout {
            builder = builder.connect_timeout(t);
        }
        builder.build().map_err(Error::from)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("account_id", &self.account_id)
            .field("cloud_env", &self.cloud_env)
            .field("read_only", &self.read_only)
            .field("endpoint_override", &self.endpoint_override)
            .field("default_region", &self.default_region)
            .finish_non_exhaustive()
    }
}
