//! Credentials and CredentialsProvider definitions.
//!
//! 构建[`HuaweiClient`](crate::HuaweiClient)时需要传入实现了`CredentialsProvider`的类型。
//! client只在构建时调用一次`load`，之后凭证不可变，需要轮换AK/SK时重新构建client。
//!
//! 固定AK/SK使用[`StaticCredentialsProvider`]，其它来源自行实现`CredentialsProvider`。
//!
//! # Example
//! ```no_run
//! use hwcloud::credentials::{Credentials, CredentialsError, CredentialsProvider};
//! use hwcloud::{HuaweiClient, ProviderConfig};
//! use std::sync::Arc;
//!
//! /// 从环境变量读取，`HWCLOUD_SECURITY_TOKEN`存在时为临时凭证
//! pub struct EnvProvider;
//!
//! #[async_trait::async_trait]
//! impl CredentialsProvider for EnvProvider {
//!     async fn load(&self) -> Result<Credentials, CredentialsError> {
//!         let var = |k: &str| std::env::var(k).map_err(|e| CredentialsError::Provider(format!("{k}: {e}")));
//!         Ok(Credentials::new(
//!             var("HWCLOUD_ACCESS_KEY_ID")?,
//!             var("HWCLOUD_ACCESS_KEY_SECRET")?,
//!             std::env::var("HWCLOUD_SECURITY_TOKEN").ok(),
//!             None,
//!         ))
//!     }
//! }
//!
//! async fn get_client() -> hwcloud::Result<HuaweiClient> {
//!     HuaweiClient::builder()
//!         .credentials_provider(Arc::new(EnvProvider))
//!         .config(ProviderConfig::builder().name("hw").build())
//!         .build()
//!         .await
//! }
//! ```

use time::OffsetDateTime;

#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// 临时凭证的token，存在时每个请求都会带上`X-Security-Token`
    pub sts_security_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("sts_security_token", &self.sts_security_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        security_token: Option<String>,
        expires_at: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            sts_security_token: security_token,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|t| t <= OffsetDateTime::now_utc())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CredentialsError {
    #[error("failed to load credentials: {0}")]
    Provider(String),
    #[error("credentials expired at {0}")]
    Expired(OffsetDateTime),
}

#[async_trait::async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn load(&self) -> Result<Credentials, CredentialsError>;
}

/// 固定AK/SK
pub struct StaticCredentialsProvider {
    creds: Credentials,
}

impl StaticCredentialsProvider {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            creds: Credentials::new(access_key_id, access_key_secret, None, None),
        }
    }
}

#[async_trait::async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn load(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.creds.clone())
    }
}
