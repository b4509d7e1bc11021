//! SSL证书管理

use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{decode, decode_list};
use crate::service::Service;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct SslCertificate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    /// 以`;`分隔的附加域名
    #[serde(default)]
    pub sans: String,
    #[serde(rename = "signature_algrithm", default)]
    pub signature_algorithm: String,
    #[serde(rename = "type", default)]
    pub cert_type: String,
    #[serde(default)]
    pub brand: String,
    /// `yyyy-MM-dd HH:mm:ss.S`
    #[serde(default)]
    pub expire_time: String,
    #[serde(default)]
    pub domain_type: String,
    /// 月
    #[serde(default)]
    pub validity_period: i64,
    /// PAID / ISSUED / CHECKING / CANCELCHECKING / UNPASSED / EXPIRED ...
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub domain_count: i64,
    #[serde(default)]
    pub wildcard_count: i64,
    #[serde(default)]
    pub description: String,
}

impl SslCertificate {
    pub fn sans(&self) -> Vec<&str> {
        self.sans.split(';').filter(|s| !s.is_empty()).collect()
    }

    pub fn is_issued(&self) -> bool {
        self.status == "ISSUED"
    }
}

#[derive(Clone, Deserialize)]
pub struct CertificateContent {
    #[serde(default)]
    pub certificate: String,
    #[serde(default)]
    pub certificate_chain: String,
    #[serde(default)]
    pub private_key: String,
}

impl HuaweiClient {
    pub async fn ssl_certificates(&self) -> Result<Vec<SslCertificate>> {
        let items = self
            .global_list_all(
                Service::Scm,
                "scm/certificates",
                &[],
                &Paginator::offset("certificates", 50).total_key("total_count"),
            )
            .await
            .context("list ssl certificates")?;
        decode_list(items)
    }

    pub async fn ssl_certificate(&self, cert_id: &str) -> Result<SslCertificate> {
        let resp = self
            .global_get(Service::Scm, &format!("scm/certificates/{cert_id}"))
            .await
            .context(format!("get ssl certificate {cert_id}"))?;
        decode(&resp, "")
    }

    /// 导出已签发证书的PEM内容
    pub async fn export_ssl_certificate(&self, cert_id: &str) -> Result<CertificateContent> {
        let resp = self
            .global(
                Method::POST,
                Service::Scm,
                &format!("scm/certificates/{cert_id}/export"),
                &[],
                Some(&json!({})),
            )
            .await
            .context(format!("export ssl certificate {cert_id}"))?;
        decode(&resp, "")
    }

    pub async fn delete_ssl_certificate(&self, cert_id: &str) -> Result<()> {
        self.global(
            Method::DELETE,
            Service::Scm,
            &format!("scm/certificates/{cert_id}"),
            &[],
            None,
        )
        .await
        .context(format!("delete ssl certificate {cert_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sans_split() {
        let c: SslCertificate = serde_json::from_value(json!({
            "id": "scs-1",
            "domain": "example.com",
            "sans": "a.example.com;b.example.com;",
            "status": "ISSUED"
        }))
        .unwrap();
        assert_eq!(c.sans(), vec!["a.example.com", "b.example.com"]);
        assert!(c.is_issued());
    }
}
