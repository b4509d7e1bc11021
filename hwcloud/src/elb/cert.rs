use super::ELB_PAGE;
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct LbCertificate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// server / client
    #[serde(rename = "type", default)]
    pub cert_type: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub certificate: String,
    #[serde(default)]
    pub expire_time: String,
    #[serde(default)]
    pub created_at: String,
}

impl Region {
    pub async fn lb_certificates(&self) -> Result<Vec<LbCertificate>> {
        self.list_all_as(
            Service::Elb,
            "elb/certificates",
            &[],
            &Paginator::next_marker("certificates", Some(ELB_PAGE)),
        )
        .await
        .context("list elb certificates")
    }

    pub async fn lb_certificate(&self, cert_id: &str) -> Result<LbCertificate> {
        let resp = self
            .get(Service::Elb, &format!("elb/certificates/{cert_id}"), &[])
            .await
            .context(format!("get elb certificate {cert_id}"))?;
        decode(&resp, "certificate")
    }

    /// 服务器证书，PEM格式
    pub async fn create_lb_certificate(
        &self,
        name: &str,
        certificate: &str,
        private_key: &str,
    ) -> Result<LbCertificate> {
        let body = json!({"certificate": {
            "name": name,
            "type": "server",
            "certificate": certificate,
            "private_key": private_key,
        }});
        let resp = self
            .post(Service::Elb, "elb/certificates", &body)
            .await
            .context(format!("create elb certificate {name}"))?;
        decode(&resp, "certificate")
    }

    pub async fn delete_lb_certificate(&self, cert_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/certificates/{cert_id}"))
            .await
            .context(format!("delete elb certificate {cert_id}"))?;
        Ok(())
    }
}
