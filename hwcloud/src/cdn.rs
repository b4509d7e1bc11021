//! CDN加速域名(只读)

use crate::client::HuaweiClient;
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::decode_list;
use crate::service::Service;
use crate::status::CdnStatus;
use crate::transport::query;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CdnSource {
    #[serde(default)]
    pub ip_or_domain: String,
    /// ipaddr / domain / obs_bucket
    #[serde(default)]
    pub origin_type: String,
    /// 1主源站 0备源站
    #[serde(default)]
    pub active_standby: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CdnDomain {
    pub id: String,
    #[serde(default)]
    pub domain_name: String,
    /// web / download / video / wholeSite
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub domain_status: String,
    #[serde(default)]
    pub cname: String,
    #[serde(default)]
    pub sources: Vec<CdnSource>,
    /// mainland_china / outside_mainland_china / global
    #[serde(default)]
    pub service_area: String,
    #[serde(default)]
    pub enterprise_project_id: String,
    /// 毫秒
    #[serde(default)]
    pub create_time: Option<i64>,
}

impl CdnDomain {
    pub fn status(&self) -> CdnStatus {
        CdnStatus::from_vendor(&self.domain_status)
    }
}

impl HuaweiClient {
    /// 所有企业项目下的加速域名
    ///
    /// 已取条数大于`total`或者某一页不满时结束翻页
    pub async fn cdn_domains(&self) -> Result<Vec<CdnDomain>> {
        let items = self
            .global_list_all(
                Service::Cdn,
                "cdn/domains",
                &query([("enterprise_project_id", "ALL")]),
                &Paginator::page_number("domains", 100)
                    .page_keys("page_number", "page_size")
                    .total_key("total")
                    .total_exclusive(),
            )
            .await
            .context("list cdn domains")?;
        decode_list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_status() {
        let d: CdnDomain = serde_json::from_value(json!({
            "id": "d-1",
            "domain_name": "static.example.com",
            "domain_status": "checking",
            "sources": [{"ip_or_domain": "1.1.1.1", "origin_type": "ipaddr", "active_standby": 1}]
        }))
        .unwrap();
        assert_eq!(d.status(), CdnStatus::Processing);
        assert_eq!(d.sources[0].origin_type, "ipaddr");
    }
}
