//! region信息以及每个region的请求入口

use crate::HuaweiClient;
use crate::error::{Error, Result};
use crate::pagination::{Paginator, json_path};
use crate::service::Service;
use crate::transport::RequestOptions;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const CLOUD_PROVIDER_HUAWEI: &str = "Huawei";
pub const CLOUD_PROVIDER_HUAWEI_CN: &str = "华为云";

// region:    --- RegionInfo
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Locales {
    #[serde(rename = "en-us", default)]
    pub en_us: String,
    #[serde(rename = "zh-cn", default)]
    pub zh_cn: String,
}

/// IAM `regions`接口返回的region，或者由项目派生出来的region
#[derive(Clone, Debug, Deserialize)]
pub struct RegionInfo {
    pub id: String,
    #[serde(default)]
    pub locales: Locales,
    #[serde(default)]
    pub parent_region_id: Option<String>,
    #[serde(rename = "type", default)]
    pub region_type: String,
    #[serde(default)]
    pub description: String,
    /// 由项目派生时为该项目的id
    #[serde(skip)]
    pub project_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoInfo {
    pub latitude: f32,
    pub longitude: f32,
    pub city: &'static str,
    pub country_code: &'static str,
}

const fn geo(latitude: f32, longitude: f32, city: &'static str, country_code: &'static str) -> GeoInfo {
    GeoInfo {
        latitude,
        longitude,
        city,
        country_code,
    }
}

static GEO_TABLE: &[(&str, GeoInfo)] = &[
    ("cn-north-1", geo(39.904, 116.407, "Beijing", "CN")),
    ("cn-north-4", geo(39.904, 116.407, "Beijing", "CN")),
    ("cn-north-9", geo(40.842, 111.749, "Ulanqab", "CN")),
    ("cn-east-2", geo(31.230, 121.473, "Shanghai", "CN")),
    ("cn-east-3", geo(31.230, 121.473, "Shanghai", "CN")),
    ("cn-south-1", geo(23.129, 113.264, "Guangzhou", "CN")),
    ("cn-south-2", geo(22.543, 114.057, "Shenzhen", "CN")),
    ("cn-southwest-2", geo(26.647, 106.630, "Guiyang", "CN")),
    ("ap-southeast-1", geo(22.396, 114.109, "Hong Kong", "HK")),
    ("ap-southeast-2", geo(13.756, 100.501, "Bangkok", "TH")),
    ("ap-southeast-3", geo(1.352, 103.819, "Singapore", "SG")),
    ("ap-southeast-4", geo(-6.175, 106.865, "Jakarta", "ID")),
    ("af-south-1", geo(-26.204, 28.047, "Johannesburg", "ZA")),
    ("la-north-2", geo(19.432, -99.133, "Mexico City", "MX")),
    ("la-south-2", geo(-33.448, -70.669, "Santiago", "CL")),
    ("sa-brazil-1", geo(-23.550, -46.633, "Sao Paulo", "BR")),
    ("na-mexico-1", geo(19.432, -99.133, "Mexico City", "MX")),
    ("tr-west-1", geo(41.008, 28.978, "Istanbul", "TR")),
    ("me-east-1", geo(24.713, 46.675, "Riyadh", "SA")),
    ("eu-west-0", geo(48.856, 2.352, "Paris", "FR")),
    ("eu-west-101", geo(52.520, 13.405, "Dublin", "IE")),
];

impl RegionInfo {
    /// 项目名中`_`之后的部分
    fn suffix(&self) -> Option<&str> {
        self.id.split_once('_').map(|(_, s)| s)
    }

    pub fn base_region_id(&self) -> &str {
        self.id.split('_').next().unwrap_or(&self.id)
    }

    pub fn name(&self) -> String {
        match self.suffix() {
            Some(s) => format!("{CLOUD_PROVIDER_HUAWEI_CN} {}-{s}", self.locales.zh_cn),
            None => format!("{CLOUD_PROVIDER_HUAWEI_CN} {}", self.locales.zh_cn),
        }
    }

    pub fn en_name(&self) -> String {
        match self.suffix() {
            Some(s) => format!("{CLOUD_PROVIDER_HUAWEI} {}-{s}", self.locales.en_us),
            None => format!("{CLOUD_PROVIDER_HUAWEI} {}", self.locales.en_us),
        }
    }

    pub fn global_id(&self) -> String {
        format!("{CLOUD_PROVIDER_HUAWEI}/{}", self.id)
    }

    pub fn geo(&self) -> Option<GeoInfo> {
        let base = self.base_region_id();
        GEO_TABLE
            .iter()
            .find(|(id, _)| *id == base)
            .map(|(_, g)| *g)
    }
}
// endregion: --- RegionInfo

/// 取`key`对应的字段并反序列化，`key`为空时使用整个响应
pub(crate) fn decode<T: DeserializeOwned>(v: &Value, key: &str) -> Result<T> {
    let target = if key.is_empty() {
        v
    } else {
        json_path(v, key).ok_or_else(|| Error::Fatal(format!("response has no `{key}`: {v}")))?
    };
    Ok(T::deserialize(target)?)
}

pub(crate) fn decode_list<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Error::from))
        .collect()
}

/// 每个region的请求入口，持有client的一份clone(内部为Arc)
#[derive(Clone)]
pub struct Region {
    client: HuaweiClient,
    info: RegionInfo,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region").field("info", &self.info).finish()
    }
}

impl Region {
    pub(crate) fn new(client: HuaweiClient, info: RegionInfo) -> Self {
        Self { client, info }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn info(&self) -> &RegionInfo {
        &self.info
    }

    pub fn client(&self) -> &HuaweiClient {
        &self.client
    }

    /// 位于本region的桶
    pub async fn buckets(&self) -> Result<Vec<crate::client::BucketRecord>> {
        self.client.buckets_in(self.id()).await
    }

    pub fn project_id(&self) -> Option<&str> {
        self.info.project_id.as_deref()
    }

    pub fn options(&self, service: Service) -> RequestOptions {
        RequestOptions::new(service, self.info.id.clone())
    }

    // region:    --- raw requests
    pub async fn call(
        &self,
        method: Method,
        service: Service,
        resource: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.client
            .request(method, &self.options(service), resource, query, body)
            .await
    }

    pub async fn get(&self, service: Service, resource: &str, query: &[(String, String)]) -> Result<Value> {
        self.call(Method::GET, service, resource, query, None).await
    }

    pub async fn post(&self, service: Service, resource: &str, body: &Value) -> Result<Value> {
        self.call(Method::POST, service, resource, &[], Some(body)).await
    }

    pub async fn put(&self, service: Service, resource: &str, body: &Value) -> Result<Value> {
        self.call(Method::PUT, service, resource, &[], Some(body)).await
    }

    pub async fn patch(&self, service: Service, resource: &str, body: &Value) -> Result<Value> {
        self.call(Method::PATCH, service, resource, &[], Some(body)).await
    }

    pub async fn delete(&self, service: Service, resource: &str) -> Result<Value> {
        self.call(Method::DELETE, service, resource, &[], None).await
    }

    /// 按`paginator`的分页方式取回所有项
    pub async fn list_all(
        &self,
        service: Service,
        resource: &str,
        query: &[(String, String)],
        paginator: &Paginator,
    ) -> Result<Vec<Value>> {
        paginator
            .collect(|page| {
                let mut q = query.to_vec();
                q.extend(page);
                async move { self.get(service, resource, &q).await }
            })
            .await
    }

    pub async fn list_all_as<T: DeserializeOwned>(
        &self,
        service: Service,
        resource: &str,
        query: &[(String, String)],
        paginator: &Paginator,
    ) -> Result<Vec<T>> {
        decode_list(self.list_all(service, resource, query, paginator).await?)
    }
    // endregion: --- raw requests
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str) -> RegionInfo {
        RegionInfo {
            id: id.to_owned(),
            locales: Locales {
                en_us: "CN North-Beijing4".to_owned(),
                zh_cn: "华北-北京四".to_owned(),
            },
            parent_region_id: None,
            region_type: "public".to_owned(),
            description: String::new(),
            project_id: None,
        }
    }

    #[test]
    fn names_and_ids() {
        let r = info("cn-north-4");
        assert_eq!(r.name(), "华为云 华北-北京四");
        assert_eq!(r.en_name(), "Huawei CN North-Beijing4");
        assert_eq!(r.global_id(), "Huawei/cn-north-4");
        assert_eq!(r.geo().map(|g| g.city), Some("Beijing"));

        let sub = info("cn-north-4_ai");
        assert_eq!(sub.base_region_id(), "cn-north-4");
        assert_eq!(sub.name(), "华为云 华北-北京四-ai");
        assert!(sub.geo().is_some());
        assert!(info("xx-none-1").geo().is_none());
    }

    #[test]
    fn decode_missing_key() {
        let v = serde_json::json!({"server": {"id": "s"}});
        let id: String = decode(&v, "server.id").unwrap();
        assert_eq!(id, "s");
        assert!(decode::<String>(&v, "volume").is_err());
    }
}
