//! OBS对象存储
//!
//! OBS不走统一的SDK-HMAC-SHA256签名，使用独立的V2签名和xml报文。
//!
//! 注意：
//!
//! - 桶域名为`{bucket}.obs.{region}.myhuaweicloud.com`，设置了`endpoint_override`时改为path-style
//! - 只读模式下只允许GET和HEAD，403会通知权限回调，service为`obs`
//! - 创建或删除桶会清空[`HuaweiClient::buckets`]缓存

pub mod acl;
pub mod bucket;
pub mod config;
pub mod multipart;
pub mod object;
pub mod policy;
pub(crate) mod sign;

use crate::HuaweiClient;
use crate::error::{Error, ErrorReport, Result};
use base64::{Engine, engine::general_purpose};
use bytes::Bytes;
use hwcloud_common::helper::into_header_map;
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::HeaderMap;
use reqwest::{Body, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sign::ObsSigner;
use std::collections::BTreeMap;
use url::Url;

/// 对象名编码时保留`/`
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

const QUERY_ENCODE_SET: &AsciiSet = &KEY_ENCODE_SET.add(b'/');

pub(crate) fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

fn encode_query_value(v: &str) -> String {
    utf8_percent_encode(v, QUERY_ENCODE_SET).to_string()
}

/// OBS客户端，绑定到一个region
#[derive(Clone)]
pub struct ObsClient {
    client: HuaweiClient,
    region: String,
}

impl std::fmt::Debug for ObsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsClient").field("region", &self.region).finish()
    }
}

// region:    --- request
pub(crate) enum ObsBody {
    Empty,
    Bytes(Bytes),
    /// 文件流，需要同时给出长度
    Stream(Body, u64),
}

/// 一次OBS请求，`query`中属于子资源的参数参与签名
pub(crate) struct ObsRequest<'a> {
    pub method: Method,
    pub bucket: Option<&'a str>,
    pub key: &'a str,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: ObsBody,
}

impl<'a> ObsRequest<'a> {
    pub(crate) fn new(method: Method, bucket: Option<&'a str>, key: &'a str) -> Self {
        Self {
            method,
            bucket,
            key,
            query: Vec::new(),
            headers: Vec::new(),
            body: ObsBody::Empty,
        }
    }

    /// 子资源，如`?acl`
    pub(crate) fn sub(mut self, name: &str) -> Self {
        self.query.push((name.to_owned(), String::new()));
        self
    }

    pub(crate) fn query(mut self, k: &str, v: impl ToString) -> Self {
        self.query.push((k.to_owned(), v.to_string()));
        self
    }

    pub(crate) fn query_opt(self, k: &str, v: Option<impl ToString>) -> Self {
        match v {
            Some(v) => self.query(k, v),
            None => self,
        }
    }

    pub(crate) fn header(mut self, k: &str, v: impl Into<String>) -> Self {
        self.headers.push((k.to_ascii_lowercase(), v.into()));
        self
    }

    pub(crate) fn header_opt(self, k: &str, v: Option<&str>) -> Self {
        match v {
            Some(v) => self.header(k, v),
            None => self,
        }
    }

    pub(crate) fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ObsBody::Bytes(body.into());
        self
    }

    /// xml请求体，同时设置Content-MD5
    pub(crate) fn xml<T: serde::Serialize>(self, root: &str, value: &T) -> Result<Self> {
        let xml = to_xml(root, value)?;
        Ok(self.bytes(xml))
    }
}

pub(crate) fn to_xml<T: serde::Serialize>(root: &str, value: &T) -> Result<String> {
    let mut buf = String::new();
    let ser = quick_xml::se::Serializer::with_root(&mut buf, Some(root))
        .map_err(|e| Error::Xml(e.to_string()))?;
    value.serialize(ser).map_err(|e| Error::Xml(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn from_xml<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))?;
    quick_xml::de::from_str(text).map_err(|e| Error::Xml(e.to_string()))
}

pub fn content_md5(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    general_purpose::STANDARD.encode(hasher.finalize())
}

#[derive(Debug)]
pub(crate) struct ObsResponse {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ObsResponse {
    pub(crate) fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    pub(crate) fn xml<T: DeserializeOwned>(&self) -> Result<T> {
        from_xml(&self.body)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XmlError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// OBS错误体为xml，HEAD请求没有错误体，此时错误码取`x-obs-error-code`
pub(crate) fn obs_error(status: u16, headers: &HeaderMap, body: &[u8]) -> Error {
    let text = String::from_utf8_lossy(body);
    let parsed: Option<XmlError> = quick_xml::de::from_str(&text).ok();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let report = match parsed {
        Some(e) => ErrorReport {
            status,
            code: e.code.or_else(|| header("x-obs-error-code")),
            message: e.message,
            request_id: e.request_id.or_else(|| header("x-obs-request-id")),
            raw: Value::String(text.into_owned()),
            ..Default::default()
        },
        None => ErrorReport {
            status,
            code: header("x-obs-error-code"),
            message: header("x-obs-error-message").or_else(|| (!text.is_empty()).then(|| text.to_string())),
            request_id: header("x-obs-request-id"),
            raw: Value::String(text.into_owned()),
            ..Default::default()
        },
    };
    Error::api(status, report)
}
// endregion: --- request

impl ObsClient {
    pub(crate) fn new(client: HuaweiClient, region: String) -> Self {
        Self { client, region }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn client(&self) -> &HuaweiClient {
        &self.client
    }

    /// `obs.{region}.myhuaweicloud.com`
    pub fn endpoint(&self) -> String {
        format!("obs.{}.myhuaweicloud.com", self.region)
    }

    /// 桶访问地址，设置了`endpoint_override`时为path-style
    pub(crate) fn url(&self, bucket: Option<&str>, key: &str) -> Result<Url> {
        match &self.client.inner.config.endpoint_override {
            Some(o) => {
                let base = o.as_str().trim_end_matches('/');
                let raw = match bucket {
                    Some(b) => format!("{base}/{b}/{}", encode_key(key)),
                    None => format!("{base}/"),
                };
                Ok(Url::parse(&raw)?)
            }
            None => self.canonical_url(bucket, key),
        }
    }

    /// 桶域名形式的地址，签名总是基于它计算
    fn canonical_url(&self, bucket: Option<&str>, key: &str) -> Result<Url> {
        let raw = match bucket {
            Some(b) => format!("https://{b}.{}/{}", self.endpoint(), encode_key(key)),
            None => format!("https://{}/", self.endpoint()),
        };
        Ok(Url::parse(&raw)?)
    }

    fn query_string(query: &[(String, String)]) -> Option<String> {
        if query.is_empty() {
            return None;
        }
        let qs = query
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    encode_query_value(k)
                } else {
                    format!("{}={}", encode_query_value(k), encode_query_value(v))
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        Some(qs)
    }

    pub(crate) async fn send(&self, req: ObsRequest<'_>) -> Result<ObsResponse> {
        let inner = &self.client.inner;
        let bucket_path = match req.bucket {
            Some(b) => format!("/{b}/{}", req.key),
            None => "/".to_owned(),
        };
        inner
            .guard
            .check(&req.method, &bucket_path, &[Method::GET, Method::HEAD])?;

        let query = Self::query_string(&req.query);
        let mut url = self.url(req.bucket, req.key)?;
        url.set_query(query.as_deref());
        let mut canonical = self.canonical_url(req.bucket, req.key)?;
        canonical.set_query(query.as_deref());

        // region:    --- headers
        let mut headers: BTreeMap<String, String> = req.headers.into_iter().collect();
        let (body, length) = match req.body {
            ObsBody::Empty => (None, 0),
            ObsBody::Bytes(b) => {
                headers
                    .entry("content-md5".to_owned())
                    .or_insert_with(|| content_md5(&b));
                let len = b.len() as u64;
                (Some(Body::from(b)), len)
            }
            ObsBody::Stream(body, len) => (Some(body), len),
        };
        if body.is_some() {
            headers.insert("content-length".to_owned(), length.to_string());
        }
        let header_map = into_header_map(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        let header_map = ObsSigner::new(req.bucket, &inner.credentials).sign_headers(
            &req.method,
            canonical.as_str(),
            header_map,
        )?;
        // endregion: --- headers

        tracing::debug!(method = %req.method, %url, service = "obs", "huawei request");
        let mut builder = inner.http.request(req.method.clone(), url).headers(header_map);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        inner.guard.observe(status, "obs", &req.method, &bucket_path);
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        if status >= 300 {
            return Err(obs_error(status, &headers, &body));
        }
        Ok(ObsResponse { headers, body })
    }

    /// 生成预签名url，`method`只允许GET、PUT和DELETE
    pub fn presign(
        &self,
        method: Method,
        bucket: &str,
        key: &str,
        expires_in: std::time::Duration,
    ) -> Result<Url> {
        if ![Method::GET, Method::PUT, Method::DELETE].contains(&method) {
            return Err(Error::NotSupported(format!("presign with method {method}")));
        }
        let canonical = self.canonical_url(Some(bucket), key)?;
        let signed = ObsSigner::new(Some(bucket), &self.client.inner.credentials).sign_query(
            &method,
            canonical.as_str(),
            expires_in,
        )?;
        let mut url = self.url(Some(bucket), key)?;
        url.set_query(Some(&signed));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_base64() {
        assert_eq!(content_md5(b"0123456789"), "eB5eJF1ptWaXm4bijSPyxw==");
    }

    #[test]
    fn xml_error_body() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchBucketPolicy</Code><Message>The bucket policy does not exist</Message><RequestId>0001</RequestId><HostId>h</HostId></Error>"#;
        let e = obs_error(404, &HeaderMap::new(), body);
        assert_eq!(e.vendor_code(), Some("NoSuchBucketPolicy"));
        assert!(e.is_not_found());
        assert_eq!(e.report().and_then(|r| r.request_id.as_deref()), Some("0001"));
    }

    #[test]
    fn head_error_uses_headers() {
        let mut h = HeaderMap::new();
        h.insert("x-obs-error-code", "NoSuchBucket".parse().unwrap());
        let e = obs_error(404, &h, b"");
        assert_eq!(e.vendor_code(), Some("NoSuchBucket"));
    }

    #[test]
    fn request_builder() {
        let r = ObsRequest::new(Method::GET, Some("b"), "")
            .sub("acl")
            .query_opt("prefix", None::<&str>)
            .query("max-keys", 10)
            .header("X-Obs-Acl", "private");
        assert_eq!(r.query, vec![("acl".to_owned(), String::new()), ("max-keys".to_owned(), "10".to_owned())]);
        assert_eq!(r.headers, vec![("x-obs-acl".to_owned(), "private".to_owned())]);
    }

    #[test]
    fn key_encoding_keeps_slash() {
        assert_eq!(encode_key("dir/测 试.txt"), "dir/%E6%B5%8B%20%E8%AF%95.txt");
        assert_eq!(encode_query_value("a/b"), "a%2Fb");
    }
}
