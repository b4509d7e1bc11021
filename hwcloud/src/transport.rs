//! 除OBS之外所有服务共用的请求通道: 只读检查、403记录、请求头组装、签名、json解析和错误映射

use crate::HuaweiClient;
use crate::config::PermissionObserver;
use crate::error::{Error, ErrorReport, Result};
use crate::service::Service;
use hwcloud_common::helper::into_header_map;
use hwcloud_common::sdk_sign::{SignParams, sign};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::{Map, Value};

pub(crate) const CONTENT_TYPE_JSON: &str = "application/json";
pub(crate) const CONTENT_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

/// 请求路径包含这些片段时需要`X-Domain-Id`
const DOMAIN_PATH_MARKERS: &[&str] = &[
    "/OS-CREDENTIAL/",
    "/users",
    "/roles",
    "/mappings",
    "/identity_providers",
    "/groups",
];

pub type Query = Vec<(String, String)>;

/// 构造query参数
pub fn query<K, V, I>(pairs: I) -> Query
where
    K: Into<String>,
    V: ToString,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

// region:    --- AccessGuard
/// 只读模式和403权限记录，OBS的请求通道也共用
#[derive(Clone)]
pub(crate) struct AccessGuard {
    read_only: bool,
    observer: Option<PermissionObserver>,
}

impl AccessGuard {
    pub(crate) fn new(read_only: bool, observer: Option<PermissionObserver>) -> Self {
        Self {
            read_only,
            observer,
        }
    }

    /// 只读模式下除`allowed`之外的方法直接失败，不发出请求
    pub(crate) fn check(&self, method: &Method, path: &str, allowed: &[Method]) -> Result<()> {
        if self.read_only && !allowed.contains(method) {
            return Err(Error::AccountReadOnly(format!("{method} {path}")));
        }
        Ok(())
    }

    pub(crate) fn observe(&self, status: u16, service: &str, method: &Method, path: &str) {
        if status != 403 {
            return;
        }
        tracing::debug!(service, %method, path, "permission denied");
        if let Some(cb) = &self.observer {
            cb(service, &format!("{method} {path}"));
        }
    }
}
// endregion: --- AccessGuard

// region:    --- RequestOptions
/// 单次请求的上下文，默认值由service推导
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub service: Service,
    pub region: String,
    /// 携带`X-Project-Id`
    pub project_scoped: bool,
    /// 携带`X-Domain-Id`
    pub domain_scoped: bool,
    pub content_type: Option<&'static str>,
    /// 只读模式下仍然允许发出
    pub read_only_exempt: bool,
}

impl RequestOptions {
    pub fn new(service: Service, region: impl Into<String>) -> Self {
        Self {
            service,
            region: region.into(),
            project_scoped: !service.is_domain_scoped(),
            domain_scoped: service == Service::Eps,
            content_type: None,
            read_only_exempt: service == Service::Ces,
        }
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    fn effective_content_type(&self, method: &Method) -> &'static str {
        match self.content_type {
            Some(ct) => ct,
            None if *method == Method::PATCH
                && matches!(self.service, Service::Modelarts | Service::ModelartsV1) =>
            {
                CONTENT_TYPE_MERGE_PATCH
            }
            None => CONTENT_TYPE_JSON,
        }
    }
}
// endregion: --- RequestOptions

/// 空响应体视为`{}`
pub(crate) fn decode_body(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn error_from_body(status: u16, bytes: &[u8]) -> Error {
    let report = match decode_body(bytes) {
        Ok(v) => ErrorReport::from_json(status, v),
        Err(_) => ErrorReport::from_text(status, &String::from_utf8_lossy(bytes)),
    };
    Error::api(status, report)
}

impl HuaweiClient {
    /// 发送一个签名后的json请求
    ///
    /// `resource`为去掉版本和project前缀的资源路径，如`cloudservers/detail`
    pub async fn request(
        &self,
        method: Method,
        opts: &RequestOptions,
        resource: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let inner = &self.inner;
        if !opts.read_only_exempt {
            inner.guard.check(&method, resource, &[Method::GET])?;
        }

        let state = self.state();
        let resolved = inner.router.resolve(
            &state.projects,
            opts.service,
            &opts.region,
            resource,
            &method,
        )?;
        let mut url = resolved.url;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        // region:    --- headers
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if let (true, Some(p)) = (opts.project_scoped, resolved.project_id.as_deref()) {
            pairs.push(("X-Project-Id", p));
        }
        let owner_id = state.owner.domain_id.as_str();
        let path = url.path().to_owned();
        if !owner_id.is_empty()
            && (opts.domain_scoped || DOMAIN_PATH_MARKERS.iter().any(|m| path.contains(m)))
        {
            pairs.push(("X-Domain-Id", owner_id));
        }
        let creds = &inner.credentials;
        if let Some(token) = creds.sts_security_token.as_deref() {
            pairs.push(("X-Security-Token", token));
        }
        let body_bytes = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };
        if !body_bytes.is_empty() {
            pairs.push((CONTENT_TYPE.as_str(), opts.effective_content_type(&method)));
        }
        let mut headers: HeaderMap = into_header_map(pairs)?;
        // endregion: --- headers

        sign(SignParams {
            access_key_id: &creds.access_key_id,
            access_key_secret: &creds.access_key_secret,
            method: method.as_str(),
            url: &mut url,
            headers: &mut headers,
            body: &body_bytes,
        })?;

        tracing::debug!(%method, %url, service = %opts.service, "huawei request");
        let mut req = inner.http.request(method.clone(), url).headers(headers);
        // 空body不发送Content-Length
        if !body_bytes.is_empty() {
            req = req.body(body_bytes);
        }
        let resp = req.send().await?;

        let status = resp.status().as_u16();
        inner
            .guard
            .observe(status, opts.service.host_prefix(), &method, &path);
        let bytes = resp.bytes().await?;
        if status >= 400 {
            return Err(error_from_body(status, &bytes));
        }
        decode_body(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn guard_blocks_writes_in_read_only_mode() {
        let g = AccessGuard::new(true, None);
        assert!(g.check(&Method::GET, "vpcs", &[Method::GET]).is_ok());
        let e = g.check(&Method::POST, "vpcs", &[Method::GET]).unwrap_err();
        assert_eq!(e.kind(), crate::ErrorKind::AccountReadOnly);
        assert!(
            AccessGuard::new(false, None)
                .check(&Method::DELETE, "vpcs/1", &[Method::GET])
                .is_ok()
        );
    }

    #[test]
    fn guard_reports_only_403() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let g = AccessGuard::new(
            false,
            Some(Arc::new(move |svc: &str, action: &str| {
                s.lock().unwrap().push(format!("{svc}|{action}"));
            })),
        );
        g.observe(404, "ecs", &Method::GET, "/v1/p1/cloudservers");
        g.observe(403, "ecs", &Method::GET, "/v1/p1/cloudservers");
        assert_eq!(*seen.lock().unwrap(), vec!["ecs|GET /v1/p1/cloudservers"]);
    }

    #[test]
    fn modelarts_patch_uses_merge_patch() {
        let o = RequestOptions::new(Service::Modelarts, "cn-north-4");
        assert_eq!(o.effective_content_type(&Method::PATCH), CONTENT_TYPE_MERGE_PATCH);
        assert_eq!(o.effective_content_type(&Method::POST), CONTENT_TYPE_JSON);
        let o = RequestOptions::new(Service::Ecs, "cn-north-4");
        assert_eq!(o.effective_content_type(&Method::PATCH), CONTENT_TYPE_JSON);
    }

    #[test]
    fn ambient_defaults() {
        let o = RequestOptions::new(Service::Eps, "");
        assert!(!o.project_scoped && o.domain_scoped);
        let o = RequestOptions::new(Service::Ces, "cn-north-4");
        assert!(o.read_only_exempt && o.project_scoped);
    }

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(decode_body(b"").unwrap(), serde_json::json!({}));
        assert_eq!(decode_body(b"  \n").unwrap(), serde_json::json!({}));
        let e = error_from_body(502, b"<html>bad gateway</html>");
        assert_eq!(e.kind(), crate::ErrorKind::Transient);
    }
}
