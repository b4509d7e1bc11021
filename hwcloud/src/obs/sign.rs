//! OBS V2签名
//!
//! 桶级请求交给`reqsign::HuaweicloudObsSigner`，子资源表和预签名都由它维护。
//! 签名只依赖`/bucket/key?sub-resource`，与访问域名无关，所以总是按桶域名构造待签请求，
//! 再把签名结果套到实际发送的地址上，path-style的`endpoint_override`也能复用。
//!
//! reqsign按`/{bucket}{path}`拼CanonicalizedResource，服务级请求(ListBuckets)要求资源为`/`，
//! 这类请求单独签名:
//!
//! ```text
//! StringToSign = VERB + "\n\n\n" + Date + "\n" + CanonicalizedHeaders + "/"
//! ```

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use hwcloud_common::helper::{gmt_format, hmac_sha1_base64};
use reqsign::{HuaweicloudObsCredential, HuaweicloudObsSigner};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, DATE, HeaderMap, HeaderValue};
use std::time::Duration;
use time::OffsetDateTime;

const SECURITY_TOKEN: &str = "x-obs-security-token";

pub(crate) struct ObsSigner {
    bucket: Option<String>,
    signer: HuaweicloudObsSigner,
    credential: HuaweicloudObsCredential,
}

impl ObsSigner {
    pub(crate) fn new(bucket: Option<&str>, creds: &Credentials) -> Self {
        Self {
            bucket: bucket.filter(|b| !b.is_empty()).map(str::to_owned),
            signer: HuaweicloudObsSigner::new(bucket.unwrap_or_default()),
            credential: HuaweicloudObsCredential {
                access_key_id: creds.access_key_id.clone(),
                secret_access_key: creds.access_key_secret.clone(),
                security_token: creds.sts_security_token.clone(),
            },
        }
    }

    fn signable(method: &Method, canonical_url: &str, headers: HeaderMap) -> Result<http::Request<()>> {
        let mut req = http::Request::builder()
            .method(method.clone())
            .uri(canonical_url)
            .body(())
            .map_err(|e| Error::Sign(format!("build signing request failed: {e}")))?;
        *req.headers_mut() = headers;
        Ok(req)
    }

    /// 返回补上`Date`和`Authorization`的请求头
    ///
    /// `canonical_url`为桶域名形式的地址，含编码后的对象名和query
    pub(crate) fn sign_headers(
        &self,
        method: &Method,
        canonical_url: &str,
        headers: HeaderMap,
    ) -> Result<HeaderMap> {
        if self.bucket.is_none() {
            return self.sign_service(method, headers);
        }
        let mut req = Self::signable(method, canonical_url, headers)?;
        self.signer
            .sign(&mut req, &self.credential)
            .map_err(|e| Error::Sign(e.to_string()))?;
        Ok(req.into_parts().0.headers)
    }

    /// 返回签名后的query串，含`AccessKeyId`、`Expires`和`Signature`
    pub(crate) fn sign_query(
        &self,
        method: &Method,
        canonical_url: &str,
        expires_in: Duration,
    ) -> Result<String> {
        if self.bucket.is_none() {
            return Err(Error::NotSupported("presign without bucket".to_owned()));
        }
        let mut req = Self::signable(method, canonical_url, HeaderMap::new())?;
        self.signer
            .sign_query(&mut req, expires_in, &self.credential)
            .map_err(|e| Error::Sign(e.to_string()))?;
        Ok(req.uri().query().unwrap_or_default().to_owned())
    }

    fn sign_service(&self, method: &Method, mut headers: HeaderMap) -> Result<HeaderMap> {
        let cred = &self.credential;
        if let Some(token) = cred.security_token.as_deref() {
            headers.insert(SECURITY_TOKEN, header_value(token)?);
        }
        let date = gmt_format(&OffsetDateTime::now_utc())?;
        let string_to_sign = service_string_to_sign(method, &date, &headers);
        let signature = hmac_sha1_base64(&cred.secret_access_key, &string_to_sign)?;
        headers.insert(DATE, header_value(&date)?);
        let mut auth = header_value(&format!("OBS {}:{signature}", cred.access_key_id))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| Error::Sign(format!("invalid header value: {e}")))
}

fn service_string_to_sign(method: &Method, date: &str, headers: &HeaderMap) -> String {
    let mut obs_headers: Vec<(&str, &str)> = headers
        .iter()
        .filter(|(k, _)| k.as_str().starts_with("x-obs-"))
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v.trim())))
        .collect();
    obs_headers.sort();
    let mut s = format!("{method}\n\n\n{date}\n");
    for (k, v) in obs_headers {
        s.push_str(k);
        s.push(':');
        s.push_str(v);
        s.push('\n');
    }
    s.push('/');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "AK".to_owned(),
            access_key_secret: "SK".to_owned(),
            sts_security_token: token.map(str::to_owned),
            expires_at: None,
        }
    }

    #[test]
    fn service_request_resource_is_root() {
        let mut headers = HeaderMap::new();
        headers.insert("x-obs-acl", HeaderValue::from_static(" private "));
        headers.insert("content-length", HeaderValue::from_static("0"));
        assert_eq!(
            service_string_to_sign(&Method::GET, "Thu, 13 Nov 2025 13:32:03 GMT", &headers),
            "GET\n\n\nThu, 13 Nov 2025 13:32:03 GMT\nx-obs-acl:private\n/"
        );
    }

    #[test]
    fn service_request_carries_token() {
        let signer = ObsSigner::new(None, &creds(Some("tok")));
        let headers = signer
            .sign_headers(&Method::GET, "https://obs.cn-north-4.myhuaweicloud.com/", HeaderMap::new())
            .unwrap();
        assert_eq!(headers.get(SECURITY_TOKEN).unwrap(), "tok");
        assert!(headers.get(DATE).is_some());
        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("OBS AK:"));
        // base64(sha1)为28个字符
        assert_eq!(auth.len(), "OBS AK:".len() + 28);
    }

    #[test]
    fn bucket_request_is_signed() {
        let signer = ObsSigner::new(Some("bkt"), &creds(None));
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let headers = signer
            .sign_headers(
                &Method::PUT,
                "https://bkt.obs.cn-north-4.myhuaweicloud.com/a.txt?acl",
                headers,
            )
            .unwrap();
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
        assert!(headers.get(DATE).is_some());
        assert!(headers.get(AUTHORIZATION).unwrap().to_str().unwrap().starts_with("OBS AK:"));
    }

    #[test]
    fn presign_needs_bucket() {
        let signer = ObsSigner::new(None, &creds(None));
        let err = signer
            .sign_query(&Method::GET, "https://obs.cn-north-4.myhuaweicloud.com/", Duration::from_secs(60))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotSupported);
    }
}
