use crate::Error;
use crate::helper::{hmac_sha256_hex, sdk_date_format, sdk_date_parse, sha256_hex};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HOST, HeaderMap, HeaderValue};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;
use url::Url;

// 华为云API签名文档：https://support.huaweicloud.com/devg-apisign/api-sign-algorithm.html

pub const ALGORITHM: &str = "SDK-HMAC-SHA256";
pub const HEADER_SDK_DATE: &str = "x-sdk-date";
pub const HEADER_CONTENT_SHA256: &str = "x-sdk-content-sha256";

// 除了`A-Za-z0-9_-~.`之外都需要编码，编码后为大写的`%HH`
const SDK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn sdk_escape(s: &str) -> String {
    utf8_percent_encode(s, SDK_ENCODE_SET).to_string()
}

pub struct SignParams<'a> {
    pub access_key_id: &'a str,
    pub access_key_secret: &'a str,
    pub method: &'a str,
    /// 签名时会把query改写为规范化后的形式，发送请求时必须使用改写后的url
    pub url: &'a mut Url,
    /// 签名后会补齐`X-Sdk-Date`、`Host`和`Authorization`
    pub headers: &'a mut HeaderMap,
    pub body: &'a [u8],
}

/// CanonicalURI: 逐段先解码再编码，保证以`/`结尾
pub fn canonical_uri(url: &Url) -> String {
    let mut path = url
        .path()
        .split('/')
        .map(|seg| sdk_escape(&percent_decode_str(seg).decode_utf8_lossy()))
        .collect::<Vec<_>>()
        .join("/");
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// CanonicalQueryString: key升序，同一个key的多个value也升序
pub fn canonical_query(url: &Url) -> String {
    let mut pairs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        pairs.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    let mut res = Vec::new();
    for (k, mut values) in pairs {
        values.sort();
        let k = sdk_escape(&k);
        for v in values {
            res.push(format!("{k}={}", sdk_escape(&v)));
        }
    }
    res.join("&")
}

/// 返回(CanonicalHeaders, SignedHeaders)
pub fn canonical_headers(headers: &HeaderMap) -> Result<(String, String), Error> {
    // HeaderMap中的key都已经是小写的
    let names = headers.keys().map(|k| k.as_str()).collect::<BTreeSet<_>>();
    let mut can_headers = String::new();
    for name in &names {
        let mut values = headers
            .get_all(*name)
            .iter()
            .map(|v| {
                v.to_str()
                    .map(|s| s.trim().to_owned())
                    .map_err(|e| Error::Sign(format!("header `{name}` is not visible ascii: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        values.sort();
        for v in values {
            can_headers.push_str(&format!("{name}:{v}\n"));
        }
    }
    let signed_headers = names.into_iter().collect::<Vec<_>>().join(";");
    Ok((can_headers, signed_headers))
}

fn host_of(url: &Url) -> Result<String, Error> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::Sign(format!("url `{url}` has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

fn header_value(s: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(s).map_err(|e| Error::Sign(format!("invalid header value: {e}")))
}

/// 签名入口
///
/// `X-Sdk-Date`存在时会解析并复用，否则使用当前UTC时间
pub fn sign(params: SignParams<'_>) -> Result<(), Error> {
    let SignParams {
        access_key_id,
        access_key_secret,
        method,
        url,
        headers,
        body,
    } = params;

    // region:    --- date & host
    let date = match headers.get(HEADER_SDK_DATE) {
        Some(v) => {
            let s = v
                .to_str()
                .map_err(|e| Error::Sign(format!("invalid X-Sdk-Date: {e}")))?;
            sdk_date_format(&sdk_date_parse(s)?)?
        }
        None => {
            let s = sdk_date_format(&OffsetDateTime::now_utc())?;
            headers.insert(HEADER_SDK_DATE, header_value(&s)?);
            s
        }
    };
    if !headers.contains_key(HOST) {
        headers.insert(HOST, header_value(&host_of(url)?)?);
    }
    // endregion: --- date & host

    let can_uri = canonical_uri(url);
    let can_query = canonical_query(url);
    url.set_query(if can_query.is_empty() {
        None
    } else {
        Some(&can_query)
    });
    let (can_headers, signed_headers) = canonical_headers(headers)?;
    let body_hash = match headers.get(HEADER_CONTENT_SHA256) {
        Some(v) => v
            .to_str()
            .map_err(|e| Error::Sign(format!("invalid X-Sdk-Content-Sha256: {e}")))?
            .to_owned(),
        None => sha256_hex(body),
    };

    let can_req = format!(
        "{method}\n{can_uri}\n{can_query}\n{can_headers}\n{signed_headers}\n{body_hash}"
    );
    let str_to_sign = format!("{ALGORITHM}\n{date}\n{}", sha256_hex(can_req.as_bytes()));
    let signature = hmac_sha256_hex(access_key_secret.as_bytes(), str_to_sign.as_bytes())?;

    let authorization = format!(
        "{ALGORITHM} Access={access_key_id}, SignedHeaders={signed_headers}, Signature={signature}"
    );
    let mut auth_val = header_value(&authorization)?;
    auth_val.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_val);
    Ok(())
}
