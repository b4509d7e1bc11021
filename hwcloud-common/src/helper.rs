use crate::Error;
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// `X-Sdk-Date`的格式: YYYYMMDDTHHMMSSZ
///
/// eg: 20210101T000000Z
const SDK_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

pub fn sdk_date_format(date_time: &OffsetDateTime) -> Result<String, Error> {
    date_time
        .to_offset(time::UtcOffset::UTC)
        .format(SDK_DATE_FORMAT)
        .map_err(|e| Error::Sign(format!("format sdk date failed: {e}")))
}

pub fn sdk_date_parse(s: &str) -> Result<OffsetDateTime, Error> {
    PrimitiveDateTime::parse(s, SDK_DATE_FORMAT)
        .map(|dt| dt.assume_utc())
        .map_err(|e| Error::Sign(format!("invalid X-Sdk-Date `{s}`: {e}")))
}

/// 输出格式: Day, DD Mon YYYY hh:mm:ss GMT
///
/// eg: Thu, 13 Nov 2025 13:32:03 GMT
pub fn gmt_format(date_time: &OffsetDateTime) -> Result<String, Error> {
    use time::format_description::well_known::Rfc2822;
    date_time
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc2822)
        .map(|s| s.replace("+0000", "GMT"))
        .map_err(|e| Error::Common(format!("format gmt date failed: {e}")))
}

pub fn into_header_map<'a, I>(pairs: I) -> Result<HeaderMap, Error>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut map = HeaderMap::new();
    for (k, v) in pairs {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| Error::Header(format!("invalid header name `{k}`: {e}")))?;
        let value = HeaderValue::from_str(v)
            .map_err(|e| Error::Header(format!("invalid header value for `{k}`: {e}")))?;
        map.append(name, value);
    }
    Ok(map)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn hmac_sha256_hex(secret: &[u8], str_to_sign: &[u8]) -> Result<String, Error> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::Sign(format!("invalid hmac key: {e}")))?;
    mac.update(str_to_sign);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// HMAC-SHA1后再base64，OBS签名使用
pub fn hmac_sha1_base64(secret: &str, str_to_sign: &str) -> Result<String, Error> {
    type HmacSha1 = Hmac<Sha1>;
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Sign(format!("invalid hmac key: {e}")))?;
    mac.update(str_to_sign.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn sdk_date_round_trip() {
        let dt = datetime!(2021-01-01 0:00:00 UTC);
        let s = sdk_date_format(&dt).unwrap();
        assert_eq!(s, "20210101T000000Z");
        assert_eq!(sdk_date_parse(&s).unwrap(), dt);
        assert!(sdk_date_parse("2021-01-01").is_err());
    }

    #[test]
    fn gmt_format_test() {
        let dt = datetime!(2025-11-13 13:32:03 UTC);
        assert_eq!(gmt_format(&dt).unwrap(), "Thu, 13 Nov 2025 13:32:03 GMT");
    }

    #[test]
    fn sha256_of_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
