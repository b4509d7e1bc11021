//! 桶的CORS、静态网站和标签配置
//!
//! 未配置时返回空结果而不是`NotFound`

use super::{ObsClient, ObsRequest};
use crate::error::{Error, Result, ResultExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 错误码为`code`时视为未配置
fn is_absent(e: &Error, code: &str) -> bool {
    e.vendor_code() == Some(code) || e.to_string().contains(code)
}

// region:    --- cors
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename = "CORSConfiguration")]
struct CorsConfiguration {
    #[serde(rename = "CORSRule", default)]
    rules: Vec<CorsRule>,
}

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct CorsRule {
    /// 读取时填充为规则序号
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "AllowedMethod", default)]
    pub allowed_methods: Vec<String>,
    #[serde(rename = "AllowedOrigin", default)]
    pub allowed_origins: Vec<String>,
    #[serde(rename = "AllowedHeader", default)]
    pub allowed_headers: Vec<String>,
    #[serde(rename = "MaxAgeSeconds", default)]
    pub max_age_seconds: Option<u32>,
    #[serde(rename = "ExposeHeader", default)]
    pub expose_headers: Vec<String>,
}
// endregion: --- cors

// region:    --- website
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WebsiteConfiguration {
    index_document: IndexDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_document: Option<ErrorDocument>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct IndexDocument {
    suffix: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorDocument {
    key: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WebsiteConf {
    pub index: String,
    pub error_document: String,
    /// 读取时填充
    pub url: String,
}
// endregion: --- website

// region:    --- tagging
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Tagging {
    #[serde(default)]
    tag_set: TagSet,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct TagSet {
    #[serde(rename = "Tag", default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    #[serde(default)]
    value: String,
}
// endregion: --- tagging

impl ObsClient {
    /// 静态网站访问域名
    pub fn website_url(&self, bucket: &str) -> String {
        format!("https://{bucket}.obs-website.{}.myhuaweicloud.com", self.region())
    }

    // region:    --- cors
    pub async fn bucket_cors(&self, bucket: &str) -> Result<Vec<CorsRule>> {
        let resp = match self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("cors"))
            .await
        {
            Ok(resp) => resp,
            Err(e) if is_absent(&e, "NoSuchCORSConfiguration") => return Ok(Vec::new()),
            Err(e) => return Err(e).context(format!("get cors of bucket {bucket}")),
        };
        let conf: CorsConfiguration = resp.xml()?;
        Ok(conf
            .rules
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = Some(i.to_string());
                r
            })
            .collect())
    }

    /// 覆盖已有的全部规则
    pub async fn set_bucket_cors(&self, bucket: &str, rules: &[CorsRule]) -> Result<()> {
        let conf = CorsConfiguration {
            rules: rules.to_vec(),
        };
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("cors")
            .xml("CORSConfiguration", &conf)?;
        self.send(req)
            .await
            .context(format!("set cors of bucket {bucket}"))?;
        Ok(())
    }

    pub async fn delete_bucket_cors(&self, bucket: &str) -> Result<()> {
        self.send(ObsRequest::new(Method::DELETE, Some(bucket), "").sub("cors"))
            .await
            .context(format!("delete cors of bucket {bucket}"))?;
        Ok(())
    }
    // endregion: --- cors

    // region:    --- website
    pub async fn bucket_website(&self, bucket: &str) -> Result<Option<WebsiteConf>> {
        let resp = match self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("website"))
            .await
        {
            Ok(resp) => resp,
            Err(e) if is_absent(&e, "NoSuchWebsiteConfiguration") => return Ok(None),
            Err(e) => return Err(e).context(format!("get website of bucket {bucket}")),
        };
        let conf: WebsiteConfiguration = resp.xml()?;
        Ok(Some(WebsiteConf {
            index: conf.index_document.suffix,
            error_document: conf.error_document.map(|d| d.key).unwrap_or_default(),
            url: self.website_url(bucket),
        }))
    }

    pub async fn set_bucket_website(&self, bucket: &str, conf: &WebsiteConf) -> Result<()> {
        let body = WebsiteConfiguration {
            index_document: IndexDocument {
                suffix: conf.index.clone(),
            },
            error_document: (!conf.error_document.is_empty()).then(|| ErrorDocument {
                key: conf.error_document.clone(),
            }),
        };
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("website")
            .xml("WebsiteConfiguration", &body)?;
        self.send(req)
            .await
            .context(format!("set website of bucket {bucket}"))?;
        Ok(())
    }

    pub async fn delete_bucket_website(&self, bucket: &str) -> Result<()> {
        self.send(ObsRequest::new(Method::DELETE, Some(bucket), "").sub("website"))
            .await
            .context(format!("delete website of bucket {bucket}"))?;
        Ok(())
    }
    // endregion: --- website

    // region:    --- tagging
    pub async fn bucket_tags(&self, bucket: &str) -> Result<BTreeMap<String, String>> {
        let resp = match self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("tagging"))
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.is_not_found() || is_absent(&e, "NoSuchTagSet") => return Ok(BTreeMap::new()),
            Err(e) => return Err(e).context(format!("get tags of bucket {bucket}")),
        };
        let tagging: Tagging = resp.xml()?;
        Ok(tagging
            .tag_set
            .tags
            .into_iter()
            .map(|t| (t.key, t.value))
            .collect())
    }

    /// 先删除全部标签，`tags`为空时不再设置
    pub async fn set_bucket_tags(&self, bucket: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        self.delete_bucket_tags(bucket).await?;
        if tags.is_empty() {
            return Ok(());
        }
        let body = Tagging {
            tag_set: TagSet {
                tags: tags
                    .iter()
                    .map(|(k, v)| Tag {
                        key: k.clone(),
                        value: v.clone(),
                    })
                    .collect(),
            },
        };
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("tagging")
            .xml("Tagging", &body)?;
        self.send(req)
            .await
            .context(format!("set tags of bucket {bucket}"))?;
        Ok(())
    }

    pub async fn delete_bucket_tags(&self, bucket: &str) -> Result<()> {
        self.send(ObsRequest::new(Method::DELETE, Some(bucket), "").sub("tagging"))
            .await
            .context(format!("delete tags of bucket {bucket}"))?;
        Ok(())
    }
    // endregion: --- tagging
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReport;
    use crate::obs::{from_xml, to_xml};

    #[test]
    fn cors_rules_xml() {
        let xml = "<CORSConfiguration><CORSRule><AllowedMethod>GET</AllowedMethod><AllowedMethod>PUT</AllowedMethod>\
                   <AllowedOrigin>*</AllowedOrigin><MaxAgeSeconds>100</MaxAgeSeconds></CORSRule></CORSConfiguration>";
        let conf: CorsConfiguration = from_xml(xml.as_bytes()).unwrap();
        assert_eq!(conf.rules.len(), 1);
        assert_eq!(conf.rules[0].allowed_methods, ["GET", "PUT"]);
        assert_eq!(conf.rules[0].max_age_seconds, Some(100));
        assert!(conf.rules[0].allowed_headers.is_empty());
    }

    #[test]
    fn tagging_body() {
        let body = Tagging {
            tag_set: TagSet {
                tags: vec![Tag {
                    key: "env".to_owned(),
                    value: "prod".to_owned(),
                }],
            },
        };
        assert_eq!(
            to_xml("Tagging", &body).unwrap(),
            "<Tagging><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tagging>"
        );
    }

    #[test]
    fn website_body_without_error_document() {
        let body = WebsiteConfiguration {
            index_document: IndexDocument {
                suffix: "index.html".to_owned(),
            },
            error_document: None,
        };
        let xml = to_xml("WebsiteConfiguration", &body).unwrap();
        assert!(xml.contains("<IndexDocument><Suffix>index.html</Suffix></IndexDocument>"));
        assert!(!xml.contains("ErrorDocument"));
    }

    #[test]
    fn absent_configuration() {
        let e = Error::api(
            404,
            ErrorReport {
                status: 404,
                code: Some("NoSuchCORSConfiguration".to_owned()),
                ..Default::default()
            },
        );
        assert!(is_absent(&e, "NoSuchCORSConfiguration"));
        assert!(!is_absent(&e, "NoSuchTagSet"));
    }
}
