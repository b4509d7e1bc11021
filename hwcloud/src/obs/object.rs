//! 对象操作

use super::{ObsBody, ObsClient, ObsRequest};
use crate::error::{Error, Result, ResultExt};
use bon::Builder;
use bytes::Bytes;
use reqwest::{Body, Method};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::io::ReaderStream;

const META_PREFIX: &str = "x-obs-meta-";

// region:    --- list objects
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListObjectsOutput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub marker: Option<String>,
    /// 只有设置了`delimiter`时才会返回，否则取最后一个对象的key
    #[serde(default)]
    pub next_marker: Option<String>,
    #[serde(default)]
    pub max_keys: Option<u32>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub contents: Vec<ObjectContent>,
    #[serde(default)]
    pub common_prefixes: Vec<CommonPrefix>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectContent {
    pub key: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(rename = "ETag", default)]
    pub etag: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub storage_class: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefix {
    pub prefix: String,
}

impl ListObjectsOutput {
    /// 下一页的marker，没有下一页时为`None`
    pub fn next_marker(&self) -> Option<&str> {
        if !self.is_truncated {
            return None;
        }
        self.next_marker
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.contents.last().map(|c| c.key.as_str()))
    }
}

#[derive(Builder, Debug)]
#[builder(on(String, into))]
pub struct ListObjects<'a> {
    #[builder(start_fn)]
    client: &'a ObsClient,
    #[builder(start_fn)]
    bucket: &'a str,
    prefix: Option<String>,
    marker: Option<String>,
    delimiter: Option<String>,
    /// 最大1000
    max_keys: Option<u32>,
}

impl ListObjects<'_> {
    pub async fn send(&self) -> Result<ListObjectsOutput> {
        let req = ObsRequest::new(Method::GET, Some(self.bucket), "")
            .query_opt("prefix", self.prefix.as_deref().filter(|s| !s.is_empty()))
            .query_opt("marker", self.marker.as_deref().filter(|s| !s.is_empty()))
            .query_opt("delimiter", self.delimiter.as_deref().filter(|s| !s.is_empty()))
            .query_opt("max-keys", self.max_keys.filter(|n| *n > 0));
        let resp = self
            .client
            .send(req)
            .await
            .context(format!("list objects of bucket {}", self.bucket))?;
        resp.xml()
    }
}
// endregion: --- list objects

// region:    --- put object
pub enum PutObjectBody<'a> {
    Bytes(Bytes),
    FilePath(&'a Path),
}

impl<'a> PutObjectBody<'a> {
    pub(crate) async fn into_obs_body(self) -> Result<ObsBody> {
        Ok(match self {
            PutObjectBody::Bytes(b) => ObsBody::Bytes(b),
            PutObjectBody::FilePath(path) => {
                let file = tokio::fs::File::open(path).await?;
                let len = file.metadata().await?.len();
                ObsBody::Stream(Body::wrap_stream(ReaderStream::new(file)), len)
            }
        })
    }
}

/// 上传对象的公共请求头
#[derive(Builder, Clone, Debug, Default)]
#[builder(on(String, into))]
pub struct ObjectHeaders {
    pub content_type: Option<String>,
    /// private / public-read / public-read-write
    pub acl: Option<String>,
    /// STANDARD / WARM / COLD
    pub storage_class: Option<String>,
    /// 自定义元数据，key不带`x-obs-meta-`前缀
    #[builder(default)]
    pub meta: BTreeMap<String, String>,
}

impl ObjectHeaders {
    pub(crate) fn apply<'a>(&self, mut req: ObsRequest<'a>) -> ObsRequest<'a> {
        req = req
            .header_opt("content-type", self.content_type.as_deref())
            .header_opt("x-obs-acl", self.acl.as_deref())
            .header_opt("x-obs-storage-class", self.storage_class.as_deref());
        for (k, v) in &self.meta {
            req = req.header(&format!("{META_PREFIX}{}", k.to_ascii_lowercase()), v.clone());
        }
        req
    }
}
// endregion: --- put object

// region:    --- get object
/// 闭区间，`end`为`None`时读取到末尾
#[derive(Clone, Copy, Debug)]
pub struct ObjectRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ObjectRange {
    pub(crate) fn header(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{end}", self.start),
            None => format!("bytes={}-", self.start),
        }
    }
}

#[derive(Debug)]
pub struct GetObjectOutput {
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub body: Bytes,
}

#[derive(Debug)]
pub struct ObjectMeta {
    pub content_length: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub storage_class: Option<String>,
    pub meta: BTreeMap<String, String>,
}

fn user_meta(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| {
            let key = k.as_str().strip_prefix(META_PREFIX)?;
            Some((key.to_owned(), v.to_str().ok()?.to_owned()))
        })
        .collect()
}
// endregion: --- get object

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopyObjectOutput {
    #[serde(default)]
    pub last_modified: String,
    #[serde(rename = "ETag", default)]
    pub etag: String,
}

pub(crate) fn copy_source(bucket: &str, key: &str) -> String {
    format!("/{bucket}/{}", super::encode_key(key))
}

impl ObsClient {
    pub fn list_objects<'a>(&'a self, bucket: &'a str) -> ListObjectsBuilder<'a> {
        ListObjects::builder(self, bucket)
    }

    /// 返回对象的ETag
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: PutObjectBody<'_>,
        headers: &ObjectHeaders,
    ) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidName("empty object key".to_owned()));
        }
        let mut req = headers.apply(ObsRequest::new(Method::PUT, Some(bucket), key));
        req.body = body.into_obs_body().await?;
        let resp = self
            .send(req)
            .await
            .context(format!("put object {bucket}/{key}"))?;
        Ok(resp.header("etag").unwrap_or_default())
    }

    pub async fn get_object(&self, bucket: &str, key: &str, range: Option<ObjectRange>) -> Result<GetObjectOutput> {
        let range = range.map(|r| r.header());
        let req = ObsRequest::new(Method::GET, Some(bucket), key).header_opt("range", range.as_deref());
        let resp = self
            .send(req)
            .await
            .context(format!("get object {bucket}/{key}"))?;
        Ok(GetObjectOutput {
            content_type: resp.header("content-type"),
            etag: resp.header("etag"),
            last_modified: resp.header("last-modified"),
            meta: user_meta(&resp.headers),
            body: resp.body,
        })
    }

    /// 下载对象到本地文件，返回写入的字节数
    pub async fn get_object_to_file(&self, bucket: &str, key: &str, path: impl AsRef<Path>) -> Result<u64> {
        let out = self.get_object(bucket, key, None).await?;
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path.as_ref(), &out.body).await?;
        Ok(out.body.len() as u64)
    }

    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        let resp = self
            .send(ObsRequest::new(Method::HEAD, Some(bucket), key))
            .await
            .context(format!("head object {bucket}/{key}"))?;
        Ok(ObjectMeta {
            content_length: resp
                .header("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            content_type: resp.header("content-type"),
            etag: resp.header("etag"),
            last_modified: resp.header("last-modified"),
            storage_class: resp.header("x-obs-storage-class"),
            meta: user_meta(&resp.headers),
        })
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.send(ObsRequest::new(Method::DELETE, Some(bucket), key))
            .await
            .context(format!("delete object {bucket}/{key}"))?;
        Ok(())
    }

    /// 设置了`headers.meta`时替换元数据，否则沿用源对象的元数据
    pub async fn copy_object(
        &self,
        bucket: &str,
        key: &str,
        src_bucket: &str,
        src_key: &str,
        headers: &ObjectHeaders,
    ) -> Result<CopyObjectOutput> {
        let directive = if headers.meta.is_empty() && headers.content_type.is_none() {
            "COPY"
        } else {
            "REPLACE"
        };
        let req = headers
            .apply(ObsRequest::new(Method::PUT, Some(bucket), key))
            .header("x-obs-copy-source", copy_source(src_bucket, src_key))
            .header("x-obs-metadata-directive", directive);
        let resp = self
            .send(req)
            .await
            .context(format!("copy object {src_bucket}/{src_key} to {bucket}/{key}"))?;
        resp.xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::from_xml;
    use reqwest::header::HeaderMap;

    #[test]
    fn list_objects_xml() {
        let xml = r#"<ListBucketResult xmlns="http://obs.myhwclouds.com/doc/2015-06-30/">
  <Name>bkt</Name><Prefix>dir/</Prefix><Marker></Marker><MaxKeys>2</MaxKeys><IsTruncated>true</IsTruncated>
  <Contents><Key>dir/a</Key><LastModified>2024-01-01T00:00:00.000Z</LastModified><ETag>"e1"</ETag><Size>3</Size><StorageClass>STANDARD</StorageClass></Contents>
  <Contents><Key>dir/b</Key><ETag>"e2"</ETag><Size>5</Size></Contents>
  <CommonPrefixes><Prefix>dir/sub/</Prefix></CommonPrefixes>
</ListBucketResult>"#;
        let out: ListObjectsOutput = from_xml(xml.as_bytes()).unwrap();
        assert_eq!(out.contents.len(), 2);
        assert_eq!(out.contents[0].etag, "\"e1\"");
        assert_eq!(out.common_prefixes[0].prefix, "dir/sub/");
        assert_eq!(out.next_marker(), Some("dir/b"));
    }

    #[test]
    fn range_header() {
        let r = ObjectRange { start: 0, end: Some(99) };
        assert_eq!(r.header(), "bytes=0-99");
        let r = ObjectRange { start: 100, end: None };
        assert_eq!(r.header(), "bytes=100-");
    }

    #[test]
    fn headers_with_meta() {
        let h = ObjectHeaders::builder()
            .content_type("text/plain")
            .meta(BTreeMap::from([("Owner".to_owned(), "ops".to_owned())]))
            .build();
        let req = h.apply(ObsRequest::new(Method::PUT, Some("b"), "k"));
        assert!(req.headers.contains(&("x-obs-meta-owner".to_owned(), "ops".to_owned())));
        assert!(req.headers.contains(&("content-type".to_owned(), "text/plain".to_owned())));
    }

    #[test]
    fn meta_from_headers() {
        let mut h = HeaderMap::new();
        h.insert("x-obs-meta-owner", "ops".parse().unwrap());
        h.insert("etag", "\"x\"".parse().unwrap());
        assert_eq!(user_meta(&h), BTreeMap::from([("owner".to_owned(), "ops".to_owned())]));
        assert_eq!(copy_source("b", "a b"), "/b/a%20b");
    }
}
