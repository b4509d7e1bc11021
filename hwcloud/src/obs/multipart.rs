//! 分段上传

use super::object::{ObjectHeaders, ObjectRange, PutObjectBody, copy_source};
use super::{ObsClient, ObsRequest};
use crate::error::{Error, Result, ResultExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CopyPartResult {
    #[serde(rename = "ETag")]
    etag: String,
}

#[derive(Debug, Serialize)]
struct CompleteMultipartUpload<'a> {
    #[serde(rename = "Part")]
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Part<'a> {
    part_number: usize,
    #[serde(rename = "ETag")]
    etag: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompleteMultipartUploadOutput {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "ETag", default)]
    pub etag: String,
}

// region:    --- list uploads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListMultipartUploadsResult {
    #[serde(default)]
    next_key_marker: Option<String>,
    #[serde(default)]
    next_upload_id_marker: Option<String>,
    #[serde(default)]
    is_truncated: bool,
    #[serde(rename = "Upload", default)]
    uploads: Vec<MultipartUpload>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultipartUpload {
    pub key: String,
    pub upload_id: String,
    #[serde(default)]
    pub initiator: Option<Initiator>,
    #[serde(default)]
    pub initiated: String,
    #[serde(default)]
    pub storage_class: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Initiator {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
}
// endregion: --- list uploads

impl ObsClient {
    /// 返回upload id
    pub async fn initiate_multipart_upload(&self, bucket: &str, key: &str, headers: &ObjectHeaders) -> Result<String> {
        let req = headers
            .apply(ObsRequest::new(Method::POST, Some(bucket), key))
            .sub("uploads");
        let resp = self
            .send(req)
            .await
            .context(format!("initiate multipart upload {bucket}/{key}"))?;
        Ok(resp.xml::<InitiateMultipartUploadResult>()?.upload_id)
    }

    /// `part_number`从1开始，返回段的ETag
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: usize,
        body: PutObjectBody<'_>,
    ) -> Result<String> {
        if !(1..=10000).contains(&part_number) {
            return Err(Error::Fatal(format!("part number {part_number} out of range")));
        }
        let mut req = ObsRequest::new(Method::PUT, Some(bucket), key)
            .query("partNumber", part_number)
            .query("uploadId", upload_id);
        req.body = body.into_obs_body().await?;
        let resp = self
            .send(req)
            .await
            .context(format!("upload part {part_number} of {bucket}/{key}"))?;
        Ok(resp.header("etag").unwrap_or_default())
    }

    /// 从已有对象复制一段，`range`为闭区间
    #[allow(clippy::too_many_arguments)]
    pub async fn copy_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: usize,
        src_bucket: &str,
        src_key: &str,
        range: ObjectRange,
    ) -> Result<String> {
        let mut req = ObsRequest::new(Method::PUT, Some(bucket), key)
            .query("partNumber", part_number)
            .query("uploadId", upload_id)
            .header("x-obs-copy-source", copy_source(src_bucket, src_key));
        if range.end.is_some() {
            req = req.header("x-obs-copy-source-range", range.header());
        }
        let resp = self
            .send(req)
            .await
            .context(format!("copy part {part_number} of {bucket}/{key}"))?;
        Ok(resp.xml::<CopyPartResult>()?.etag)
    }

    /// `etags`按段号顺序排列
    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        etags: &[String],
    ) -> Result<CompleteMultipartUploadOutput> {
        let body = CompleteMultipartUpload {
            parts: etags
                .iter()
                .enumerate()
                .map(|(i, etag)| Part {
                    part_number: i + 1,
                    etag,
                })
                .collect(),
        };
        let req = ObsRequest::new(Method::POST, Some(bucket), key)
            .query("uploadId", upload_id)
            .xml("CompleteMultipartUpload", &body)?;
        let resp = self
            .send(req)
            .await
            .context(format!("complete multipart upload {bucket}/{key}"))?;
        resp.xml()
    }

    pub async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let req = ObsRequest::new(Method::DELETE, Some(bucket), key).query("uploadId", upload_id);
        self.send(req)
            .await
            .context(format!("abort multipart upload {bucket}/{key}"))?;
        Ok(())
    }

    /// 翻页直到`IsTruncated`为false
    pub async fn list_multipart_uploads(&self, bucket: &str) -> Result<Vec<MultipartUpload>> {
        let mut uploads = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut upload_id_marker: Option<String> = None;
        loop {
            let req = ObsRequest::new(Method::GET, Some(bucket), "")
                .sub("uploads")
                .query_opt("key-marker", key_marker.as_deref())
                .query_opt("upload-id-marker", upload_id_marker.as_deref());
            let resp = self
                .send(req)
                .await
                .context(format!("list multipart uploads of bucket {bucket}"))?;
            let page: ListMultipartUploadsResult = resp.xml()?;
            uploads.extend(page.uploads);
            if !page.is_truncated {
                break;
            }
            key_marker = page.next_key_marker.filter(|m| !m.is_empty());
            upload_id_marker = page.next_upload_id_marker.filter(|m| !m.is_empty());
            if key_marker.is_none() && upload_id_marker.is_none() {
                break;
            }
        }
        Ok(uploads)
    }
}
