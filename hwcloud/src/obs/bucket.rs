//! 桶的基础操作

use super::{ObsClient, ObsRequest};
use crate::error::{Error, Result, ResultExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};

// region:    --- list buckets
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketsOutput {
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, rename = "Buckets", deserialize_with = "buckets")]
    pub buckets: Vec<Bucket>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Owner {
    #[serde(rename = "ID", default)]
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub location: String,
    /// OBJECT / POSIX
    #[serde(default)]
    pub bucket_type: Option<String>,
}

fn buckets<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Vec<Bucket>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(rename = "Bucket", default)]
        bucket: Vec<Bucket>,
    }
    Ok(Wrapper::deserialize(d)?.bucket)
}
// endregion: --- list buckets

// region:    --- create bucket
#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateBucketConfiguration<'a> {
    location: Option<&'a str>,
}

/// 创建桶的可选参数
#[derive(Debug, Default)]
pub struct CreateBucketOptions<'a> {
    /// 为`None`时默认为`private`
    pub acl: Option<&'a str>,
    /// STANDARD / WARM / COLD
    pub storage_class: Option<&'a str>,
    pub enterprise_project_id: Option<&'a str>,
}
// endregion: --- create bucket

/// `HEAD`桶的结果
#[derive(Debug, Clone)]
pub struct BucketMeta {
    pub location: Option<String>,
    pub storage_class: Option<String>,
    pub epid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageInfo {
    /// 字节
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub object_number: u64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Quota {
    storage_quota: u64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StoragePolicy {
    default_storage_class: String,
}

impl ObsClient {
    /// OBS协议下总是返回桶所在区域，`query_location`为false时清空`location`
    pub async fn list_buckets(&self, query_location: bool) -> Result<ListBucketsOutput> {
        let resp = self.send(ObsRequest::new(Method::GET, None, "")).await?;
        let mut out: ListBucketsOutput = resp.xml()?;
        if !query_location {
            out.buckets.iter_mut().for_each(|b| b.location.clear());
        }
        Ok(out)
    }

    /// 桶不存在时返回`NotFound`
    pub async fn head_bucket(&self, bucket: &str) -> Result<BucketMeta> {
        let resp = self
            .send(ObsRequest::new(Method::HEAD, Some(bucket), ""))
            .await
            .context(format!("head bucket {bucket}"))?;
        Ok(BucketMeta {
            location: resp.header("x-obs-bucket-location"),
            storage_class: resp.header("x-obs-storage-class"),
            epid: resp.header("x-obs-epid"),
        })
    }

    pub async fn create_bucket(&self, bucket: &str, opts: &CreateBucketOptions<'_>) -> Result<()> {
        let body = CreateBucketConfiguration {
            location: Some(self.region()),
        };
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .header_opt("x-obs-acl", opts.acl)
            .header_opt("x-obs-storage-class", opts.storage_class)
            .header_opt("x-obs-epid", opts.enterprise_project_id)
            .xml("CreateBucketConfiguration", &body)?;
        let result = self.send(req).await.context(format!("create bucket {bucket}"));
        self.client().invalidate_buckets();
        result.map(|_| ())
    }

    pub async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let result = self
            .send(ObsRequest::new(Method::DELETE, Some(bucket), ""))
            .await
            .context(format!("delete bucket {bucket}"));
        self.client().invalidate_buckets();
        result.map(|_| ())
    }

    /// 桶的容量和对象数
    pub async fn bucket_storage_info(&self, bucket: &str) -> Result<StorageInfo> {
        let resp = self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("storageinfo"))
            .await
            .context(format!("get storage info of bucket {bucket}"))?;
        resp.xml()
    }

    /// 字节，0表示不限
    pub async fn bucket_quota(&self, bucket: &str) -> Result<u64> {
        let resp = self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("quota"))
            .await
            .context(format!("get quota of bucket {bucket}"))?;
        Ok(resp.xml::<Quota>()?.storage_quota)
    }

    pub async fn set_bucket_quota(&self, bucket: &str, bytes: u64) -> Result<()> {
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("quota")
            .xml("Quota", &Quota { storage_quota: bytes })?;
        self.send(req)
            .await
            .context(format!("set quota of bucket {bucket}"))?;
        Ok(())
    }

    pub async fn bucket_storage_class(&self, bucket: &str) -> Result<String> {
        let resp = self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("storagePolicy"))
            .await
            .context(format!("get storage class of bucket {bucket}"))?;
        Ok(resp.xml::<StoragePolicy>()?.default_storage_class)
    }

    pub async fn set_bucket_storage_class(&self, bucket: &str, class: &str) -> Result<()> {
        if !["STANDARD", "WARM", "COLD"].contains(&class) {
            return Err(Error::NotSupported(format!("storage class {class}")));
        }
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("storagePolicy")
            .xml(
                "StoragePolicy",
                &StoragePolicy {
                    default_storage_class: class.to_owned(),
                },
            )?;
        self.send(req)
            .await
            .context(format!("set storage class of bucket {bucket}"))?;
        Ok(())
    }
}
