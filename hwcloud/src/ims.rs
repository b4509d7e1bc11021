//! 镜像
//!
//! [IMS API文档](https://support.huaweicloud.com/api-ims/ims_03_0001.html)

use crate::error::{Error, Result, ResultExt};
use crate::job::{JobService, JobSubmitted, WaitJob};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::{ImageStatus, ImageType};
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// gold / private / shared / market
    #[serde(rename = "__imagetype", default)]
    pub image_type: String,
    #[serde(rename = "__image_source_type", default)]
    pub image_source_type: String,
    #[serde(rename = "__os_type", default)]
    pub os_type: String,
    #[serde(rename = "__os_version", default)]
    pub os_version: String,
    #[serde(rename = "__platform", default)]
    pub platform: String,
    #[serde(rename = "__os_bit", default)]
    pub os_bit: String,
    #[serde(rename = "__support_arm", default)]
    pub support_arm: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub min_disk: u32,
    #[serde(default)]
    pub min_ram: u32,
    #[serde(default)]
    pub disk_format: String,
    #[serde(rename = "__image_size", default)]
    pub image_size: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub enterprise_project_id: String,
}

impl Image {
    pub fn status(&self) -> ImageStatus {
        ImageStatus::from_vendor(&self.status)
    }

    pub fn image_type(&self) -> ImageType {
        ImageType::from_vendor(&self.image_type)
    }

    pub fn size_bytes(&self) -> u64 {
        self.image_size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn os_info(&self) -> OsInfo {
        OsInfo::normalize(
            &self.image_source_type,
            if self.architecture.is_empty() && self.support_arm == "true" {
                "aarch64"
            } else {
                self.architecture.as_str()
            },
            &self.os_type,
            &self.platform,
        )
    }
}

// region:    --- os info
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsType {
    Linux,
    Windows,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsArch {
    X86_64,
    Aarch64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bios {
    Bios,
    Uefi,
}

/// 镜像的操作系统信息
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsInfo {
    pub os_type: OsType,
    pub arch: OsArch,
    pub bios: Bios,
    pub distro: String,
    pub is_bare_metal: bool,
}

impl OsInfo {
    /// 由`__image_source_type`、架构、`__os_type`和`__platform`推导
    pub fn normalize(image_source_type: &str, arch: &str, os_type: &str, platform: &str) -> Self {
        let arch = match arch.to_ascii_lowercase().as_str() {
            "aarch64" | "arm64" | "arm" => OsArch::Aarch64,
            _ => OsArch::X86_64,
        };
        let os_type = if os_type.eq_ignore_ascii_case("windows") {
            OsType::Windows
        } else {
            OsType::Linux
        };
        Self {
            os_type,
            arch,
            // arm 只能 UEFI 启动
            bios: if arch == OsArch::Aarch64 { Bios::Uefi } else { Bios::Bios },
            distro: platform.to_owned(),
            is_bare_metal: image_source_type == "uds" && platform.is_empty(),
        }
    }
}

/// 导入镜像时的`os_version`，如`CentOS 7.6 64bit`、`Ubuntu 20.04 server 64bit`
///
/// 无法识别的发行版使用`Other Linux(64 bit)`
pub fn format_os_version(os_type: OsType, distro: &str, version: &str, arch: OsArch) -> String {
    let bits = "64bit";
    let d = distro.to_ascii_lowercase();
    let major_minor = |v: &str| v.split('.').take(2).collect::<Vec<_>>().join(".");
    match os_type {
        OsType::Windows => {
            let year = ["2022", "2019", "2016", "2012"]
                .into_iter()
                .find(|y| version.contains(y))
                .unwrap_or("2019");
            let r2 = if year == "2012" { " R2" } else { "" };
            format!("Windows Server {year}{r2} Standard {bits}")
        }
        OsType::Linux => {
            let arm = if arch == OsArch::Aarch64 { " ARM" } else { "" };
            let v = major_minor(version);
            match d.as_str() {
                "centos" => format!("CentOS {v} {bits}{arm}"),
                "ubuntu" => format!("Ubuntu {v} server {bits}{arm}"),
                "debian" => format!("Debian GNU/Linux {} {bits}", v.split('.').next().unwrap_or(&v)),
                "euleros" => format!("EulerOS {v} {bits}{arm}"),
                "openeuler" => format!("openEuler {v} {bits}{arm}"),
                "fedora" => format!("Fedora {} {bits}", v.split('.').next().unwrap_or(&v)),
                "opensuse" | "suse" => format!("OpenSUSE {v} {bits}"),
                "oracle" | "oraclelinux" => format!("Oracle Linux Server release {v} {bits}"),
                "redhat" | "rhel" => format!("Redhat Linux Enterprise {v} {bits}"),
                _ => "Other Linux(64 bit)".to_owned(),
            }
        }
    }
}
// endregion: --- os info

/// 从OBS桶快速导入镜像，返回镜像id
///
/// 镜像文件需要已经上传到`bucket`
#[derive(Builder)]
#[builder(on(String, into))]
pub struct ImportImage<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    name: String,
    bucket: String,
    key: String,
    os_version: String,
    /// GB
    min_disk: u32,
    #[builder(default)]
    description: String,
    #[builder(default = Duration::from_secs(15))]
    interval: Duration,
    #[builder(default = Duration::from_secs(3600))]
    timeout: Duration,
}

impl ImportImage<'_> {
    pub async fn send(&self) -> Result<String> {
        let body = json!({
            "name": self.name,
            "os_version": self.os_version,
            "image_url": format!("{}:{}", self.bucket, self.key),
            "min_disk": self.min_disk,
            "description": self.description,
            "type": "ECS",
        });
        let resp = self
            .region
            .post(Service::Ims, "cloudimages/quickimport/action", &body)
            .await
            .context(format!("import image {}", self.name))?;
        let submitted: JobSubmitted = serde_json::from_value(resp)?;
        let job = WaitJob::builder(self.region, JobService::Ims, &submitted.job_id)
            .interval(self.interval)
            .timeout(self.timeout)
            .build()
            .wait()
            .await
            .context(format!("import image {}", self.name))?;
        job.entity("image_id")
            .ok_or_else(|| Error::Fatal(format!("job {} returned no image_id", submitted.job_id)))
    }
}

impl Region {
    /// `image_type`如`gold`、`private`，为空时列出所有可见镜像
    pub async fn images(&self, image_type: Option<&str>, name: Option<&str>) -> Result<Vec<Image>> {
        let filters = [("__imagetype", image_type), ("name", name)];
        let mut q = query(
            filters
                .into_iter()
                .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v))),
        );
        q.push(("sort_key".to_owned(), "created_at".to_owned()));
        self.list_all_as(Service::Ims, "cloudimages", &q, &Paginator::marker("images", Some(500)))
            .await
            .context("list images")
    }

    pub async fn image(&self, image_id: &str) -> Result<Image> {
        let resp = self
            .get(Service::Ims, "cloudimages", &query([("id", image_id)]))
            .await
            .context(format!("get image {image_id}"))?;
        let images: Vec<Image> = decode(&resp, "images")?;
        let mut it = images.into_iter();
        match (it.next(), it.next()) {
            (Some(img), None) => Ok(img),
            (None, _) => Err(Error::NotFound(format!("image {image_id}"))),
            (Some(_), Some(_)) => Err(Error::DuplicateId(format!("image {image_id}"))),
        }
    }

    pub async fn delete_image(&self, image_id: &str) -> Result<()> {
        self.delete(Service::Ims, &format!("images/{image_id}"))
            .await
            .context(format!("delete image {image_id}"))?;
        Ok(())
    }
}
