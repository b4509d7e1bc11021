use crate::error::{Error, Result};
use crate::service::Service;
use reqwest::Method;
use serde::Deserialize;
use url::Url;

// region:    --- Project
/// IAM项目，名称形如`cn-north-4`或者子项目`cn-north-4_abc`
#[derive(Clone, Debug, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Project {
    /// 名称中第一个`_`之前的部分
    pub fn region_id(&self) -> &str {
        self.name.split('_').next().unwrap_or(&self.name)
    }

    pub fn is_mos(&self) -> bool {
        self.name.eq_ignore_ascii_case("mos")
    }

    pub fn health_status(&self) -> &'static str {
        if self.enabled { "normal" } else { "suspended" }
    }
}
// endregion: --- Project

/// url解析结果
#[derive(Clone, Debug)]
pub struct Resolved {
    pub url: Url,
    pub project_id: Option<String>,
}

/// 根据(service, region, resource)生成完整url
#[derive(Clone, Debug)]
pub struct Router {
    default_region: String,
    endpoint_override: Option<Url>,
}

impl Router {
    pub fn new(default_region: impl Into<String>, endpoint_override: Option<Url>) -> Self {
        Self {
            default_region: default_region.into(),
            endpoint_override,
        }
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// `method`只用于日志
    pub fn resolve(
        &self,
        projects: &[Project],
        service: Service,
        region_id: &str,
        resource: &str,
        method: &Method,
    ) -> Result<Resolved> {
        let region_id = if region_id.is_empty() {
            self.default_region.as_str()
        } else {
            region_id
        };
        // 子项目`{region}_{suffix}`对应的服务域名使用`_`之前的region
        let (host_region, project_id) = match projects.iter().find(|p| p.name == region_id) {
            Some(p) => (p.region_id(), Some(p.id.clone())),
            None => (region_id.split('_').next().unwrap_or(region_id), None),
        };
        if service.needs_project() && project_id.is_none() {
            return Err(Error::NotFound(format!(
                "no project for region `{region_id}` required by service `{service}`"
            )));
        }

        let raw = service
            .template()
            .replace("{region}", host_region)
            .replace("{project}", project_id.as_deref().unwrap_or_default())
            .replace("{resource}", resource.trim_start_matches('/'));
        let mut url = Url::parse(&raw)?;
        if let Some(o) = &self.endpoint_override {
            apply_override(&mut url, o)?;
        }
        tracing::trace!(%method, %service, %url, "resolved endpoint");
        Ok(Resolved { url, project_id })
    }
}

pub(crate) fn apply_override(url: &mut Url, o: &Url) -> Result<()> {
    let fail = |what: &str| Error::Fatal(format!("cannot apply endpoint override {what}: {o}"));
    url.set_scheme(o.scheme()).map_err(|_| fail("scheme"))?;
    url.set_host(o.host_str()).map_err(|e| Error::Fatal(e.to_string()))?;
    url.set_port(o.port()).map_err(|_| fail("port"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_owned(),
            name: name.to_owned(),
            domain_id: "d1".to_owned(),
            enabled: true,
            description: None,
            parent_id: None,
        }
    }

    fn resolve(service: Service, region: &str, resource: &str) -> Result<Resolved> {
        let projects = [project("p1", "cn-north-4"), project("p2", "cn-north-4_sub")];
        Router::new("cn-north-4", None).resolve(&projects, service, region, resource, &Method::GET)
    }

    #[test]
    fn project_scoped_template() {
        let r = resolve(Service::Ecs, "cn-north-4", "/cloudservers/detail").unwrap();
        assert_eq!(
            r.url.as_str(),
            "https://ecs.cn-north-4.myhuaweicloud.com/v1/p1/cloudservers/detail"
        );
        assert_eq!(r.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn sub_project_uses_base_region_host() {
        let r = resolve(Service::Elb, "cn-north-4_sub", "elb/loadbalancers").unwrap();
        assert_eq!(
            r.url.as_str(),
            "https://elb.cn-north-4.myhuaweicloud.com/v3/p2/elb/loadbalancers"
        );
    }

    #[test]
    fn global_and_default_region() {
        let r = resolve(Service::Eps, "", "enterprise-projects").unwrap();
        assert_eq!(
            r.url.as_str(),
            "https://eps.myhuaweicloud.com/v1.0/enterprise-projects"
        );
        let r = resolve(Service::Ims, "", "cloudimages").unwrap();
        assert_eq!(
            r.url.as_str(),
            "https://ims.cn-north-4.myhuaweicloud.com/v2/cloudimages"
        );
        let r = resolve(Service::Cce, "cn-north-4", "clusters").unwrap();
        assert_eq!(
            r.url.as_str(),
            "https://cce.cn-north-4.myhuaweicloud.com/api/v3/projects/p1/clusters"
        );
    }

    #[test]
    fn missing_project_is_not_found() {
        let e = resolve(Service::Vpc, "ap-southeast-1", "vpcs").unwrap_err();
        assert!(e.is_not_found());
        // 不需要project的服务不受影响
        assert!(resolve(Service::Ims, "ap-southeast-1", "cloudimages").is_ok());
    }

    #[test]
    fn override_replaces_origin() {
        let router = Router::new(
            "cn-north-4",
            Some(Url::parse("http://127.0.0.1:9000").unwrap()),
        );
        let r = router
            .resolve(&[project("p1", "cn-north-4")], Service::Vpc, "", "vpcs", &Method::POST)
            .unwrap();
        assert_eq!(r.url.as_str(), "http://127.0.0.1:9000/v1/p1/vpcs");
    }
}
