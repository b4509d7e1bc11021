use crate::config::ProviderConfig;
use crate::credentials::{Credentials, CredentialsError, CredentialsProvider};
use crate::endpoint::{Project, Router};
use crate::error::{Error, Result, ResultExt};
use crate::obs::ObsClient;
use crate::region::{Region, RegionInfo, decode};
use crate::service::Service;
use crate::transport::{AccessGuard, RequestOptions};
use bon::bon;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use time::PrimitiveDateTime;
use time::macros::format_description;

pub const READ_ONLY_SUFFIX: &str = "+read_only";

/// 固定的能力列表
pub const CAPABILITIES: &[&str] = &[
    "project",
    "compute",
    "network",
    "security_group",
    "eip",
    "loadbalancer",
    "objectstore",
    "rds",
    "cache",
    "event",
    "cloudid",
    "saml_auth",
    "nat",
    "nas",
    "quota+read_only",
    "modelarts",
    "vpcpeer",
    "cert",
    "cdn+read_only",
];

/// 账号(domain)信息，由AK反查得到
#[derive(Clone, Debug, Default)]
pub struct Owner {
    pub user_id: String,
    pub domain_id: String,
    pub name: String,
    pub create_time: Option<PrimitiveDateTime>,
}

/// regions/projects/owner的快照，整体替换
#[derive(Debug, Default)]
pub struct ClientState {
    /// IAM返回的原始region
    pub base_regions: Vec<RegionInfo>,
    pub projects: Vec<Project>,
    /// 每个项目(MOS除外)对应一个region
    pub regions: Vec<RegionInfo>,
    pub owner: Owner,
}

impl ClientState {
    fn derive_regions(base_regions: &[RegionInfo], projects: &[Project]) -> Vec<RegionInfo> {
        projects
            .iter()
            .filter(|p| !p.is_mos())
            .filter_map(|p| {
                let Some(base) = base_regions.iter().find(|r| r.id == p.region_id()) else {
                    tracing::warn!(project = %p.name, "no region found for project");
                    return None;
                };
                Some(RegionInfo {
                    id: p.name.clone(),
                    project_id: Some(p.id.clone()),
                    ..base.clone()
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BucketRecord {
    pub name: String,
    pub location: String,
    pub creation_date: String,
}

/// 账户余额，金额单位见`measure_unit`
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Balance {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub account_type: i64,
    #[serde(default)]
    pub designated_amount: f64,
    #[serde(default)]
    pub credit_amount: f64,
    #[serde(default)]
    pub measure_unit: i64,
}

/// 非本站点账号时BSS返回的错误码
const BSS_SKIP_CODES: &[&str] = &["CBC.0150", "CBC.0156"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubAccount {
    pub name: String,
    /// `{ak}/{project_id}`
    pub account: String,
    pub health_status: &'static str,
    pub desc: String,
    pub default_project_id: String,
}

pub(crate) struct ClientInner {
    pub(crate) config: ProviderConfig,
    pub(crate) credentials: Credentials,
    pub(crate) http: reqwest::Client,
    pub(crate) guard: AccessGuard,
    pub(crate) router: Router,
    state: RwLock<Arc<ClientState>>,
    buckets: RwLock<Option<Arc<Vec<BucketRecord>>>>,
}

/// 华为云客户端，clone开销很小，可以在多个任务间共享
#[derive(Clone)]
pub struct HuaweiClient {
    pub(crate) inner: Arc<ClientInner>,
}

#[bon]
impl HuaweiClient {
    /// 构建时依次获取: regions -> projects -> owner
    #[builder]
    pub async fn new(
        credentials_provider: Arc<dyn CredentialsProvider>,
        #[builder(default = ProviderConfig::builder().build())] config: ProviderConfig,
    ) -> Result<Self> {
        let credentials = credentials_provider.load().await?;
        if let Some(at) = credentials.expires_at.filter(|_| credentials.is_expired()) {
            return Err(CredentialsError::Expired(at).into());
        }
        let client = Self {
            inner: Arc::new(ClientInner {
                http: config.http_client()?,
                guard: AccessGuard::new(config.read_only, config.update_permission.clone()),
                router: Router::new(
                    config.default_region.clone(),
                    config.endpoint_override.clone(),
                ),
                config,
                credentials,
                state: RwLock::new(Arc::new(ClientState::default())),
                buckets: RwLock::new(None),
            }),
        };
        client.refresh().await?;
        Ok(client)
    }
}

impl HuaweiClient {
    // region:    --- state
    pub(crate) fn state(&self) -> Arc<ClientState> {
        let guard = self
            .inner
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    fn replace_state(&self, state: ClientState) {
        let mut guard = self
            .inner
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(state);
    }

    fn global_options(service: Service) -> RequestOptions {
        RequestOptions::new(service, "")
    }

    /// 不区分region的服务(IAM、EPS、BSS、CDN、SCM)
    pub(crate) async fn global(
        &self,
        method: Method,
        service: Service,
        resource: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.request(method, &Self::global_options(service), resource, query, body)
            .await
    }

    pub(crate) async fn global_get(&self, service: Service, resource: &str) -> Result<Value> {
        self.global(Method::GET, service, resource, &[], None).await
    }

    /// 全局服务的分页列表
    pub(crate) async fn global_list_all(
        &self,
        service: Service,
        resource: &str,
        query: &[(String, String)],
        paginator: &crate::pagination::Paginator,
    ) -> Result<Vec<Value>> {
        paginator
            .collect(|page| {
                let mut q = query.to_vec();
                q.extend(page);
                async move { self.global(Method::GET, service, resource, &q, None).await }
            })
            .await
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn fetch_base_regions(&self) -> Result<Vec<RegionInfo>> {
        let resp = self.global_get(Service::IamV3, "regions").await?;
        decode(&resp, "regions")
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let resp = self.global_get(Service::IamV3, "auth/projects").await?;
        decode(&resp, "projects")
    }

    #[tracing::instrument(level = "debug", skip_all)]
    async fn fetch_owner(&self) -> Result<Owner> {
        #[derive(Deserialize)]
        struct Cred {
            user_id: String,
        }
        #[derive(Deserialize)]
        struct User {
            domain_id: String,
            #[serde(default)]
            name: String,
            #[serde(default)]
            create_time: String,
        }

        let ak = &self.inner.credentials.access_key_id;
        let resp = self
            .global_get(Service::Iam, &format!("OS-CREDENTIAL/credentials/{ak}"))
            .await?;
        let cred: Cred = decode(&resp, "credential")?;
        let resp = self
            .global_get(Service::Iam, &format!("OS-USER/users/{}", cred.user_id))
            .await?;
        let user: User = decode(&resp, "user")?;
        Ok(Owner {
            create_time: parse_create_time(&user.create_time),
            user_id: cred.user_id,
            domain_id: user.domain_id,
            name: user.name,
        })
    }

    /// 重新获取regions/projects/owner并整体替换快照
    pub async fn refresh(&self) -> Result<()> {
        let base_regions = self.fetch_base_regions().await.context("fetch regions")?;
        let projects = self.fetch_projects().await.context("fetch projects")?;
        let owner = self.fetch_owner().await.context("fetch owner")?;
        tracing::debug!(owner_id = %owner.domain_id, owner_name = %owner.name, "huawei client ready");
        let regions = ClientState::derive_regions(&base_regions, &projects);
        self.replace_state(ClientState {
            base_regions,
            projects,
            regions,
            owner,
        });
        Ok(())
    }
    // endregion: --- state

    // region:    --- accessors
    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    pub fn access_key_id(&self) -> &str {
        &self.inner.credentials.access_key_id
    }

    /// 账号id(domain id)
    pub fn account_id(&self) -> String {
        let owner = &self.state().owner;
        if owner.domain_id.is_empty() {
            self.inner.config.account_id.clone().unwrap_or_default()
        } else {
            owner.domain_id.clone()
        }
    }

    pub fn owner(&self) -> Owner {
        self.state().owner.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state().projects.clone()
    }

    pub fn regions(&self) -> Vec<Region> {
        self.state()
            .regions
            .iter()
            .map(|info| Region::new(self.clone(), info.clone()))
            .collect()
    }

    /// 空字符串表示默认region
    pub fn region(&self, region_id: &str) -> Result<Region> {
        let id = if region_id.is_empty() {
            self.inner.router.default_region()
        } else {
            region_id
        };
        self.state()
            .regions
            .iter()
            .find(|r| r.id == id)
            .map(|info| Region::new(self.clone(), info.clone()))
            .ok_or_else(|| Error::NotFound(format!("region {id}")))
    }

    pub fn region_by_global_id(&self, global_id: &str) -> Result<Region> {
        self.state()
            .regions
            .iter()
            .find(|r| r.global_id() == global_id)
            .map(|info| Region::new(self.clone(), info.clone()))
            .ok_or_else(|| Error::NotFound(format!("region {global_id}")))
    }

    pub fn capabilities(&self) -> Vec<&'static str> {
        CAPABILITIES.to_vec()
    }

    pub fn iam_login_url(&self) -> String {
        format!(
            "https://auth.huaweicloud.com/authui/login.html?account={}#/login",
            self.state().owner.name
        )
    }

    pub fn access_env(&self) -> &'static str {
        self.inner.config.cloud_env.access_env()
    }

    pub fn obs(&self, region_id: &str) -> ObsClient {
        let id = if region_id.is_empty() {
            self.inner.router.default_region().to_owned()
        } else {
            region_id.split('_').next().unwrap_or(region_id).to_owned()
        };
        ObsClient::new(self.clone(), id)
    }
    // endregion: --- accessors

    /// 每个项目对应一个子账号，MOS项目除外
    pub async fn sub_accounts(&self) -> Result<Vec<SubAccount>> {
        let projects = self.fetch_projects().await.context("fetch projects")?;
        let state = self.state();
        let accounts = projects
            .iter()
            .filter(|p| !p.is_mos())
            .map(|p| SubAccount {
                name: format!("{}-{}", self.inner.config.name, p.name),
                account: format!("{}/{}", self.access_key_id(), p.id),
                health_status: p.health_status(),
                desc: state
                    .base_regions
                    .iter()
                    .find(|r| r.id == p.region_id())
                    .map(|r| r.locales.zh_cn.clone())
                    .unwrap_or_default(),
                default_project_id: "0".to_owned(),
            })
            .collect();
        self.replace_state(ClientState {
            base_regions: state.base_regions.clone(),
            regions: ClientState::derive_regions(&state.base_regions, &projects),
            projects,
            owner: state.owner.clone(),
        });
        Ok(accounts)
    }

    // region:    --- buckets
    /// 桶列表缓存，首次访问时通过OBS ListBuckets获取
    pub async fn buckets(&self) -> Result<Arc<Vec<BucketRecord>>> {
        let cached = self
            .inner
            .buckets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(b) = cached {
            return Ok(b);
        }
        let fetched = Arc::new(self.fetch_buckets().await?);
        *self
            .inner
            .buckets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// 桶在所有项目间共享，按`location`取出某个region的桶，走同一份缓存
    pub async fn buckets_in(&self, region_id: &str) -> Result<Vec<BucketRecord>> {
        let all = self.buckets().await?;
        Ok(all
            .iter()
            .filter(|b| b.location == region_id)
            .cloned()
            .collect())
    }

    pub fn invalidate_buckets(&self) {
        *self
            .inner
            .buckets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    async fn fetch_buckets(&self) -> Result<Vec<BucketRecord>> {
        let output = self
            .obs("")
            .list_buckets(true)
            .await
            .context("list buckets")?;
        let state = self.state();
        let known = |location: &str| state.regions.iter().any(|r| r.id == location);
        Ok(output
            .buckets
            .into_iter()
            .filter(|b| {
                let ok = known(&b.location);
                if !ok {
                    tracing::warn!(bucket = %b.name, location = %b.location, "fail to find region of bucket");
                }
                ok
            })
            .map(|b| BucketRecord {
                name: b.name,
                location: b.location,
                creation_date: b.creation_date,
            })
            .collect())
    }
    // endregion: --- buckets

    /// 依次尝试BSS和BSS国际站，选取`account_type == 1`的余额
    pub async fn balance(&self) -> Result<Balance> {
        for service in [Service::Bss, Service::BssIntl] {
            let resp = match self
                .global_get(service, "accounts/customer-accounts/balances")
                .await
            {
                Ok(v) => v,
                Err(e) if e.vendor_code().is_some_and(|c| BSS_SKIP_CODES.contains(&c)) => {
                    tracing::warn!(%service, error = %e, "skip balance endpoint");
                    continue;
                }
                Err(e) => return Err(e).context(format!("query balance from {service}")),
            };
            let balances: Vec<Balance> = decode(&resp, "account_balances")?;
            if let Some(b) = balances.iter().find(|b| b.account_type == 1) {
                return Ok(b.clone());
            }
            return Ok(Balance {
                currency: currency_of(&resp, &balances, service),
                ..Default::default()
            });
        }
        Ok(Balance {
            currency: "CNY".to_owned(),
            ..Default::default()
        })
    }
}

fn currency_of(resp: &Value, balances: &[Balance], service: Service) -> String {
    resp.get("currency")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| balances.first().map(|b| b.currency.clone()))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| match service {
            Service::BssIntl => "USD".to_owned(),
            _ => "CNY".to_owned(),
        })
}

/// 形如`2021-02-02 02:43:28.0`
fn parse_create_time(s: &str) -> Option<PrimitiveDateTime> {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let trimmed = s.trim_end_matches(".0");
    match PrimitiveDateTime::parse(trimmed, fmt) {
        Ok(t) => Some(t),
        Err(e) => {
            if !s.is_empty() {
                tracing::debug!(create_time = s, error = %e, "unparsable user create_time");
            }
            None
        }
    }
}
