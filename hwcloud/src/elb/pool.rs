//! 后端服务器组、后端服务器和健康检查

use super::{ELB_PAGE, IdRef};
use crate::error::{Error, Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::transport::Query;
use serde::Deserialize;
use serde_json::{Value, json};

// region:    --- health codes
/// `http_2xx,http_5xx` -> `200,500`
pub fn health_codes_to_wire(codes: &str) -> String {
    codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| c.strip_prefix("http_").unwrap_or(c).replace("xx", "00"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `200,500` -> `http_2xx,http_5xx`
pub fn health_codes_from_wire(codes: &str) -> String {
    codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| match c.strip_suffix("00") {
            Some(head) if head.len() == 1 => format!("http_{head}xx"),
            _ => c.to_owned(),
        })
        .collect::<Vec<_>>()
        .join(",")
}
// endregion: --- health codes

/// 转发算法
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduler {
    /// 加权轮询
    Wrr,
    /// 加权最少连接
    Wlc,
    /// 源IP
    Sch,
}

impl Scheduler {
    pub fn as_vendor(&self) -> &'static str {
        match self {
            Scheduler::Wrr => "ROUND_ROBIN",
            Scheduler::Wlc => "LEAST_CONNECTIONS",
            Scheduler::Sch => "SOURCE_IP",
        }
    }

    pub fn from_vendor(s: &str) -> Option<Self> {
        match s {
            "ROUND_ROBIN" => Some(Scheduler::Wrr),
            "LEAST_CONNECTIONS" => Some(Scheduler::Wlc),
            "SOURCE_IP" => Some(Scheduler::Sch),
            _ => None,
        }
    }
}

/// 会话保持
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StickySession {
    SourceIp { timeout: u32 },
    /// 后端服务器写入的cookie
    AppCookie { cookie: String, timeout: u32 },
}

impl StickySession {
    fn to_vendor(&self) -> Value {
        match self {
            StickySession::SourceIp { timeout } => {
                json!({"type": "SOURCE_IP", "persistence_timeout": timeout})
            }
            StickySession::AppCookie { cookie, timeout } => json!({
                "type": "APP_COOKIE",
                "cookie_name": cookie,
                "persistence_timeout": timeout,
            }),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub lb_algorithm: String,
    #[serde(default)]
    pub healthmonitor_id: Option<String>,
    #[serde(default)]
    pub session_persistence: Option<Value>,
    #[serde(default)]
    pub loadbalancers: Vec<IdRef>,
    #[serde(default)]
    pub listeners: Vec<IdRef>,
    #[serde(default)]
    pub members: Vec<IdRef>,
}

impl Pool {
    pub fn scheduler(&self) -> Option<Scheduler> {
        Scheduler::from_vendor(&self.lb_algorithm)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub protocol_port: u16,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub subnet_cidr_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub operating_status: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthMonitor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// TCP / UDP_CONNECT / HTTP / HTTPS
    #[serde(rename = "type", default)]
    pub monitor_type: String,
    /// 秒
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub max_retries_down: u32,
    #[serde(default)]
    pub url_path: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub expected_codes: Option<String>,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub pools: Vec<IdRef>,
}

impl HealthMonitor {
    /// 如`http_2xx,http_3xx`
    pub fn health_codes(&self) -> String {
        self.expected_codes
            .as_deref()
            .map(health_codes_from_wire)
            .unwrap_or_default()
    }
}

/// 健康检查参数，`codes`使用`http_2xx`的形式
#[derive(Clone, Debug, Default)]
pub struct HealthCheck {
    /// tcp / udp / http
    pub check_type: String,
    pub interval: u32,
    pub timeout: u32,
    /// 1~10，超出范围时使用3
    pub rise: u32,
    pub uri: Option<String>,
    pub domain: Option<String>,
    pub codes: Option<String>,
}

impl HealthCheck {
    fn to_vendor(&self) -> Value {
        let check_type = match self.check_type.as_str() {
            "udp" => "UDP_CONNECT".to_owned(),
            t => t.to_ascii_uppercase(),
        };
        let rise = if (1..=10).contains(&self.rise) { self.rise } else { 3 };
        let mut v = json!({
            "delay": self.interval,
            "max_retries": rise,
            "timeout": self.timeout,
            "type": check_type,
        });
        if check_type == "HTTP" {
            if let Some(d) = self.domain.as_deref().filter(|d| !d.is_empty()) {
                v["domain_name"] = d.into();
            }
            if let Some(u) = &self.uri {
                v["url_path"] = u.as_str().into();
            }
            if let Some(c) = self.codes.as_deref().filter(|c| !c.is_empty()) {
                v["expected_codes"] = health_codes_to_wire(c).into();
            }
        }
        v
    }
}

/// 创建后端服务器组，`lb_id`和`listener_id`至少指定一个
#[derive(Clone, Debug)]
pub struct CreatePool {
    pub name: String,
    pub protocol: String,
    pub scheduler: Scheduler,
    pub lb_id: Option<String>,
    pub listener_id: Option<String>,
    pub sticky: Option<StickySession>,
}

impl Region {
    /// `query`如`loadbalancer_id=...`
    pub async fn pools(&self, query: &Query) -> Result<Vec<Pool>> {
        self.list_all_as(
            Service::Elb,
            "elb/pools",
            query,
            &Paginator::next_marker("pools", Some(ELB_PAGE)),
        )
        .await
        .context("list pools")
    }

    pub async fn pool(&self, pool_id: &str) -> Result<Pool> {
        let resp = self
            .get(Service::Elb, &format!("elb/pools/{pool_id}"), &[])
            .await
            .context(format!("get pool {pool_id}"))?;
        decode(&resp, "pool")
    }

    pub async fn create_pool(&self, opts: &CreatePool) -> Result<Pool> {
        if opts.lb_id.is_none() && opts.listener_id.is_none() {
            return Err(Error::Fatal(format!(
                "pool {} needs a loadbalancer or a listener",
                opts.name
            )));
        }
        let mut pool = json!({
            "name": opts.name,
            "protocol": opts.protocol.to_ascii_uppercase(),
            "lb_algorithm": opts.scheduler.as_vendor(),
        });
        if let Some(id) = &opts.lb_id {
            pool["loadbalancer_id"] = id.as_str().into();
        }
        if let Some(id) = &opts.listener_id {
            pool["listener_id"] = id.as_str().into();
        }
        if let Some(s) = &opts.sticky {
            pool["session_persistence"] = s.to_vendor();
        }
        let resp = self
            .post(Service::Elb, "elb/pools", &json!({ "pool": pool }))
            .await
            .context(format!("create pool {}", opts.name))?;
        decode(&resp, "pool")
    }

    /// 修改转发算法，`sticky`为None时关闭会话保持
    pub async fn change_scheduler(
        &self,
        pool_id: &str,
        scheduler: Scheduler,
        sticky: Option<&StickySession>,
    ) -> Result<()> {
        let body = json!({"pool": {
            "lb_algorithm": scheduler.as_vendor(),
            "session_persistence": sticky.map_or(Value::Null, StickySession::to_vendor),
        }});
        self.put(Service::Elb, &format!("elb/pools/{pool_id}"), &body)
            .await
            .context(format!("change scheduler of pool {pool_id}"))?;
        Ok(())
    }

    pub async fn delete_pool(&self, pool_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/pools/{pool_id}"))
            .await
            .context(format!("delete pool {pool_id}"))?;
        Ok(())
    }

    // region:    --- members
    pub async fn members(&self, pool_id: &str) -> Result<Vec<Member>> {
        self.list_all_as(
            Service::Elb,
            &format!("elb/pools/{pool_id}/members"),
            &[],
            &Paginator::next_marker("members", Some(ELB_PAGE)),
        )
        .await
        .context(format!("list members of {pool_id}"))
    }

    /// `subnet_id`为后端服务器所在子网的`neutron_subnet_id`，跨VPC时为None
    pub async fn add_member(
        &self,
        pool_id: &str,
        address: &str,
        port: u16,
        weight: u32,
        subnet_id: Option<&str>,
    ) -> Result<Member> {
        let mut member = json!({
            "address": address,
            "protocol_port": port,
            "weight": weight,
        });
        if let Some(s) = subnet_id.filter(|s| !s.is_empty()) {
            member["subnet_cidr_id"] = s.into();
        }
        let resp = self
            .post(
                Service::Elb,
                &format!("elb/pools/{pool_id}/members"),
                &json!({ "member": member }),
            )
            .await
            .context(format!("add member {address}:{port} to {pool_id}"))?;
        decode(&resp, "member")
    }

    pub async fn remove_member(&self, pool_id: &str, member_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/pools/{pool_id}/members/{member_id}"))
            .await
            .context(format!("remove member {member_id} from {pool_id}"))?;
        Ok(())
    }
    // endregion: --- members

    // region:    --- health monitors
    pub async fn health_monitor(&self, monitor_id: &str) -> Result<HealthMonitor> {
        let resp = self
            .get(Service::Elb, &format!("elb/healthmonitors/{monitor_id}"), &[])
            .await
            .context(format!("get health monitor {monitor_id}"))?;
        decode(&resp, "healthmonitor")
    }

    /// `check`为None时删除已有的健康检查，否则创建或更新
    pub async fn set_health_check(&self, pool_id: &str, check: Option<&HealthCheck>) -> Result<()> {
        let pool = self.pool(pool_id).await?;
        let existing = pool.healthmonitor_id.filter(|m| !m.is_empty());
        match (check, existing) {
            (None, None) => Ok(()),
            (None, Some(m)) => self.delete_health_monitor(&m).await,
            (Some(c), None) => {
                let mut monitor = c.to_vendor();
                monitor["pool_id"] = pool_id.into();
                self.post(Service::Elb, "elb/healthmonitors", &json!({ "healthmonitor": monitor }))
                    .await
                    .context(format!("create health monitor of {pool_id}"))?;
                Ok(())
            }
            (Some(c), Some(m)) => {
                self.put(
                    Service::Elb,
                    &format!("elb/healthmonitors/{m}"),
                    &json!({ "healthmonitor": c.to_vendor() }),
                )
                .await
                .context(format!("update health monitor {m}"))?;
                Ok(())
            }
        }
    }

    pub async fn delete_health_monitor(&self, monitor_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/healthmonitors/{monitor_id}"))
            .await
            .context(format!("delete health monitor {monitor_id}"))?;
        Ok(())
    }
    // endregion: --- health monitors
}
