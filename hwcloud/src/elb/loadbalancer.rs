use super::{ELB_PAGE, IdRef};
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::LbStatus;
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LbEip {
    #[serde(default)]
    pub eip_id: String,
    #[serde(default)]
    pub eip_address: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vip_address: String,
    #[serde(default)]
    pub vip_port_id: String,
    #[serde(default)]
    pub vip_subnet_cidr_id: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub availability_zone_list: Vec<String>,
    #[serde(default)]
    pub provisioning_status: String,
    #[serde(default)]
    pub operating_status: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub guaranteed: bool,
    #[serde(default)]
    pub l4_flavor_id: Option<String>,
    #[serde(default)]
    pub l7_flavor_id: Option<String>,
    #[serde(default)]
    pub listeners: Vec<IdRef>,
    #[serde(default)]
    pub pools: Vec<IdRef>,
    #[serde(default)]
    pub eips: Vec<LbEip>,
    #[serde(default)]
    pub enterprise_project_id: String,
    #[serde(default)]
    pub created_at: String,
}

impl LoadBalancer {
    pub fn status(&self) -> LbStatus {
        LbStatus::from_admin_state(self.admin_state_up)
    }

    /// 未指定规格的共享型实例
    pub fn is_shared(&self) -> bool {
        !self.guaranteed
    }
}

/// 创建独享型负载均衡
///
/// `subnet_id`为子网的`neutron_subnet_id`
#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateLoadBalancer<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    name: String,
    vpc_id: String,
    subnet_id: String,
    zones: Vec<String>,
    vip_address: Option<String>,
    l4_flavor_id: Option<String>,
    l7_flavor_id: Option<String>,
    enterprise_project_id: Option<String>,
    #[builder(default)]
    description: String,
}

impl CreateLoadBalancer<'_> {
    pub async fn send(&self) -> Result<LoadBalancer> {
        let mut lb = json!({
            "name": self.name,
            "description": self.description,
            "vpc_id": self.vpc_id,
            "vip_subnet_cidr_id": self.subnet_id,
            "availability_zone_list": self.zones,
        });
        let optional = [
            ("vip_address", &self.vip_address),
            ("l4_flavor_id", &self.l4_flavor_id),
            ("l7_flavor_id", &self.l7_flavor_id),
            ("enterprise_project_id", &self.enterprise_project_id),
        ];
        for (k, v) in optional {
            if let Some(v) = v.as_deref().filter(|v| !v.is_empty()) {
                lb[k] = v.into();
            }
        }
        let resp = self
            .region
            .post(Service::Elb, "elb/loadbalancers", &json!({ "loadbalancer": lb }))
            .await
            .context(format!("create loadbalancer {}", self.name))?;
        decode(&resp, "loadbalancer")
    }
}

impl Region {
    pub async fn load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        self.list_all_as(
            Service::Elb,
            "elb/loadbalancers",
            &[],
            &Paginator::next_marker("loadbalancers", Some(ELB_PAGE)),
        )
        .await
        .context("list loadbalancers")
    }

    pub async fn load_balancer(&self, lb_id: &str) -> Result<LoadBalancer> {
        let resp = self
            .get(Service::Elb, &format!("elb/loadbalancers/{lb_id}"), &[])
            .await
            .context(format!("get loadbalancer {lb_id}"))?;
        decode(&resp, "loadbalancer")
    }

    pub async fn update_load_balancer(&self, lb_id: &str, name: &str, desc: &str) -> Result<()> {
        let body = json!({"loadbalancer": {"name": name, "description": desc}});
        self.put(Service::Elb, &format!("elb/loadbalancers/{lb_id}"), &body)
            .await
            .context(format!("update loadbalancer {lb_id}"))?;
        Ok(())
    }

    pub async fn set_load_balancer_enabled(&self, lb_id: &str, enabled: bool) -> Result<()> {
        let body = json!({"loadbalancer": {"admin_state_up": enabled}});
        self.put(Service::Elb, &format!("elb/loadbalancers/{lb_id}"), &body)
            .await
            .context(format!("set admin state of loadbalancer {lb_id}"))?;
        Ok(())
    }

    /// 依次删除负载均衡下所有的后端服务器、健康检查、后端服务器组和监听器
    ///
    /// 负载均衡本身保留
    pub async fn teardown_load_balancer(&self, lb_id: &str) -> Result<()> {
        let lb_query = query([("loadbalancer_id", lb_id)]);
        let pools = self.pools(&lb_query).await?;
        let listeners = self.listeners(lb_id).await?;

        for pool in &pools {
            for member in self.members(&pool.id).await? {
                self.remove_member(&pool.id, &member.id).await?;
            }
        }
        for monitor in pools.iter().filter_map(|p| p.healthmonitor_id.as_deref()) {
            if !monitor.is_empty() {
                self.delete_health_monitor(monitor).await?;
            }
        }
        for pool in &pools {
            self.delete_pool(&pool.id).await?;
        }
        for listener in &listeners {
            self.delete_listener(&listener.id).await?;
        }
        tracing::debug!(
            lb_id,
            pools = pools.len(),
            listeners = listeners.len(),
            "loadbalancer torn down"
        );
        Ok(())
    }

    /// 先清理所有子资源再删除负载均衡
    pub async fn delete_load_balancer(&self, lb_id: &str) -> Result<()> {
        self.teardown_load_balancer(lb_id)
            .await
            .context(format!("teardown loadbalancer {lb_id}"))?;
        self.delete(Service::Elb, &format!("elb/loadbalancers/{lb_id}"))
            .await
            .context(format!("delete loadbalancer {lb_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lb_from_json() {
        let lb: LoadBalancer = serde_json::from_value(json!({
            "id": "lb-1",
            "admin_state_up": true,
            "guaranteed": true,
            "listeners": [{"id": "l-1"}],
            "pools": [{"id": "p-1"}, {"id": "p-2"}],
            "eips": [{"eip_id": "e-1", "eip_address": "1.1.1.1"}]
        }))
        .unwrap();
        assert_eq!(lb.status(), LbStatus::Enabled);
        assert!(!lb.is_shared());
        assert_eq!(lb.pools.len(), 2);
        assert_eq!(lb.eips[0].eip_address, "1.1.1.1");
    }
}
