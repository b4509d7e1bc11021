use super::{ELB_PAGE, IdRef};
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::transport::query;
use bon::Builder;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InsertHeaders {
    #[serde(rename = "X-Forwarded-ELB-IP", default)]
    pub x_forwarded_elb_ip: bool,
}

/// 监听器上的访问控制
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListenerIpGroup {
    #[serde(default)]
    pub ipgroup_id: String,
    #[serde(default)]
    pub enable_ipgroup: bool,
    /// white / black
    #[serde(rename = "type", default)]
    pub acl_type: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Listener {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// TCP / UDP / HTTP / HTTPS / TERMINATED_HTTPS
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub protocol_port: u16,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub http2_enable: bool,
    #[serde(default)]
    pub default_pool_id: Option<String>,
    #[serde(default)]
    pub default_tls_container_ref: Option<String>,
    #[serde(default)]
    pub insert_headers: Option<InsertHeaders>,
    #[serde(default)]
    pub loadbalancers: Vec<IdRef>,
    #[serde(default)]
    pub ipgroup: Option<ListenerIpGroup>,
    #[serde(default)]
    pub created_at: String,
}

impl Listener {
    /// 小写的监听协议，`TERMINATED_HTTPS`视为`https`
    pub fn listener_type(&self) -> Option<&'static str> {
        match self.protocol.as_str() {
            "TCP" => Some("tcp"),
            "UDP" => Some("udp"),
            "HTTP" => Some("http"),
            "HTTPS" | "TERMINATED_HTTPS" => Some("https"),
            _ => None,
        }
    }

    /// 已开启访问控制的地址组id
    pub fn acl_id(&self) -> Option<&str> {
        self.ipgroup
            .as_ref()
            .filter(|g| g.enable_ipgroup && !g.ipgroup_id.is_empty())
            .map(|g| g.ipgroup_id.as_str())
    }

    pub fn x_forwarded_for(&self) -> bool {
        self.insert_headers
            .as_ref()
            .is_some_and(|h| h.x_forwarded_elb_ip)
    }
}

#[derive(Builder)]
#[builder(on(String, into))]
pub struct CreateListener<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    lb_id: String,
    name: String,
    protocol: String,
    port: u16,
    default_pool_id: Option<String>,
    certificate_id: Option<String>,
    #[builder(default)]
    http2: bool,
    #[builder(default)]
    x_forwarded_for: bool,
    #[builder(default)]
    description: String,
}

impl CreateListener<'_> {
    pub async fn send(&self) -> Result<Listener> {
        let mut listener = json!({
            "loadbalancer_id": self.lb_id,
            "name": self.name,
            "description": self.description,
            "protocol": self.protocol.to_ascii_uppercase(),
            "protocol_port": self.port,
        });
        if let Some(p) = self.default_pool_id.as_deref().filter(|p| !p.is_empty()) {
            listener["default_pool_id"] = p.into();
        }
        if let Some(c) = self.certificate_id.as_deref().filter(|c| !c.is_empty()) {
            listener["default_tls_container_ref"] = c.into();
            listener["http2_enable"] = self.http2.into();
        }
        if self.x_forwarded_for {
            listener["insert_headers"] = json!({"X-Forwarded-ELB-IP": true});
        }
        let resp = self
            .region
            .post(Service::Elb, "elb/listeners", &json!({ "listener": listener }))
            .await
            .context(format!("create listener {}", self.name))?;
        decode(&resp, "listener")
    }
}

/// 修改监听器，`default_pool_id`为None时解绑默认后端服务器组
#[derive(Clone, Debug, Default)]
pub struct UpdateListener {
    pub name: String,
    pub description: String,
    pub default_pool_id: Option<String>,
    pub certificate_id: Option<String>,
    pub http2: bool,
    pub x_forwarded_for: bool,
}

impl Region {
    pub async fn listeners(&self, lb_id: &str) -> Result<Vec<Listener>> {
        self.list_all_as(
            Service::Elb,
            "elb/listeners",
            &query([("loadbalancer_id", lb_id)]),
            &Paginator::next_marker("listeners", Some(ELB_PAGE)),
        )
        .await
        .context(format!("list listeners of {lb_id}"))
    }

    pub async fn listener(&self, listener_id: &str) -> Result<Listener> {
        let resp = self
            .get(Service::Elb, &format!("elb/listeners/{listener_id}"), &[])
            .await
            .context(format!("get listener {listener_id}"))?;
        decode(&resp, "listener")
    }

    pub async fn update_listener(&self, listener_id: &str, opts: &UpdateListener) -> Result<()> {
        let mut listener = json!({
            "name": opts.name,
            "description": opts.description,
            "http2_enable": opts.http2,
            "default_pool_id": opts.default_pool_id.as_deref().map_or(Value::Null, Value::from),
        });
        if let Some(c) = &opts.certificate_id {
            listener["default_tls_container_ref"] = c.as_str().into();
        }
        if opts.x_forwarded_for {
            listener["insert_headers"] = json!({"X-Forwarded-ELB-IP": true});
        }
        self.put(
            Service::Elb,
            &format!("elb/listeners/{listener_id}"),
            &json!({ "listener": listener }),
        )
        .await
        .context(format!("update listener {listener_id}"))?;
        Ok(())
    }

    pub async fn change_listener_certificate(&self, listener_id: &str, certificate_id: &str) -> Result<()> {
        let body = json!({"listener": {"default_tls_container_ref": certificate_id}});
        self.put(Service::Elb, &format!("elb/listeners/{listener_id}"), &body)
            .await
            .context(format!("change certificate of listener {listener_id}"))?;
        Ok(())
    }

    pub async fn delete_listener(&self, listener_id: &str) -> Result<()> {
        self.delete(Service::Elb, &format!("elb/listeners/{listener_id}"))
            .await
            .context(format!("delete listener {listener_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_type_and_headers() {
        let l: Listener = serde_json::from_value(json!({
            "id": "l-1",
            "protocol": "TERMINATED_HTTPS",
            "protocol_port": 443,
            "default_pool_id": null,
            "insert_headers": {"X-Forwarded-ELB-IP": true}
        }))
        .unwrap();
        assert_eq!(l.listener_type(), Some("https"));
        assert!(l.x_forwarded_for());
        assert!(l.default_pool_id.is_none());
        assert_eq!(l.acl_id(), None);
    }

    #[test]
    fn disabled_ipgroup_has_no_acl() {
        let l: Listener = serde_json::from_value(json!({
            "id": "l-1",
            "ipgroup": {"ipgroup_id": "ipg-1", "enable_ipgroup": false, "type": "white"}
        }))
        .unwrap();
        assert_eq!(l.acl_id(), None);
        assert_eq!(l.ipgroup.unwrap().acl_type, "white");
    }
}
