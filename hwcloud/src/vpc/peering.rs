use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::PeeringStatus;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PeerVpc {
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub tenant_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Peering {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_vpc_info: PeerVpc,
    #[serde(default)]
    pub accept_vpc_info: PeerVpc,
    #[serde(default)]
    pub created_at: String,
}

impl Peering {
    pub fn status(&self) -> PeeringStatus {
        PeeringStatus::from_vendor(&self.status)
    }
}

impl Region {
    pub async fn peerings(&self) -> Result<Vec<Peering>> {
        self.list_all_as(
            Service::VpcV2,
            "vpc/peerings",
            &[],
            &Paginator::marker("peerings", Some(2000)),
        )
        .await
        .context("list vpc peerings")
    }

    pub async fn peering(&self, peering_id: &str) -> Result<Peering> {
        let resp = self
            .get(Service::VpcV2, &format!("vpc/peerings/{peering_id}"), &[])
            .await
            .context(format!("get vpc peering {peering_id}"))?;
        decode(&resp, "peering")
    }

    /// 对端`tenant_id`为空时建立同一项目内的对等连接
    pub async fn create_peering(
        &self,
        name: &str,
        vpc_id: &str,
        peer_vpc_id: &str,
        peer_tenant_id: Option<&str>,
        desc: &str,
    ) -> Result<Peering> {
        let mut accept = json!({"vpc_id": peer_vpc_id});
        if let Some(t) = peer_tenant_id.filter(|t| !t.is_empty()) {
            accept["tenant_id"] = t.into();
        }
        let body = json!({"peering": {
            "name": name,
            "description": desc,
            "request_vpc_info": {"vpc_id": vpc_id},
            "accept_vpc_info": accept,
        }});
        let resp = self
            .post(Service::VpcV2, "vpc/peerings", &body)
            .await
            .context(format!("create vpc peering {name}"))?;
        decode(&resp, "peering")
    }

    pub async fn delete_peering(&self, peering_id: &str) -> Result<()> {
        self.delete(Service::VpcV2, &format!("vpc/peerings/{peering_id}"))
            .await
            .context(format!("delete vpc peering {peering_id}"))?;
        Ok(())
    }
}
