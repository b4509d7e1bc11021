use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::SnapshotStatus;
use crate::transport::query;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub volume_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
}

impl Snapshot {
    pub fn status(&self) -> SnapshotStatus {
        SnapshotStatus::from_vendor(&self.status)
    }
}

impl Region {
    pub async fn snapshots(&self, disk_id: Option<&str>) -> Result<Vec<Snapshot>> {
        let q = query(disk_id.filter(|d| !d.is_empty()).map(|d| ("volume_id", d)));
        self.list_all_as(
            Service::Evs,
            "cloudsnapshots/detail",
            &q,
            &Paginator::offset("snapshots", 100).total_key("count"),
        )
        .await
        .context("list snapshots")
    }

    pub async fn snapshot(&self, snapshot_id: &str) -> Result<Snapshot> {
        let resp = self
            .get(Service::Evs, &format!("cloudsnapshots/{snapshot_id}"), &[])
            .await
            .context(format!("get snapshot {snapshot_id}"))?;
        decode(&resp, "snapshot")
    }

    /// 返回快照id
    pub async fn create_snapshot(&self, disk_id: &str, name: &str, desc: &str) -> Result<String> {
        let body = json!({"snapshot": {"volume_id": disk_id, "name": name, "description": desc}});
        let resp = self
            .post(Service::Evs, "cloudsnapshots", &body)
            .await
            .context(format!("create snapshot of {disk_id}"))?;
        decode(&resp, "snapshot.id")
    }

    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.delete(Service::Evs, &format!("cloudsnapshots/{snapshot_id}"))
            .await
            .context(format!("delete snapshot {snapshot_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_status() {
        let s: Snapshot =
            serde_json::from_value(json!({"id": "s", "status": "error", "volume_id": "d"})).unwrap();
        assert_eq!(s.status(), SnapshotStatus::Failed);
    }
}
