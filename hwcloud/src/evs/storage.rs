use crate::error::{Result, ResultExt};
use crate::region::{Region, decode};
use crate::service::Service;
use serde::Deserialize;

/// 磁盘类型，如`SAS`、`SATA`、`SSD`、`GPSSD`
#[derive(Clone, Debug, Deserialize)]
pub struct DiskType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extra_specs: ExtraSpecs,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExtraSpecs {
    #[serde(rename = "RESKEY:availability_zones", default)]
    pub availability_zones: String,
    #[serde(rename = "os-vendor-extended:sold_out_availability_zones", default)]
    pub sold_out_availability_zones: String,
}

impl DiskType {
    /// 在该可用区可售
    pub fn available_in(&self, zone_id: &str) -> bool {
        let contains = |list: &str| list.split(',').any(|z| z.trim() == zone_id);
        contains(&self.extra_specs.availability_zones)
            && !contains(&self.extra_specs.sold_out_availability_zones)
    }
}

/// 某个可用区下的一种磁盘类型
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Storage {
    pub zone_id: String,
    pub storage_type: String,
}

impl Region {
    pub async fn disk_types(&self) -> Result<Vec<DiskType>> {
        let resp = self
            .get(Service::Evs, "types", &[])
            .await
            .context("list disk types")?;
        decode(&resp, "volume_types")
    }

    pub async fn storages(&self, zone_id: &str) -> Result<Vec<Storage>> {
        Ok(storages_in(&self.disk_types().await?, zone_id))
    }
}

fn storages_in(types: &[DiskType], zone_id: &str) -> Vec<Storage> {
    types
        .iter()
        .filter(|t| t.available_in(zone_id))
        .map(|t| Storage {
            zone_id: zone_id.to_owned(),
            storage_type: t.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_by_zone_and_sold_out() {
        let types: Vec<DiskType> = serde_json::from_value(json!([
            {"id": "1", "name": "SAS", "extra_specs": {"RESKEY:availability_zones": "az1,az2"}},
            {"id": "2", "name": "SSD", "extra_specs": {
                "RESKEY:availability_zones": "az1,az2",
                "os-vendor-extended:sold_out_availability_zones": "az2"
            }},
            {"id": "3", "name": "SATA", "extra_specs": {"RESKEY:availability_zones": "az3"}},
            {"id": "4", "name": "uh-l1"}
        ]))
        .unwrap();
        let names = |z| storages_in(&types, z).into_iter().map(|s| s.storage_type).collect::<Vec<_>>();
        assert_eq!(names("az1"), ["SAS", "SSD"]);
        assert_eq!(names("az2"), ["SAS"]);
        assert_eq!(names("az3"), ["SATA"]);
    }
}
