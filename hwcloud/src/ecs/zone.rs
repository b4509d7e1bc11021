use crate::error::{Result, ResultExt};
use crate::region::{Region, decode};
use crate::service::Service;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ZoneState {
    #[serde(default)]
    pub available: bool,
}

/// 可用区
#[derive(Clone, Debug, Deserialize)]
pub struct Zone {
    #[serde(rename = "zoneName")]
    pub zone_name: String,
    #[serde(rename = "zoneState", default)]
    pub zone_state: ZoneState,
}

impl Zone {
    pub fn id(&self) -> &str {
        &self.zone_name
    }

    pub fn is_available(&self) -> bool {
        self.zone_state.available
    }

    pub fn global_id(&self, region: &Region) -> String {
        format!("{}/{}", region.info().global_id(), self.zone_name)
    }
}

impl Region {
    pub async fn zones(&self) -> Result<Vec<Zone>> {
        let resp = self
            .get(Service::EcsV2_1, "os-availability-zone", &[])
            .await
            .context(format!("list zones of {}", self.id()))?;
        decode(&resp, "availabilityZoneInfo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zone_decode() {
        let zones: Vec<Zone> = serde_json::from_value(json!([
            {"zoneName": "cn-north-4a", "zoneState": {"available": true}, "hosts": null},
            {"zoneName": "cn-north-4b", "zoneState": {"available": false}}
        ]))
        .unwrap();
        assert!(zones[0].is_available());
        assert!(!zones[1].is_available());
        assert_eq!(zones[1].id(), "cn-north-4b");
    }
}
