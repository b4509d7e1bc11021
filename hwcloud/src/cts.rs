//! 云审计事件

use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::Region;
use crate::service::Service;
use crate::transport::query;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TraceUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Trace {
    pub trace_id: String,
    #[serde(default)]
    pub trace_name: String,
    /// normal / warning / incident
    #[serde(default)]
    pub trace_rating: String,
    /// ConsoleAction / ApiCall / SystemAction
    #[serde(default)]
    pub trace_type: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub source_ip: String,
    #[serde(default)]
    pub user: TraceUser,
    /// 毫秒
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

impl Trace {
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.time) * 1_000_000).ok()
    }

    pub fn succeeded(&self) -> bool {
        self.trace_rating == "normal"
    }
}

fn millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

impl Region {
    /// 管理类事件，`meta_data.marker`为下一页的游标
    pub async fn traces(&self, from: OffsetDateTime, to: OffsetDateTime) -> Result<Vec<Trace>> {
        let q = query([
            ("trace_type", "system".to_owned()),
            ("from", millis(from).to_string()),
            ("to", millis(to).to_string()),
        ]);
        self.list_all_as(
            Service::Cts,
            "traces",
            &q,
            &Paginator::next_marker("traces", Some(200))
                .marker_param("next")
                .next_marker_paths(&["meta_data.marker"]),
        )
        .await
        .context("list traces")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn trace_time() {
        let t: Trace = serde_json::from_value(json!({
            "trace_id": "t-1",
            "trace_rating": "warning",
            "time": 1700000000123i64,
            "user": {"name": "alice"}
        }))
        .unwrap();
        assert_eq!(t.created_at().unwrap().unix_timestamp(), 1700000000);
        assert!(!t.succeeded());
        assert_eq!(millis(datetime!(2023-11-14 22:13:20 UTC)), 1700000000000);
    }
}
