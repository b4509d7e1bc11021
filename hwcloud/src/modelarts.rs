//! ModelArts专属资源池、网络和资源规格
//!
//! 资源对象采用k8s风格的`metadata/spec/status`结构，资源池以`metadata.name`作为id

use crate::ces::{MODELARTS_POOL, MetricValue, MetricValues, from_millis};
use crate::error::{Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::{Region, decode};
use crate::service::Service;
use crate::status::ModelartsStatus;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

const LABEL_NAME: &str = "os.modelarts/name";
const LABEL_WORKSPACE: &str = "os.modelarts/workspace.id";
const ANNOTATION_DESC: &str = "os.modelarts/description";

// region:    --- types
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creation_timestamp: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PoolResource {
    pub flavor: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PoolNetworkRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PoolSpec {
    /// Dedicate / Shared
    #[serde(rename = "type", default)]
    pub pool_type: String,
    /// Train / Infer / Notebook
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub resources: Vec<PoolResource>,
    #[serde(default)]
    pub network: PoolNetworkRef,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PoolStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelartsPool {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PoolSpec,
    #[serde(default)]
    pub status: PoolStatus,
}

impl ModelartsPool {
    pub fn id(&self) -> &str {
        &self.metadata.name
    }

    /// 控制台显示的名称
    pub fn display_name(&self) -> &str {
        self.metadata
            .labels
            .get(LABEL_NAME)
            .map(String::as_str)
            .unwrap_or(&self.metadata.name)
    }

    pub fn description(&self) -> &str {
        self.metadata
            .annotations
            .get(ANNOTATION_DESC)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn status(&self) -> ModelartsStatus {
        ModelartsStatus::from_vendor(&self.status.phase.to_ascii_lowercase())
    }

    pub fn node_count(&self) -> u32 {
        self.spec.resources.iter().map(|r| r.count).sum()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NetworkSpec {
    #[serde(default)]
    pub cidr: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelartsNetwork {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NetworkSpec,
    #[serde(default)]
    pub status: PoolStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResourceFlavor {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Value,
}

/// 创建资源池的参数
#[derive(Clone, Debug)]
pub struct CreatePool {
    pub name: String,
    pub description: String,
    pub network: String,
    pub scope: Vec<String>,
    pub resources: Vec<PoolResource>,
    pub workspace_id: String,
}

impl CreatePool {
    fn to_body(&self) -> Value {
        let resources: Vec<Value> = self
            .resources
            .iter()
            .map(|r| json!({"flavor": r.flavor, "count": r.count}))
            .collect();
        let workspace = if self.workspace_id.is_empty() { "0" } else { &self.workspace_id };
        json!({
            "apiVersion": "v2",
            "kind": "Pool",
            "metadata": {
                "labels": {
                    LABEL_NAME: self.name,
                    LABEL_WORKSPACE: workspace,
                },
                "annotations": {
                    ANNOTATION_DESC: self.description,
                },
            },
            "spec": {
                "type": "Dedicate",
                "scope": self.scope,
                "network": {"name": self.network},
                "resources": resources,
            },
        })
    }
}
// endregion: --- types

// region:    --- monitor
#[derive(Clone, Debug, Deserialize)]
struct Statistic {
    #[serde(default)]
    value: f64,
}

#[derive(Clone, Debug, Deserialize)]
struct PoolDatapoint {
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    statistics: Vec<Statistic>,
}

#[derive(Clone, Debug, Deserialize)]
struct PoolMetricName {
    #[serde(alias = "metricName", default)]
    metric_name: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PoolMetric {
    metric: PoolMetricName,
    #[serde(alias = "dataPoints", default)]
    datapoints: Vec<PoolDatapoint>,
}

/// `Megabytes`换算为`Bytes`(乘以1024)，`-1`视为0
fn convert_pool_metrics(pool: &str, metrics: Vec<PoolMetric>) -> Vec<MetricValues> {
    metrics
        .into_iter()
        .filter_map(|m| {
            let Some(spec) = MODELARTS_POOL
                .iter()
                .find(|s| s.vendor_name == m.metric.metric_name)
            else {
                tracing::warn!(metric = %m.metric.metric_name, pool, "invalid metric name");
                return None;
            };
            let unit = m.datapoints.first().map(|d| d.unit.as_str()).unwrap_or_default();
            let is_mb = unit == "Megabytes";
            let unit = if is_mb { "Bytes".to_owned() } else { unit.to_owned() };
            let values = m
                .datapoints
                .iter()
                .filter_map(|d| {
                    let mut value = d.statistics.first()?.value;
                    if is_mb {
                        value *= 1024.0;
                    }
                    if value == -1.0 {
                        value = 0.0;
                    }
                    Some(MetricValue {
                        value,
                        timestamp: from_millis(d.timestamp),
                        tags: BTreeMap::new(),
                    })
                })
                .collect();
            Some(MetricValues {
                id: pool.to_owned(),
                metric_type: spec.metric_type,
                unit,
                values,
            })
        })
        .collect()
}
// endregion: --- monitor

impl Region {
    pub async fn modelarts_pools(&self) -> Result<Vec<ModelartsPool>> {
        self.list_all_as(
            Service::Modelarts,
            "pools",
            &[],
            &Paginator::next_marker("items", Some(100))
                .marker_param("continue")
                .next_marker_paths(&["metadata.continue"]),
        )
        .await
        .context("list modelarts pools")
    }

    pub async fn modelarts_pool(&self, pool: &str) -> Result<ModelartsPool> {
        let resp = self
            .get(Service::Modelarts, &format!("pools/{pool}"), &[])
            .await
            .context(format!("get modelarts pool {pool}"))?;
        decode(&resp, "")
    }

    pub async fn create_modelarts_pool(&self, opts: &CreatePool) -> Result<ModelartsPool> {
        let resp = self
            .post(Service::Modelarts, "pools", &opts.to_body())
            .await
            .context(format!("create modelarts pool {}", opts.name))?;
        decode(&resp, "")
    }

    /// merge-patch方式更新节点数量
    pub async fn resize_modelarts_pool(&self, pool: &str, resources: &[PoolResource]) -> Result<()> {
        let resources: Vec<Value> = resources
            .iter()
            .map(|r| json!({"flavor": r.flavor, "count": r.count}))
            .collect();
        self.patch(
            Service::Modelarts,
            &format!("pools/{pool}"),
            &json!({"spec": {"resources": resources}}),
        )
        .await
        .context(format!("resize modelarts pool {pool}"))?;
        Ok(())
    }

    pub async fn delete_modelarts_pool(&self, pool: &str) -> Result<()> {
        self.delete(Service::Modelarts, &format!("pools/{pool}"))
            .await
            .context(format!("delete modelarts pool {pool}"))?;
        Ok(())
    }

    pub async fn modelarts_pool_metrics(&self, pool: &str) -> Result<Vec<MetricValues>> {
        let resp = self
            .get(Service::Modelarts, &format!("pools/{pool}/monitor"), &[])
            .await
            .context(format!("monitor modelarts pool {pool}"))?;
        let metrics: Vec<PoolMetric> = decode(&resp, "metrics")?;
        Ok(convert_pool_metrics(pool, metrics))
    }

    pub async fn modelarts_networks(&self) -> Result<Vec<ModelartsNetwork>> {
        let resp = self
            .get(Service::ModelartsV1, "networks", &[])
            .await
            .context("list modelarts networks")?;
        decode(&resp, "items")
    }

    pub async fn create_modelarts_network(&self, name: &str, cidr: &str) -> Result<ModelartsNetwork> {
        let body = json!({
            "apiVersion": "v1",
            "kind": "Network",
            "metadata": {
                "labels": {LABEL_NAME: name, LABEL_WORKSPACE: "0"},
            },
            "spec": {"cidr": cidr},
        });
        let resp = self
            .post(Service::ModelartsV1, "networks", &body)
            .await
            .context(format!("create modelarts network {name}"))?;
        decode(&resp, "")
    }

    pub async fn modelarts_flavors(&self) -> Result<Vec<ResourceFlavor>> {
        let resp = self
            .get(Service::ModelartsV1, "resourceflavors", &[])
            .await
            .context("list modelarts resource flavors")?;
        decode(&resp, "items")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ces::MetricType;

    #[test]
    fn pool_accessors() {
        let p: ModelartsPool = serde_json::from_value(json!({
            "metadata": {
                "name": "pool-abc",
                "labels": {"os.modelarts/name": "train-pool"},
                "annotations": {"os.modelarts/description": "gpu"}
            },
            "spec": {"type": "Dedicate", "resources": [
                {"flavor": "modelarts.vm.gpu", "count": 2},
                {"flavor": "modelarts.vm.cpu", "count": 1}
            ]},
            "status": {"phase": "Creating"}
        }))
        .unwrap();
        assert_eq!(p.id(), "pool-abc");
        assert_eq!(p.display_name(), "train-pool");
        assert_eq!(p.description(), "gpu");
        assert_eq!(p.node_count(), 3);
        assert_eq!(p.status(), ModelartsStatus::Creating);
    }

    #[test]
    fn create_body_labels() {
        let body = CreatePool {
            name: "p1".into(),
            description: String::new(),
            network: "network-1".into(),
            scope: vec!["Train".into()],
            resources: vec![PoolResource {
                flavor: "f".into(),
                count: 1,
            }],
            workspace_id: String::new(),
        }
        .to_body();
        assert_eq!(body["metadata"]["labels"]["os.modelarts/workspace.id"], "0");
        assert_eq!(body["spec"]["network"]["name"], "network-1");
        assert_eq!(body["spec"]["resources"][0]["count"], 1);
    }

    #[test]
    fn megabytes_and_missing_values() {
        let metrics: Vec<PoolMetric> = serde_json::from_value(json!([
            {"metric": {"metricName": "diskCapacity"}, "dataPoints": [
                {"timestamp": 1000, "unit": "Megabytes", "statistics": [{"statistic": "avg", "value": 2.0}]},
                {"timestamp": 2000, "unit": "Megabytes", "statistics": []}
            ]},
            {"metric": {"metricName": "cpuUsage"}, "dataPoints": [
                {"timestamp": 1000, "unit": "Percent", "statistics": [{"value": -1.0}]}
            ]},
            {"metric": {"metricName": "unknown"}, "dataPoints": []}
        ]))
        .unwrap();
        let out = convert_pool_metrics("pool-1", metrics);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].metric_type, MetricType::ModelartsDiskCapacity);
        assert_eq!(out[0].unit, "Bytes");
        assert_eq!(out[0].values.len(), 1);
        assert_eq!(out[0].values[0].value, 2048.0);
        assert_eq!(out[1].values[0].value, 0.0);
        assert_eq!(out[1].unit, "Percent");
    }
}
