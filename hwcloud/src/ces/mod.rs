//! 云监控CES指标查询
//!
//! 每类资源对应一张指标表，批量查询后把厂商的指标名映射为统一的[`MetricType`]

mod table;

pub(crate) use table::MODELARTS_POOL;
pub use table::{MetricSpec, metric_table};

use crate::error::{Error, Result, ResultExt};
use crate::region::{Region, decode};
use crate::service::Service;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

// region:    --- types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricResource {
    Server,
    /// 主机监控agent上报的指标，Windows不支持
    ServerAgent,
    Redis,
    Rds,
    Bucket,
    LoadBalancer,
    ModelartsPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricType {
    VmCpuUsage,
    VmMemUsage,
    VmDiskUsage,
    VmNetBpsRx,
    VmNetBpsTx,
    VmDiskReadBps,
    VmDiskWriteBps,
    VmDiskReadIops,
    VmDiskWriteIops,

    RedisCpuUsage,
    RedisMemUsage,
    RedisNetBpsRx,
    RedisNetBpsTx,
    RedisUsedConn,
    RedisOptSes,
    RedisCacheKeys,
    RedisCacheExpKeys,
    RedisDataMemUsage,

    RdsCpuUsage,
    RdsMemUsage,
    RdsNetBpsRx,
    RdsNetBpsTx,
    RdsDiskUsage,
    RdsDiskReadBps,
    RdsDiskWriteBps,
    RdsConnCount,
    RdsQps,
    RdsTps,
    RdsInnodbReadBps,
    RdsInnodbWriteBps,

    BucketNetBpsTx,
    BucketNetBpsRx,
    BucketLatency,
    BucketReqCount,

    LbNetBpsRx,
    LbNetBpsTx,
    LbHrspCount,

    ModelartsCpuUsage,
    ModelartsMemUsage,
    ModelartsGpuUtil,
    ModelartsGpuMemUsage,
    ModelartsNpuUtil,
    ModelartsNpuMemUsage,
    ModelartsDiskAvailableCapacity,
    ModelartsDiskCapacity,
    ModelartsDiskUsage,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        use MetricType::*;
        match self {
            VmCpuUsage => "vm_cpu.usage_active",
            VmMemUsage => "vm_mem.used_percent",
            VmDiskUsage => "vm_disk.used_percent",
            VmNetBpsRx => "vm_netio.bps_recv",
            VmNetBpsTx => "vm_netio.bps_sent",
            VmDiskReadBps => "vm_diskio.read_bps",
            VmDiskWriteBps => "vm_diskio.write_bps",
            VmDiskReadIops => "vm_diskio.read_iops",
            VmDiskWriteIops => "vm_diskio.write_iops",
            RedisCpuUsage => "dcs_cpu.usage_percent",
            RedisMemUsage => "dcs_mem.used_percent",
            RedisNetBpsRx => "dcs_netio.bps_recv",
            RedisNetBpsTx => "dcs_netio.bps_sent",
            RedisUsedConn => "dcs_conn.used_conn",
            RedisOptSes => "dcs_instantopt.opt_sess",
            RedisCacheKeys => "dcs_cachekeys.key_count",
            RedisCacheExpKeys => "dcs_cachekeys.key_exp_count",
            RedisDataMemUsage => "dcs_datamem.used_byte",
            RdsCpuUsage => "rds_cpu.usage_active",
            RdsMemUsage => "rds_mem.used_percent",
            RdsNetBpsRx => "rds_netio.bps_recv",
            RdsNetBpsTx => "rds_netio.bps_sent",
            RdsDiskUsage => "rds_disk.used_percent",
            RdsDiskReadBps => "rds_diskio.read_bps",
            RdsDiskWriteBps => "rds_diskio.write_bps",
            RdsConnCount => "rds_conn.used_count",
            RdsQps => "rds_qps.query_qps",
            RdsTps => "rds_tps.trans_qps",
            RdsInnodbReadBps => "rds_innodb.read_bps",
            RdsInnodbWriteBps => "rds_innodb.write_bps",
            BucketNetBpsTx => "oss_netio.bps_sent",
            BucketNetBpsRx => "oss_netio.bps_recv",
            BucketLatency => "oss_latency.req_late",
            BucketReqCount => "oss_req.req_count",
            LbNetBpsRx => "haproxy.bin",
            LbNetBpsTx => "haproxy.bout",
            LbHrspCount => "haproxy.hrsp_Nxx",
            ModelartsCpuUsage => "modelarts_pool_cpu.usage_percent",
            ModelartsMemUsage => "modelarts_pool_mem.usage_percent",
            ModelartsGpuUtil => "modelarts_pool_gpu_util.percent",
            ModelartsGpuMemUsage => "modelarts_pool_gpu_mem.usage_percent",
            ModelartsNpuUtil => "modelarts_pool_npu_util.percent",
            ModelartsNpuMemUsage => "modelarts_pool_npu_mem.usage_percent",
            ModelartsDiskAvailableCapacity => "modelarts_pool_disk.available_capacity",
            ModelartsDiskCapacity => "modelarts_pool_disk.capacity",
            ModelartsDiskUsage => "modelarts_pool_disk.usage_percent",
        }
    }
}

impl Display for MetricType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricValue {
    pub value: f64,
    pub timestamp: OffsetDateTime,
    pub tags: BTreeMap<String, String>,
}

/// 一个指标在时间范围内的所有取值
#[derive(Clone, Debug, PartialEq)]
pub struct MetricValues {
    pub id: String,
    pub metric_type: MetricType,
    /// CES返回的原始单位；只有ModelArts资源池的`Megabytes`会换算为`Bytes`
    pub unit: String,
    pub values: Vec<MetricValue>,
}

/// 查询条件，时间范围为闭区间
#[derive(Builder, Clone, Debug)]
#[builder(on(String, into))]
pub struct MetricQuery {
    pub resource_type: MetricResource,
    pub resource_id: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    /// RDS引擎，决定维度名
    pub engine: Option<String>,
    /// 虚拟机的操作系统类型，Windows不查询agent指标
    pub os_type: Option<String>,
}
// endregion: --- types

// region:    --- wire
#[derive(Serialize)]
struct Dimension<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MetricDescriptor<'a> {
    namespace: &'a str,
    metric_name: &'a str,
    dimensions: [Dimension<'a>; 1],
}

#[derive(Clone, Debug, Deserialize)]
struct Datapoint {
    #[serde(default)]
    average: f64,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct MetricData {
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    datapoints: Vec<Datapoint>,
    #[serde(default)]
    unit: String,
}
// endregion: --- wire

pub(crate) fn from_millis(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn to_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

/// 按表把厂商返回的指标转换为统一格式，表外的指标名记录日志后丢弃
fn convert(resource_id: &str, specs: &[MetricSpec], data: Vec<MetricData>) -> Vec<MetricValues> {
    data.into_iter()
        .filter_map(|m| {
            let Some(spec) = specs.iter().find(|s| s.vendor_name == m.metric_name) else {
                tracing::warn!(metric = %m.metric_name, resource_id, "invalid metric name");
                return None;
            };
            let tags: BTreeMap<String, String> = spec
                .tag
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect();
            Some(MetricValues {
                id: resource_id.to_owned(),
                metric_type: spec.metric_type,
                unit: m.unit,
                values: m
                    .datapoints
                    .into_iter()
                    .map(|d| MetricValue {
                        value: d.average,
                        timestamp: from_millis(d.timestamp),
                        tags: tags.clone(),
                    })
                    .collect(),
            })
        })
        .collect()
}

impl Region {
    /// 批量查询一张指标表，周期为1(原始数据)，取平均值
    pub async fn batch_query_metrics(
        &self,
        opts: &MetricQuery,
        resource: MetricResource,
    ) -> Result<Vec<MetricValues>> {
        let (namespace, dimension, specs) = metric_table(resource, opts.engine.as_deref())?;
        let metrics: Vec<MetricDescriptor> = specs
            .iter()
            .map(|s| MetricDescriptor {
                namespace,
                metric_name: s.vendor_name,
                dimensions: [Dimension {
                    name: dimension,
                    value: &opts.resource_id,
                }],
            })
            .collect();
        let body = json!({
            "from": to_millis(opts.start),
            "to": to_millis(opts.end),
            "period": "1",
            "filter": "average",
            "metrics": metrics,
        });
        let resp = self
            .post(Service::Ces, "batch-query-metric-data", &body)
            .await
            .context(format!("query {namespace} metrics of {}", opts.resource_id))?;
        let data: Vec<MetricData> = decode(&resp, "metrics")?;
        Ok(convert(&opts.resource_id, specs, data))
    }

    /// 查询资源的监控数据
    ///
    /// 虚拟机会额外查询agent指标，agent查询失败时只返回基础指标
    pub async fn metrics(&self, opts: &MetricQuery) -> Result<Vec<MetricValues>> {
        match opts.resource_type {
            MetricResource::Server => {
                let mut ret = self.batch_query_metrics(opts, MetricResource::Server).await?;
                let windows = opts
                    .os_type
                    .as_deref()
                    .is_some_and(|os| os.eq_ignore_ascii_case("windows"));
                if !windows {
                    match self.batch_query_metrics(opts, MetricResource::ServerAgent).await {
                        Ok(agent) => ret.extend(agent),
                        Err(e) => tracing::debug!(error = %e, "skip agent metrics"),
                    }
                }
                Ok(ret)
            }
            MetricResource::ModelartsPool => self.modelarts_pool_metrics(&opts.resource_id).await,
            MetricResource::ServerAgent => Err(Error::NotSupported(
                "agent metrics are queried together with server metrics".to_owned(),
            )),
            other => self.batch_query_metrics(opts, other).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_maps_names_and_tags() {
        let (_, _, specs) = metric_table(MetricResource::Bucket, None).unwrap();
        let data: Vec<MetricData> = serde_json::from_value(json!([
            {"metric_name": "request_count_4xx", "unit": "count",
             "datapoints": [{"average": 3.0, "timestamp": 1700000000000i64}]},
            {"metric_name": "not_in_table", "unit": "count", "datapoints": []},
            {"metric_name": "download_bytes", "unit": "B/s",
             "datapoints": [{"average": 1.5, "timestamp": 1700000060000i64}]}
        ]))
        .unwrap();
        let out = convert("bucket-a", specs, data);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].metric_type, MetricType::BucketReqCount);
        assert_eq!(out[0].values[0].tags.get("request").map(String::as_str), Some("4xx"));
        assert_eq!(out[0].values[0].timestamp.unix_timestamp(), 1700000000);
        assert_eq!(out[1].metric_type, MetricType::BucketNetBpsTx);
        assert!(out[1].values[0].tags.is_empty());
        assert_eq!(out[1].unit, "B/s");
    }

    #[test]
    fn descriptor_shape() {
        let d = MetricDescriptor {
            namespace: "SYS.ECS",
            metric_name: "cpu_util",
            dimensions: [Dimension {
                name: "instance_id",
                value: "vm-1",
            }],
        };
        assert_eq!(
            serde_json::to_value(d).unwrap(),
            json!({"namespace": "SYS.ECS", "metric_name": "cpu_util",
                   "dimensions": [{"name": "instance_id", "value": "vm-1"}]})
        );
    }

    #[test]
    fn convert_keeps_ces_unit() {
        let (_, _, specs) = metric_table(MetricResource::Redis, None).unwrap();
        let spec = specs
            .iter()
            .find(|s| s.metric_type == MetricType::RedisDataMemUsage)
            .unwrap();
        let data: Vec<MetricData> = serde_json::from_value(json!([
            {"metric_name": spec.vendor_name, "unit": "Megabytes",
             "datapoints": [{"average": 2.0, "timestamp": 1700000000000i64}]}
        ]))
        .unwrap();
        let out = convert("redis-1", specs, data);
        assert_eq!(out[0].unit, "Megabytes");
        assert_eq!(out[0].values[0].value, 2.0);
    }
}
