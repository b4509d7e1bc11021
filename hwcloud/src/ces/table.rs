use super::{MetricResource, MetricType};
use crate::error::{Error, Result};

/// 厂商指标名到统一指标的映射，`tag`附加在每个取值上
#[derive(Clone, Copy, Debug)]
pub struct MetricSpec {
    pub vendor_name: &'static str,
    pub metric_type: MetricType,
    pub tag: Option<(&'static str, &'static str)>,
}

const fn spec(vendor_name: &'static str, metric_type: MetricType) -> MetricSpec {
    MetricSpec {
        vendor_name,
        metric_type,
        tag: None,
    }
}

const fn tagged(
    vendor_name: &'static str,
    metric_type: MetricType,
    tag: (&'static str, &'static str),
) -> MetricSpec {
    MetricSpec {
        vendor_name,
        metric_type,
        tag: Some(tag),
    }
}

use MetricType::*;

const SERVER: &[MetricSpec] = &[
    spec("cpu_util", VmCpuUsage),
    spec("mem_util", VmMemUsage),
    spec("disk_util_inband", VmDiskUsage),
    tagged("network_incoming_bytes_aggregate_rate", VmNetBpsRx, ("net_type", "internet")),
    tagged("network_outgoing_bytes_aggregate_rate", VmNetBpsTx, ("net_type", "internet")),
    spec("disk_read_bytes_rate", VmDiskReadBps),
    spec("disk_write_bytes_rate", VmDiskWriteBps),
    spec("disk_read_requests_rate", VmDiskReadIops),
    spec("disk_write_requests_rate", VmDiskWriteIops),
];

const SERVER_AGENT: &[MetricSpec] = &[spec("mem_usedPercent", VmMemUsage)];

const REDIS: &[MetricSpec] = &[
    spec("cpu_usage", RedisCpuUsage),
    spec("memory_usage", RedisMemUsage),
    spec("instantaneous_input_kbps", RedisNetBpsRx),
    spec("instantaneous_output_kbps", RedisNetBpsTx),
    spec("connected_clients", RedisUsedConn),
    spec("instantaneous_ops", RedisOptSes),
    spec("keys", RedisCacheKeys),
    spec("expires", RedisCacheExpKeys),
    spec("used_memory_dataset", RedisDataMemUsage),
];

const RDS: &[MetricSpec] = &[
    spec("rds001_cpu_util", RdsCpuUsage),
    spec("rds002_mem_util", RdsMemUsage),
    spec("rds004_bytes_in", RdsNetBpsRx),
    spec("rds005_bytes_out", RdsNetBpsTx),
    spec("rds039_disk_util", RdsDiskUsage),
    spec("rds049_disk_read_throughput", RdsDiskReadBps),
    spec("rds050_disk_write_throughput", RdsDiskWriteBps),
    spec("rds006_conn_count", RdsConnCount),
    spec("rds008_qps", RdsQps),
    spec("rds009_tps", RdsTps),
    spec("rds013_innodb_reads", RdsInnodbReadBps),
    spec("rds014_innodb_writes", RdsInnodbWriteBps),
];

const BUCKET: &[MetricSpec] = &[
    spec("download_bytes", BucketNetBpsTx),
    spec("upload_bytes", BucketNetBpsRx),
    tagged("first_byte_latency", BucketLatency, ("request", "get")),
    tagged("get_request_count", BucketReqCount, ("request", "get")),
    tagged("request_count_4xx", BucketReqCount, ("request", "4xx")),
    tagged("request_count_5xx", BucketReqCount, ("request", "5xx")),
];

const LOAD_BALANCER: &[MetricSpec] = &[
    spec("m7_in_Bps", LbNetBpsRx),
    spec("m8_out_Bps", LbNetBpsTx),
    tagged("mc_l7_http_2xx", LbHrspCount, ("request", "2xx")),
    tagged("md_l7_http_3xx", LbHrspCount, ("request", "3xx")),
    tagged("me_l7_http_4xx", LbHrspCount, ("request", "4xx")),
    tagged("mf_l7_http_5xx", LbHrspCount, ("request", "5xx")),
];

/// ModelArts资源池自带的监控接口，不经过CES
pub(crate) const MODELARTS_POOL: &[MetricSpec] = &[
    spec("cpuUsage", ModelartsCpuUsage),
    spec("memUsedRate", ModelartsMemUsage),
    spec("gpuUtil", ModelartsGpuUtil),
    spec("gpuMemUsage", ModelartsGpuMemUsage),
    spec("npuUtil", ModelartsNpuUtil),
    spec("npuMemUsage", ModelartsNpuMemUsage),
    spec("diskAvailableCapacity", ModelartsDiskAvailableCapacity),
    spec("diskCapacity", ModelartsDiskCapacity),
    spec("diskUsedRate", ModelartsDiskUsage),
];

/// 返回`(namespace, 维度名, 指标表)`
pub fn metric_table(
    resource: MetricResource,
    engine: Option<&str>,
) -> Result<(&'static str, &'static str, &'static [MetricSpec])> {
    Ok(match resource {
        MetricResource::Server => ("SYS.ECS", "instance_id", SERVER),
        MetricResource::ServerAgent => ("AGT.ECS", "instance_id", SERVER_AGENT),
        MetricResource::Redis => ("SYS.DCS", "dcs_instance_id", REDIS),
        MetricResource::Rds => {
            let dimension = match engine.map(str::to_ascii_lowercase).as_deref() {
                Some("postgresql") => "postgresql_cluster_id",
                Some("sqlserver") => "rds_cluster_sqlserver_id",
                _ => "rds_cluster_id",
            };
            ("SYS.RDS", dimension, RDS)
        }
        MetricResource::Bucket => ("SYS.OBS", "bucket_name", BUCKET),
        MetricResource::LoadBalancer => ("SYS.ELB", "lb_instance_id", LOAD_BALANCER),
        MetricResource::ModelartsPool => {
            return Err(Error::NotSupported(
                "modelarts pool metrics are not served by CES".to_owned(),
            ));
        }
    })
}
