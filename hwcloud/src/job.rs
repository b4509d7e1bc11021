//! ECS/EVS/IMS异步任务: 提交后返回`job_id`，轮询`jobs/{job_id}`直到`SUCCESS`或`FAIL`

use crate::error::{Error, Result};
use crate::region::Region;
use crate::service::Service;
use bon::Builder;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 提供任务查询接口的服务
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobService {
    Ecs,
    Evs,
    Ims,
}

impl JobService {
    pub fn service(&self) -> Service {
        match self {
            JobService::Ecs => Service::Ecs,
            JobService::Evs => Service::EvsV1,
            JobService::Ims => Service::ImsV1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Init,
    Running,
    Success,
    Fail,
    Other(String),
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "INIT" => JobStatus::Init,
            "RUNNING" => JobStatus::Running,
            "SUCCESS" => JobStatus::Success,
            "FAIL" => JobStatus::Fail,
            other => JobStatus::Other(other.to_owned()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Fail)
    }
}

/// 提交接口的返回
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JobSubmitted {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub server_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub entities: Value,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub fail_reason: Option<String>,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        JobStatus::parse(&self.status)
    }

    /// `entities.{key}`，如`image_id`、`volume_id`
    pub fn entity(&self, key: &str) -> Option<String> {
        self.entities
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    /// 所有子任务的`volume_id`和`server_id`
    pub fn sub_job_entities(&self) -> Vec<String> {
        let Some(Value::Array(sub_jobs)) = self.entities.get("sub_jobs") else {
            return Vec::new();
        };
        sub_jobs
            .iter()
            .filter_map(|j| j.get("entities"))
            .flat_map(|e| {
                ["volume_id", "server_id"]
                    .into_iter()
                    .filter_map(move |k| e.get(k).and_then(Value::as_str))
            })
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// 轮询任务直到结束
///
/// ```ignore
/// let job = WaitJob::builder(&region, JobService::Ims, &job_id)
///     .interval(Duration::from_secs(15))
///     .timeout(Duration::from_secs(3600))
///     .build()
///     .wait()
///     .await?;
/// ```
#[derive(Builder)]
pub struct WaitJob<'a> {
    #[builder(start_fn)]
    region: &'a Region,
    #[builder(start_fn)]
    job_service: JobService,
    #[builder(start_fn)]
    job_id: &'a str,
    #[builder(default = Duration::from_secs(15))]
    interval: Duration,
    #[builder(default = Duration::from_secs(900))]
    timeout: Duration,
    cancel: Option<CancellationToken>,
}

impl WaitJob<'_> {
    #[tracing::instrument(level = "debug", skip(self), fields(job_id = self.job_id))]
    pub async fn wait(&self) -> Result<Job> {
        let service = self.job_service.service();
        let resource = format!("jobs/{}", self.job_id);
        let deadline = Instant::now() + self.timeout;
        loop {
            let resp = self.region.get(service, &resource, &[]).await?;
            let job: Job = serde_json::from_value(resp)?;
            match job.status() {
                JobStatus::Success => return Ok(job),
                JobStatus::Fail => {
                    return Err(Error::Fatal(format!(
                        "job {} failed: {}",
                        self.job_id,
                        job.fail_reason
                            .as_deref()
                            .or(job.error_code.as_deref())
                            .unwrap_or("unknown reason")
                    )));
                }
                status => tracing::debug!(?status, "job not finished"),
            }
            if Instant::now() + self.interval > deadline {
                return Err(Error::Timeout(format!(
                    "job {} not finished after {:?}",
                    self.job_id, self.timeout
                )));
            }
            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(Error::Transient(format!("waiting job {} cancelled", self.job_id)));
                        }
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
                None => tokio::time::sleep(self.interval).await,
            }
        }
    }
}

/// 没有任务id的异步操作(挂载/卸载磁盘等)，轮询`check`直到返回true
///
/// `check`返回的错误只记录日志，不中断等待
pub async fn wait_until<F, Fut>(interval: Duration, timeout: Duration, what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match check().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => tracing::debug!(what, error = %e, "wait check failed"),
        }
        if Instant::now() + interval > deadline {
            return Err(Error::Timeout(format!("{what} not finished after {timeout:?}")));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parse() {
        assert_eq!(JobStatus::parse("RUNNING"), JobStatus::Running);
        assert!(JobStatus::parse("FAIL").is_terminal());
        assert!(!JobStatus::parse("QUEUED").is_terminal());
    }

    #[test]
    fn single_entity() {
        let job: Job = serde_json::from_value(
            json!({"status": "SUCCESS", "entities": {"image_id": "img-42"}}),
        )
        .unwrap();
        assert_eq!(job.entity("image_id").as_deref(), Some("img-42"));
        assert_eq!(job.entity("volume_id"), None);
    }

    #[test]
    fn sub_job_entities_skip_empty() {
        let job: Job = serde_json::from_value(json!({
            "status": "SUCCESS",
            "entities": {"sub_jobs": [
                {"entities": {"server_id": "s1"}},
                {"entities": {"volume_id": "v1", "server_id": ""}},
                {"entities": {}},
                {"status": "FAIL"}
            ]}
        }))
        .unwrap();
        assert_eq!(job.sub_job_entities(), vec!["s1", "v1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_times_out() {
        let mut calls = 0;
        let r = wait_until(Duration::from_secs(5), Duration::from_secs(12), "attach disk", || {
            calls += 1;
            async { Ok(false) }
        })
        .await;
        assert_eq!(r.unwrap_err().kind(), crate::ErrorKind::Timeout);
        assert_eq!(calls, 3);
    }
}
