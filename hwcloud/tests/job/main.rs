#[path = "../common/mod.rs"]
mod common;

use hwcloud::ErrorKind;
use hwcloud::ims::ImportImage;
use hwcloud::job::{JobService, WaitJob, wait_until};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn job_polled_until_success() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-1", "status": "RUNNING", "entities": {}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-1", "status": "SUCCESS", "entities": {"image_id": "img-42"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let job = WaitJob::builder(&region, JobService::Ims, "job-1")
        .interval(Duration::from_millis(10))
        .timeout(Duration::from_secs(5))
        .build()
        .wait()
        .await
        .unwrap();
    assert_eq!(job.entity("image_id").as_deref(), Some("img-42"));
}

#[tokio::test]
async fn failed_job_reports_reason() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/jobs/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-2", "status": "FAIL", "fail_reason": "quota exceeded"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let err = WaitJob::builder(&region, JobService::Ecs, "job-2")
        .interval(Duration::from_millis(10))
        .build()
        .wait()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
    assert_eq!(common::requests_after_identity(&server).await.len(), 1);
}

async fn mount_running(server: &wiremock::MockServer, job_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/p1/jobs/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": job_id, "status": "RUNNING"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn wait_job_times_out() {
    let server = common::identity_server().await;
    mount_running(&server, "job-3").await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let err = WaitJob::builder(&region, JobService::Evs, "job-3")
        .interval(Duration::from_millis(20))
        .timeout(Duration::from_millis(100))
        .build()
        .wait()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!common::requests_after_identity(&server).await.is_empty());
}

#[tokio::test]
async fn wait_job_stops_when_cancelled() {
    let server = common::identity_server().await;
    mount_running(&server, "job-4").await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let err = WaitJob::builder(&region, JobService::Ecs, "job-4")
        .interval(Duration::from_secs(60))
        .cancel(token)
        .build()
        .wait()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(common::requests_after_identity(&server).await.len(), 1);
}

#[tokio::test]
async fn import_image_waits_for_job() {
    let server = common::identity_server().await;
    Mock::given(method("POST"))
        .and(path("/v2/cloudimages/quickimport/action"))
        .and(body_partial_json(json!({
            "name": "img",
            "image_url": "bkt:images/centos.qcow2",
            "os_version": "CentOS 7.6 64bit",
            "min_disk": 40
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-5"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/jobs/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-5", "status": "RUNNING"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/jobs/job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-5", "status": "SUCCESS", "entities": {"image_id": "img-77"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let image_id = ImportImage::builder(&region)
        .name("img")
        .bucket("bkt")
        .key("images/centos.qcow2")
        .os_version("CentOS 7.6 64bit")
        .min_disk(40)
        .interval(Duration::from_millis(10))
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(image_id, "img-77");
}

#[tokio::test]
async fn wait_until_times_out() {
    let calls = AtomicU32::new(0);
    let err = wait_until(Duration::from_millis(5), Duration::from_millis(30), "volume attached", || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok(false) }
    })
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(calls.load(Ordering::SeqCst) >= 1);
}
