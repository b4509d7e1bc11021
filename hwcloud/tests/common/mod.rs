#![allow(dead_code)]

use hwcloud::config::PermissionObserver;
use hwcloud::credentials::StaticCredentialsProvider;
use hwcloud::{HuaweiClient, ProviderConfig};
use serde_json::json;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT_ID: &str = "p1";
pub const REGION: &str = "cn-north-4";

/// 构建客户端时固定请求的4个IAM接口
pub const IDENTITY_REQUESTS: usize = 4;

async fn mount_json(server: &MockServer, p: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// 启动mock server并挂载regions/projects/owner
pub async fn identity_server() -> MockServer {
    identity_server_with_regions(&[REGION]).await
}

/// 每个region一个项目，第一个项目id为[`PROJECT_ID`]，另带一个MOS项目
pub async fn identity_server_with_regions(regions: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    let region_list: Vec<serde_json::Value> = regions
        .iter()
        .map(|r| {
            let zh = if *r == REGION { "华北-北京四" } else { *r };
            json!({"id": r, "type": "public", "locales": {"zh-cn": zh, "en-us": r}})
        })
        .collect();
    mount_json(&server, "/v3/regions", json!({ "regions": region_list })).await;
    let mut projects: Vec<serde_json::Value> = regions
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let id = if i == 0 { PROJECT_ID.to_owned() } else { format!("p{}", i + 1) };
            json!({"id": id, "name": r, "domain_id": "d1", "enabled": true})
        })
        .collect();
    projects.push(json!({"id": "p-mos", "name": "MOS", "domain_id": "d1", "enabled": true}));
    mount_json(&server, "/v3/auth/projects", json!({ "projects": projects })).await;
    mount_json(
        &server,
        "/v3.0/OS-CREDENTIAL/credentials/AK",
        json!({"credential": {"user_id": "u1", "access": "AK"}}),
    )
    .await;
    mount_json(
        &server,
        "/v3.0/OS-USER/users/u1",
        json!({"user": {"domain_id": "d1", "name": "acc", "create_time": "2021-02-02 02:43:28.0"}}),
    )
    .await;
    server
}

pub async fn client(server: &MockServer, read_only: bool, observer: Option<PermissionObserver>) -> HuaweiClient {
    let config = ProviderConfig::builder()
        .name("hw")
        .read_only(read_only)
        .maybe_update_permission(observer)
        .endpoint_override(Url::parse(&server.uri()).unwrap())
        .default_region(REGION)
        .build();
    HuaweiClient::builder()
        .credentials_provider(Arc::new(StaticCredentialsProvider::new("AK", "SK")))
        .config(config)
        .build()
        .await
        .unwrap()
}

/// 记录403回调的(service, "METHOD path")
pub fn recorder() -> (PermissionObserver, Arc<Mutex<Vec<(String, String)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer: PermissionObserver = Arc::new(move |service: &str, action: &str| {
        sink.lock().unwrap().push((service.to_owned(), action.to_owned()));
    });
    (observer, seen)
}

/// 构建客户端之后收到的请求
pub async fn requests_after_identity(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .skip(IDENTITY_REQUESTS)
        .collect()
}
