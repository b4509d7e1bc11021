#[path = "../common/mod.rs"]
mod common;

use hwcloud::pagination::Paginator;
use hwcloud::service::Service;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn offset_pages_until_count_reached() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/cloudservers/detail"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "servers": [{"id": "A"}, {"id": "B"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/cloudservers/detail"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "servers": [{"id": "C"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let servers = region
        .list_all(
            Service::Ecs,
            "cloudservers/detail",
            &[],
            &Paginator::offset("servers", 2).total_key("count"),
        )
        .await
        .unwrap();

    let ids: Vec<&str> = servers.iter().filter_map(|s| s["id"].as_str()).collect();
    assert_eq!(ids, ["A", "B", "C"]);
    assert_eq!(common::requests_after_identity(&server).await.len(), 2);
}

#[tokio::test]
async fn next_marker_stops_on_empty_marker() {
    let server = common::identity_server().await;
    // 带marker的页先挂载，优先匹配
    Mock::given(method("GET"))
        .and(path("/v3/p1/elb/pools"))
        .and(query_param("marker", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pools": [{"id": "pool-2"}],
            "page_info": {"next_marker": "", "current_count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/p1/elb/pools"))
        .and(query_param("limit", "2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pools": [{"id": "pool-1"}],
            "page_info": {"next_marker": "tok", "current_count": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    let pools = region.pools(&Vec::new()).await.unwrap();

    let ids: Vec<&str> = pools.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["pool-1", "pool-2"]);
    assert_eq!(common::requests_after_identity(&server).await.len(), 2);
}

#[tokio::test]
async fn empty_first_page_makes_one_request() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/vpcs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vpcs": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, true, None).await;
    let vpcs = client.region("").unwrap().vpcs().await.unwrap();
    assert!(vpcs.is_empty());
}
