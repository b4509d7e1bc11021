#[path = "../common/mod.rs"]
mod common;

use hwcloud::elb::AclEntry;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_get(server: &MockServer, p: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, p: &str) {
    Mock::given(method("DELETE"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn delete_load_balancer_cleans_children_in_order() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v3/p1/elb/pools"))
        .and(query_param("loadbalancer_id", "lb-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pools": [{"id": "pool-1", "healthmonitor_id": "hm-1"}],
            "page_info": {"next_marker": ""}
        })))
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/v3/p1/elb/listeners",
        json!({"listeners": [{"id": "ls-1"}], "page_info": {}}),
    )
    .await;
    mount_get(
        &server,
        "/v3/p1/elb/pools/pool-1/members",
        json!({"members": [{"id": "m-1", "address": "10.0.0.2"}]}),
    )
    .await;
    let deletes = [
        "/v3/p1/elb/pools/pool-1/members/m-1",
        "/v3/p1/elb/healthmonitors/hm-1",
        "/v3/p1/elb/pools/pool-1",
        "/v3/p1/elb/listeners/ls-1",
        "/v3/p1/elb/loadbalancers/lb-1",
    ];
    for p in deletes {
        mount_delete(&server, p).await;
    }

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    region.delete_load_balancer("lb-1").await.unwrap();

    let seen: Vec<String> = common::requests_after_identity(&server)
        .await
        .into_iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .map(|r| r.url.path().to_owned())
        .collect();
    assert_eq!(seen, deletes);
}

#[tokio::test]
async fn teardown_skips_pool_without_monitor() {
    let server = common::identity_server().await;
    mount_get(
        &server,
        "/v3/p1/elb/pools",
        json!({"pools": [{"id": "pool-1", "healthmonitor_id": ""}]}),
    )
    .await;
    mount_get(&server, "/v3/p1/elb/listeners", json!({"listeners": []})).await;
    mount_get(&server, "/v3/p1/elb/pools/pool-1/members", json!({"members": []})).await;
    mount_delete(&server, "/v3/p1/elb/pools/pool-1").await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();
    region.teardown_load_balancer("lb-1").await.unwrap();

    let deletes = common::requests_after_identity(&server)
        .await
        .into_iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn read_only_client_never_sends_delete() {
    let server = common::identity_server().await;
    mount_get(&server, "/v3/p1/elb/pools", json!({"pools": []})).await;
    mount_get(&server, "/v3/p1/elb/listeners", json!({"listeners": []})).await;
    let client = common::client(&server, true, None).await;
    let region = client.region(common::REGION).unwrap();

    let err = region.delete_load_balancer("lb-1").await.unwrap_err();
    assert_eq!(err.kind(), hwcloud::ErrorKind::AccountReadOnly);
    let sent = common::requests_after_identity(&server).await;
    assert!(sent.iter().all(|r| r.method.as_str() == "GET"));
}

#[tokio::test]
async fn acl_list_get_and_create() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v3/p1/elb/ipgroups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ipgroups": [
                {"id": "ipg-1", "name": "office", "ip_list": [{"ip": "10.0.0.0/24"}], "listeners": []},
                {"id": "ipg-2", "name": "vpn", "ip_list": [{"ip": "1.1.1.1"}], "listeners": [{"id": "ls-1"}]}
            ],
            "page_info": {"next_marker": ""}
        })))
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/v3/p1/elb/ipgroups/ipg-1",
        json!({"ipgroup": {"id": "ipg-1", "name": "office", "ip_list": [{"ip": "10.0.0.0/24"}]}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/v3/p1/elb/ipgroups"))
        .and(body_partial_json(json!({"ipgroup": {
            "name": "new",
            "ip_list": [{"ip": "192.168.0.0/16", "description": "lan"}]
        }})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ipgroup": {"id": "ipg-3", "name": "new", "ip_list": [{"ip": "192.168.0.0/16", "description": "lan"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, false, None).await;
    let region = client.region(common::REGION).unwrap();

    let acls = region.lb_acls().await.unwrap();
    assert_eq!(acls.len(), 2);
    let bound = region.listener_acl("ls-1").await.unwrap().unwrap();
    assert_eq!(bound.id, "ipg-2");
    assert!(region.listener_acl("ls-9").await.unwrap().is_none());

    let acl = region.lb_acl("ipg-1").await.unwrap();
    assert_eq!(acl.cidrs(), ["10.0.0.0/24"]);

    let created = region
        .create_lb_acl()
        .name("new")
        .entries(vec![AclEntry {
            ip: "192.168.0.0/16".to_owned(),
            description: "lan".to_owned(),
        }])
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(created.id, "ipg-3");
}
