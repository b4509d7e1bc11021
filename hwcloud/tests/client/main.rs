#[path = "../common/mod.rs"]
mod common;

use hwcloud::ErrorKind;
use hwcloud::ces::{MetricQuery, MetricResource, MetricType};
use hwcloud::service::Service;
use serde_json::json;
use time::macros::datetime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const REGIONAL_BUCKETS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://obs.myhwclouds.com/doc/2015-06-30/">
  <Owner><ID>d1</ID></Owner>
  <Buckets>
    <Bucket><Name>logs</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate><Location>cn-north-4</Location></Bucket>
    <Bucket><Name>media</Name><CreationDate>2024-03-01T00:00:00.000Z</CreationDate><Location>cn-north-4</Location></Bucket>
    <Bucket><Name>hk</Name><CreationDate>2024-02-01T00:00:00.000Z</CreationDate><Location>ap-southeast-1</Location></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;

const BUCKETS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://obs.myhwclouds.com/doc/2015-06-30/">
  <Owner><ID>d1</ID></Owner>
  <Buckets>
    <Bucket><Name>logs</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate><Location>cn-north-4</Location></Bucket>
    <Bucket><Name>far</Name><CreationDate>2024-02-01T00:00:00.000Z</CreationDate><Location>sa-brazil-1</Location></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;

#[tokio::test]
async fn client_loads_identity() {
    let server = common::identity_server().await;
    let client = common::client(&server, false, None).await;

    assert_eq!(client.account_id(), "d1");
    assert_eq!(client.owner().name, "acc");
    assert_eq!(client.projects().len(), 2);
    let regions: Vec<String> = client.regions().iter().map(|r| r.id().to_owned()).collect();
    assert_eq!(regions, [common::REGION]);

    let region = client.region("").unwrap();
    assert_eq!(region.project_id(), Some(common::PROJECT_ID));
    assert!(client.region("eu-west-0").unwrap_err().is_not_found());

    let accounts = client.sub_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "hw-cn-north-4");
    assert_eq!(accounts[0].account, "AK/p1");
    assert_eq!(accounts[0].desc, "华北-北京四");
}

#[tokio::test]
async fn read_only_rejects_before_sending() {
    let server = common::identity_server().await;
    let client = common::client(&server, true, None).await;
    let region = client.region(common::REGION).unwrap();

    let err = region.delete_vpc("vpc-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountReadOnly);
    assert!(common::requests_after_identity(&server).await.is_empty());
}

#[tokio::test]
async fn read_only_still_queries_metrics() {
    let server = common::identity_server().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/p1/batch-query-metric-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": [{
                "metric_name": "download_bytes",
                "unit": "B/s",
                "datapoints": [{"average": 2.5, "timestamp": 1700000000000i64}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;
    let region = client.region(common::REGION).unwrap();

    let query = MetricQuery::builder()
        .resource_type(MetricResource::Bucket)
        .resource_id("logs")
        .start(datetime!(2023-11-14 22:00:00 UTC))
        .end(datetime!(2023-11-14 23:00:00 UTC))
        .build();
    let metrics = region.metrics(&query).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].metric_type, MetricType::BucketNetBpsTx);

    // 其他服务的POST仍被拦截
    let err = region.post(Service::Vpc, "vpcs", &json!({"vpc": {"name": "v"}})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountReadOnly);
    assert_eq!(common::requests_after_identity(&server).await.len(), 1);
}

#[tokio::test]
async fn forbidden_is_reported_to_observer() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/v1/p1/vpcs"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error_code": "VPC.0003",
            "error_msg": "Policy doesn't allow vpc:vpcs:list to be performed."
        })))
        .mount(&server)
        .await;
    let (observer, seen) = common::recorder();
    let client = common::client(&server, false, Some(observer)).await;

    let err = client.region("").unwrap().vpcs().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.vendor_code(), Some("VPC.0003"));
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, [("vpc".to_owned(), "GET /v1/p1/vpcs".to_owned())]);
}

#[tokio::test]
async fn balance_falls_back_to_international_site() {
    let server = common::identity_server().await;
    // 国内站和国际站经endpoint覆盖后是同一路径，按顺序各响应一次
    Mock::given(method("GET"))
        .and(path("/v2/accounts/customer-accounts/balances"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "CBC.0150",
            "error_msg": "Access denied. The customer does not belong to the website you are now at."
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/accounts/customer-accounts/balances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account_balances": [
                {"account_id": "a0", "amount": 1.0, "currency": "USD", "account_type": 2},
                {"account_id": "a1", "amount": 12.5, "currency": "USD", "account_type": 1}
            ],
            "currency": "USD"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server, true, None).await;
    let balance = client.balance().await.unwrap();
    assert_eq!(balance.account_id, "a1");
    assert_eq!(balance.amount, 12.5);
    assert_eq!(balance.currency, "USD");
}

#[tokio::test]
async fn bucket_list_is_cached_until_invalidated() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BUCKETS_XML))
        .expect(2)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;

    let first = client.buckets().await.unwrap();
    // 不在已知region中的桶被过滤
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "logs");
    assert_eq!(first[0].location, common::REGION);

    let second = client.buckets().await.unwrap();
    assert_eq!(first, second);

    client.invalidate_buckets();
    assert_eq!(client.buckets().await.unwrap().len(), 1);
}

#[tokio::test]
async fn region_sees_only_its_buckets() {
    let server = common::identity_server_with_regions(&["cn-north-4", "ap-southeast-1"]).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REGIONAL_BUCKETS_XML))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;
    assert_eq!(client.buckets().await.unwrap().len(), 3);

    let names = |v: Vec<hwcloud::client::BucketRecord>| v.into_iter().map(|b| b.name).collect::<Vec<_>>();
    let north = client.region(common::REGION).unwrap().buckets().await.unwrap();
    assert_eq!(names(north), ["logs", "media"]);
    let hk = client.region("ap-southeast-1").unwrap().buckets().await.unwrap();
    assert_eq!(names(hk), ["hk"]);
}
