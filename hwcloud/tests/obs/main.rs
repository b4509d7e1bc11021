#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use hwcloud::ErrorKind;
use hwcloud::obs::bucket::CreateBucketOptions;
use hwcloud::obs::content_md5;
use hwcloud::obs::object::{ObjectHeaders, ObjectRange, PutObjectBody};
use hwcloud_common::helper::hmac_sha1_base64;
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn header_of<'a>(req: &'a wiremock::Request, name: &str) -> &'a str {
    req.headers.get(name).unwrap().to_str().unwrap()
}

/// 用请求实际携带的Date重新计算签名
fn expected_auth(string_to_sign: &str) -> String {
    format!("OBS AK:{}", hmac_sha1_base64("SK", string_to_sign).unwrap())
}

#[tokio::test]
async fn put_object_is_signed_with_md5_and_meta() {
    let server = common::identity_server().await;
    Mock::given(method("PUT"))
        .and(path("/bkt/dir/a.txt"))
        .and(header("content-md5", content_md5(b"hello").as_str()))
        .and(header("x-obs-meta-owner", "me"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"5d41402abc4b2a76b9719d911017c592\""))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, false, None).await;
    let obs = client.obs(common::REGION);

    let headers = ObjectHeaders::builder()
        .content_type("text/plain")
        .meta(BTreeMap::from([("owner".to_owned(), "me".to_owned())]))
        .build();
    let etag = obs
        .put_object("bkt", "dir/a.txt", PutObjectBody::Bytes(Bytes::from_static(b"hello")), &headers)
        .await
        .unwrap();
    assert_eq!(etag, "\"5d41402abc4b2a76b9719d911017c592\"");

    let sent = common::requests_after_identity(&server).await;
    let date = header_of(&sent[0], "date");
    let string_to_sign = format!(
        "PUT\n{}\ntext/plain\n{date}\nx-obs-meta-owner:me\n/bkt/dir/a.txt",
        content_md5(b"hello")
    );
    assert_eq!(header_of(&sent[0], "authorization"), expected_auth(&string_to_sign));
}

#[tokio::test]
async fn upload_part_signs_sub_resources() {
    let server = common::identity_server().await;
    Mock::given(method("PUT"))
        .and(path("/bkt/big.bin"))
        .and(query_param("partNumber", "2"))
        .and(query_param("uploadId", "up-1"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"p2\""))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, false, None).await;

    let etag = client
        .obs(common::REGION)
        .upload_part("bkt", "big.bin", "up-1", 2, PutObjectBody::Bytes(Bytes::from_static(b"part")))
        .await
        .unwrap();
    assert_eq!(etag, "\"p2\"");

    let sent = common::requests_after_identity(&server).await;
    let date = header_of(&sent[0], "date");
    // 子资源按名称排序后进入CanonicalizedResource
    let string_to_sign = format!(
        "PUT\n{}\n\n{date}\n/bkt/big.bin?partNumber=2&uploadId=up-1",
        content_md5(b"part")
    );
    assert_eq!(header_of(&sent[0], "authorization"), expected_auth(&string_to_sign));
}

#[tokio::test]
async fn list_buckets_signs_root_resource() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ListAllMyBucketsResult><Owner><ID>d1</ID></Owner><Buckets>\
             <Bucket><Name>logs</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate><Location>cn-north-4</Location></Bucket>\
             </Buckets></ListAllMyBucketsResult>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;

    let out = client.obs(common::REGION).list_buckets(true).await.unwrap();
    assert_eq!(out.buckets.len(), 1);

    let sent = common::requests_after_identity(&server).await;
    let date = header_of(&sent[0], "date");
    assert_eq!(
        header_of(&sent[0], "authorization"),
        expected_auth(&format!("GET\n\n\n{date}\n/"))
    );
}

#[tokio::test]
async fn ranged_get_returns_body_and_meta() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/bkt/a.txt"))
        .and(header("range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("x-obs-meta-owner", "me")
                .insert_header("content-type", "text/plain")
                .set_body_bytes(b"hell".to_vec()),
        )
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;

    let out = client
        .obs(common::REGION)
        .get_object("bkt", "a.txt", Some(ObjectRange { start: 0, end: Some(3) }))
        .await
        .unwrap();
    assert_eq!(&out.body[..], b"hell");
    assert_eq!(out.meta.get("owner").map(String::as_str), Some("me"));
    assert_eq!(out.content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn list_objects_with_prefix() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/bkt/"))
        .and(query_param("prefix", "logs/"))
        .and(query_param("max-keys", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ListBucketResult><Name>bkt</Name><Prefix>logs/</Prefix><MaxKeys>2</MaxKeys><IsTruncated>true</IsTruncated>\
             <Contents><Key>logs/1</Key><Size>3</Size></Contents>\
             <Contents><Key>logs/2</Key><Size>4</Size></Contents></ListBucketResult>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;
    let obs = client.obs(common::REGION);

    let out = obs
        .list_objects("bkt")
        .prefix("logs/")
        .max_keys(2)
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(out.contents.len(), 2);
    assert_eq!(out.contents[1].size, 4);
    assert_eq!(out.next_marker(), Some("logs/2"));
}

#[tokio::test]
async fn read_only_allows_head_but_not_put() {
    let server = common::identity_server().await;
    Mock::given(method("HEAD"))
        .and(path("/bkt/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-obs-bucket-location", "cn-north-4")
                .insert_header("x-obs-storage-class", "STANDARD"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;
    let obs = client.obs(common::REGION);

    let meta = obs.head_bucket("bkt").await.unwrap();
    assert_eq!(meta.location.as_deref(), Some("cn-north-4"));

    let err = obs
        .create_bucket("new-bkt", &CreateBucketOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountReadOnly);
    assert_eq!(common::requests_after_identity(&server).await.len(), 1);
}

#[tokio::test]
async fn forbidden_obs_request_reaches_observer() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/bkt/"))
        .and(query_param("acl", ""))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<Error><Code>AccessDenied</Code><Message>Access Denied</Message><RequestId>r1</RequestId></Error>",
        ))
        .mount(&server)
        .await;
    let (observer, seen) = common::recorder();
    let client = common::client(&server, false, Some(observer)).await;

    let err = client.obs(common::REGION).bucket_acl("bkt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(err.vendor_code(), Some("AccessDenied"));
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "obs");
    assert!(seen[0].1.starts_with("GET /bkt"));
}

#[tokio::test]
async fn missing_policy_is_empty() {
    let server = common::identity_server().await;
    Mock::given(method("GET"))
        .and(path("/bkt/"))
        .and(query_param("policy", ""))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<Error><Code>NoSuchBucketPolicy</Code><Message>The bucket policy does not exist</Message></Error>",
        ))
        .mount(&server)
        .await;
    let client = common::client(&server, true, None).await;

    let policies = client.obs(common::REGION).bucket_policy("bkt").await.unwrap();
    assert!(policies.is_empty());
}

#[tokio::test]
async fn presigned_url_carries_signature() {
    let server = common::identity_server().await;
    let client = common::client(&server, false, None).await;
    let obs = client.obs(common::REGION);

    let url = obs
        .presign(Method::GET, "bkt", "dir/a b.txt", Duration::from_secs(300))
        .unwrap();
    assert_eq!(url.path(), "/bkt/dir/a%20b.txt");
    let mut keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    keys.sort();
    assert_eq!(keys, ["AccessKeyId", "Expires", "Signature"]);
    assert!(url.query_pairs().any(|(k, v)| k == "AccessKeyId" && v == "AK"));

    let err = obs
        .presign(Method::POST, "bkt", "a.txt", Duration::from_secs(300))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}
