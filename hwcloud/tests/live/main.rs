//! 访问真实账号，需要`tests/live/config.toml`:
//!
//! ```toml
//! access_key_id = "..."
//! access_key_secret = "..."
//! region = "cn-north-4"
//! ```
//!
//! `cargo test --test live -- --ignored`

use hwcloud::credentials::StaticCredentialsProvider;
use hwcloud::{HuaweiClient, ProviderConfig};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Debug)]
pub struct LiveConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region: String,
}

impl LiveConfig {
    pub fn get_conf() -> Self {
        let file_str = std::fs::read_to_string("tests/live/config.toml").unwrap();
        toml::from_str(&file_str).unwrap()
    }
}

async fn get_client() -> (HuaweiClient, String) {
    let conf = LiveConfig::get_conf();
    let client = HuaweiClient::builder()
        .credentials_provider(Arc::new(StaticCredentialsProvider::new(
            conf.access_key_id,
            conf.access_key_secret,
        )))
        .config(ProviderConfig::builder().name("live").read_only(true).build())
        .build()
        .await
        .unwrap();
    (client, conf.region)
}

#[tokio::test]
#[ignore]
async fn list_regions_test() {
    let (client, _) = get_client().await;
    for r in client.regions() {
        println!("{} {}", r.id(), r.info().name());
    }
}

#[tokio::test]
#[ignore]
async fn list_vpcs_test() {
    let (client, region) = get_client().await;
    let res = client.region(&region).unwrap().vpcs().await;
    match res {
        Ok(s) => println!("res:\n{:#?}", s),
        Err(e) => println!("{}", e),
    }
}

#[tokio::test]
#[ignore]
async fn list_buckets_test() {
    let (client, _) = get_client().await;
    match client.buckets().await {
        Ok(s) => println!("res:\n{:#?}", s),
        Err(e) => println!("{}", e),
    }
}

#[tokio::test]
#[ignore]
async fn balance_test() {
    let (client, _) = get_client().await;
    match client.balance().await {
        Ok(b) => println!("balance: {:#?}", b),
        Err(e) => println!("{}", e),
    }
}
