//! 桶策略
//!
//! 策略本身为json，主体在OBS中写作`domain/{domain_id}:user/{user_id}`，
//! 对外统一为`{domain_id}:{user_id}`

use super::{ObsClient, ObsRequest};
use crate::error::{Error, Result, ResultExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{OneOrMany, serde_as};
use std::collections::BTreeMap;

// region:    --- canned action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannedAction {
    Read,
    ReadWrite,
    FullControl,
}

const READ_ACTIONS: &[&str] = &["Get*", "List*"];
const READ_WRITE_ACTIONS: &[&str] = &["Get*", "List*", "Put*"];
const FULL_CONTROL_ACTIONS: &[&str] = &["*"];

impl CannedAction {
    pub fn actions(&self) -> Vec<String> {
        let actions = match self {
            CannedAction::Read => READ_ACTIONS,
            CannedAction::ReadWrite => READ_WRITE_ACTIONS,
            CannedAction::FullControl => FULL_CONTROL_ACTIONS,
        };
        actions.iter().map(|a| (*a).to_owned()).collect()
    }

    /// 动作集合与某个预定义集合完全一致时才能识别
    pub fn from_actions(actions: &[String]) -> Option<Self> {
        let same = |expected: &[&str]| {
            actions.len() == expected.len() && actions.iter().all(|a| expected.contains(&a.as_str()))
        };
        [
            (READ_ACTIONS, CannedAction::Read),
            (FULL_CONTROL_ACTIONS, CannedAction::FullControl),
            (READ_WRITE_ACTIONS, CannedAction::ReadWrite),
        ]
        .into_iter()
        .find(|(expected, _)| same(expected))
        .map(|(_, canned)| canned)
    }
}
// endregion: --- canned action

// region:    --- wire
#[derive(Debug, Default, Deserialize, Serialize)]
struct BucketPolicy {
    #[serde(rename = "Statement", default)]
    statement: Vec<PolicyStatement>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default)]
    pub effect: String,
    #[serde_as(as = "BTreeMap<_, OneOrMany<_>>")]
    #[serde(default)]
    pub principal: BTreeMap<String, Vec<String>>,
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    pub action: Vec<String>,
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    pub resource: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}
// endregion: --- wire

/// 读取到的策略，`id`为语句序号
#[derive(Clone, Debug)]
pub struct BucketPolicyStatement {
    pub id: String,
    pub principal_id: Vec<String>,
    pub canned_action: Option<CannedAction>,
    pub effect: String,
    pub resource_path: Vec<String>,
    pub statement: PolicyStatement,
}

/// 新增一条策略
#[derive(Clone, Debug)]
pub struct BucketPolicyInput {
    /// `domain_id:user_id`，`*`表示所有人
    pub principal_id: Vec<String>,
    pub canned_action: CannedAction,
    /// Allow / Deny
    pub effect: String,
    /// 桶内路径，如`/*`、`/dir/*`
    pub resource_path: Vec<String>,
    pub condition: Option<Value>,
}

// region:    --- principal
/// `domain/d:user/u` → `d:u`，`domain/d:user/*` → `d:d`，`*` → `*:*`
pub fn local_principal_ids(principals: &[String]) -> Vec<String> {
    principals
        .iter()
        .map(|p| {
            if p == "*" {
                return "*:*".to_owned();
            }
            let parsed = p
                .strip_prefix("domain/")
                .and_then(|rest| rest.split_once(":user/"));
            match parsed {
                Some((domain, "*")) => format!("{domain}:{domain}"),
                Some((domain, user)) => format!("{domain}:{user}"),
                None => p.clone(),
            }
        })
        .collect()
}

/// `local_principal_ids`的逆过程，主账号固定为`owner`
///
/// - `*` → `*`
/// - 其它不带`:`的id → `domain/{owner}:user/*`
/// - `d:u` → `domain/{owner}:user/u`，`u`为空时为`*`
pub fn vendor_principal_ids(principals: &[String], owner: &str) -> Result<Vec<String>> {
    principals
        .iter()
        .map(|p| {
            let parts: Vec<&str> = p.split(':').collect();
            match parts.as_slice() {
                ["*"] => Ok("*".to_owned()),
                [_] => Ok(format!("domain/{owner}:user/*")),
                [_, user] => {
                    let user = if user.is_empty() { "*" } else { *user };
                    Ok(format!("domain/{owner}:user/{user}"))
                }
                _ => Err(Error::NotSupported(format!("invalid principal id {p}"))),
            }
        })
        .collect()
}
// endregion: --- principal

fn resources(bucket: &str, paths: &[String]) -> Vec<String> {
    paths.iter().map(|p| format!("{bucket}{p}")).collect()
}

fn resource_paths(bucket: &str, resources: &[String]) -> Vec<String> {
    resources
        .iter()
        .map(|r| r.strip_prefix(bucket).unwrap_or(r).to_owned())
        .collect()
}

fn random_sid() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..20].to_owned()
}

impl ObsClient {
    async fn policy_statements(&self, bucket: &str) -> Result<Vec<PolicyStatement>> {
        let resp = match self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("policy"))
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.vendor_code() == Some("NoSuchBucketPolicy") || e.to_string().contains("NoSuchBucketPolicy") => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).context(format!("get policy of bucket {bucket}")),
        };
        let policy: BucketPolicy = serde_json::from_slice(&resp.body)?;
        Ok(policy.statement)
    }

    async fn put_policy_statements(&self, bucket: &str, statements: Vec<PolicyStatement>) -> Result<()> {
        let body = serde_json::to_vec(&BucketPolicy { statement: statements })?;
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("policy")
            .bytes(body);
        self.send(req)
            .await
            .context(format!("set policy of bucket {bucket}"))?;
        Ok(())
    }

    /// 未设置策略时返回空列表
    pub async fn bucket_policy(&self, bucket: &str) -> Result<Vec<BucketPolicyStatement>> {
        let statements = self.policy_statements(bucket).await?;
        Ok(statements
            .into_iter()
            .enumerate()
            .map(|(i, s)| BucketPolicyStatement {
                id: i.to_string(),
                principal_id: local_principal_ids(s.principal.get("ID").map(Vec::as_slice).unwrap_or_default()),
                canned_action: CannedAction::from_actions(&s.action),
                effect: s.effect.clone(),
                resource_path: resource_paths(bucket, &s.resource),
                statement: s,
            })
            .collect())
    }

    /// 在已有策略后追加一条
    pub async fn add_bucket_policy(&self, bucket: &str, input: &BucketPolicyInput) -> Result<()> {
        let owner = self.client().account_id();
        if owner.is_empty() {
            return Err(Error::NotFound("owner domain id".to_owned()));
        }
        let ids = vendor_principal_ids(&input.principal_id, &owner)?;
        let mut statements = self.policy_statements(bucket).await?;
        statements.push(PolicyStatement {
            sid: Some(random_sid()),
            effect: input.effect.clone(),
            principal: BTreeMap::from([("ID".to_owned(), ids)]),
            action: input.canned_action.actions(),
            resource: resources(bucket, &input.resource_path),
            condition: input.condition.clone(),
        });
        self.put_policy_statements(bucket, statements).await
    }

    /// 按序号删除，删除后剩余的策略重新写回
    pub async fn delete_bucket_policy(&self, bucket: &str, ids: &[String]) -> Result<()> {
        let statements = self.policy_statements(bucket).await?;
        let keep: Vec<PolicyStatement> = statements
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !ids.contains(&i.to_string()))
            .map(|(_, s)| s)
            .collect();
        self.send(ObsRequest::new(Method::DELETE, Some(bucket), "").sub("policy"))
            .await
            .context(format!("delete policy of bucket {bucket}"))?;
        if keep.is_empty() {
            return Ok(());
        }
        self.put_policy_statements(bucket, keep).await
    }
}
