//! 桶ACL
//!
//! 只支持预定义ACL，读取时从授权列表反推

use super::{ObsClient, ObsRequest};
use crate::error::{Result, ResultExt};
use reqwest::Method;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    Unknown,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::Unknown => "unknown",
        }
    }
}

impl Display for CannedAcl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// region:    --- xml
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlPolicy {
    #[serde(default)]
    pub access_control_list: AccessControlList,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessControlList {
    #[serde(rename = "Grant", default)]
    pub grants: Vec<Grant>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Grant {
    pub grantee: Grantee,
    pub permission: String,
}

/// OBS协议下用户组写为`<Canned>Everyone</Canned>`，S3协议为`<URI>`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Grantee {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "Canned", default)]
    pub canned: Option<String>,
    #[serde(rename = "URI", default)]
    pub uri: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Group {
    AllUsers,
    AuthenticatedUsers,
}

impl Grantee {
    fn group(&self) -> Option<Group> {
        if self.canned.as_deref() == Some("Everyone") {
            return Some(Group::AllUsers);
        }
        let uri = self.uri.as_deref().filter(|u| !u.is_empty())?;
        if uri.ends_with("AllUsers") {
            Some(Group::AllUsers)
        } else if uri.ends_with("AuthenticatedUsers") {
            Some(Group::AuthenticatedUsers)
        } else {
            None
        }
    }
}
// endregion: --- xml

/// - 1条授权：所有者FULL_CONTROL → private
/// - 2条授权：认证用户READ → authenticated-read，所有人READ → public-read
/// - 3条授权：所有人WRITE → public-read-write
pub fn canned_acl(grants: &[Grant]) -> CannedAcl {
    let has = |group: Group, permission: &str| {
        grants
            .iter()
            .any(|g| g.grantee.group().as_ref() == Some(&group) && g.permission == permission)
    };
    match grants.len() {
        1 if grants[0].grantee.group().is_none() && grants[0].permission == "FULL_CONTROL" => CannedAcl::Private,
        2 if has(Group::AuthenticatedUsers, "READ") => CannedAcl::AuthenticatedRead,
        2 if has(Group::AllUsers, "READ") => CannedAcl::PublicRead,
        3 if has(Group::AllUsers, "WRITE") => CannedAcl::PublicReadWrite,
        _ => CannedAcl::Unknown,
    }
}

impl ObsClient {
    pub async fn bucket_acl(&self, bucket: &str) -> Result<CannedAcl> {
        let resp = self
            .send(ObsRequest::new(Method::GET, Some(bucket), "").sub("acl"))
            .await
            .context(format!("get acl of bucket {bucket}"))?;
        let policy: AccessControlPolicy = resp.xml()?;
        Ok(canned_acl(&policy.access_control_list.grants))
    }

    pub async fn set_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> Result<()> {
        let req = ObsRequest::new(Method::PUT, Some(bucket), "")
            .sub("acl")
            .header("x-obs-acl", acl.as_str());
        self.send(req)
            .await
            .context(format!("set acl of bucket {bucket} to {acl}"))?;
        Ok(())
    }

    pub async fn object_acl(&self, bucket: &str, key: &str) -> Result<CannedAcl> {
        let resp = self
            .send(ObsRequest::new(Method::GET, Some(bucket), key).sub("acl"))
            .await
            .context(format!("get acl of object {bucket}/{key}"))?;
        let policy: AccessControlPolicy = resp.xml()?;
        Ok(canned_acl(&policy.access_control_list.grants))
    }

    pub async fn set_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> Result<()> {
        let req = ObsRequest::new(Method::PUT, Some(bucket), key)
            .sub("acl")
            .header("x-obs-acl", acl.as_str());
        self.send(req)
            .await
            .context(format!("set acl of object {bucket}/{key} to {acl}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::from_xml;

    fn grants(xml: &str) -> Vec<Grant> {
        let doc = format!(
            "<AccessControlPolicy><Owner><ID>d1</ID></Owner><AccessControlList>{xml}</AccessControlList></AccessControlPolicy>"
        );
        from_xml::<AccessControlPolicy>(doc.as_bytes())
            .unwrap()
            .access_control_list
            .grants
    }

    const OWNER: &str = "<Grant><Grantee><ID>d1</ID></Grantee><Permission>FULL_CONTROL</Permission></Grant>";

    #[test]
    fn private() {
        assert_eq!(canned_acl(&grants(OWNER)), CannedAcl::Private);
    }

    #[test]
    fn public_read() {
        let g = grants(&format!(
            "{OWNER}<Grant><Grantee><Canned>Everyone</Canned></Grantee><Permission>READ</Permission></Grant>"
        ));
        assert_eq!(canned_acl(&g), CannedAcl::PublicRead);
    }

    #[test]
    fn authenticated_read() {
        let g = grants(&format!(
            "{OWNER}<Grant><Grantee><URI>http://acs.amazonaws.com/groups/global/AuthenticatedUsers</URI></Grantee><Permission>READ</Permission></Grant>"
        ));
        assert_eq!(canned_acl(&g), CannedAcl::AuthenticatedRead);
    }

    #[test]
    fn public_read_write() {
        let g = grants(&format!(
            "{OWNER}<Grant><Grantee><Canned>Everyone</Canned></Grantee><Permission>READ</Permission></Grant>\
             <Grant><Grantee><Canned>Everyone</Canned></Grantee><Permission>WRITE</Permission></Grant>"
        ));
        assert_eq!(canned_acl(&g), CannedAcl::PublicReadWrite);
    }

    #[test]
    fn unknown() {
        assert_eq!(canned_acl(&[]), CannedAcl::Unknown);
        let g = grants(&format!(
            "{OWNER}<Grant><Grantee><ID>d2</ID></Grantee><Permission>READ</Permission></Grant>"
        ));
        assert_eq!(canned_acl(&g), CannedAcl::Unknown);
    }
}
