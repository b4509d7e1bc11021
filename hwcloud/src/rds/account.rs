//! 数据库账号和数据库

use crate::error::{Error, Result, ResultExt};
use crate::pagination::Paginator;
use crate::region::Region;
use crate::service::Service;
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Debug, Deserialize)]
pub struct DbAccount {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub databases: Vec<DbPrivilege>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DbPrivilege {
    pub name: String,
    #[serde(default)]
    pub readonly: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub character_set: String,
}

fn page(items_key: &'static str) -> Paginator {
    Paginator::page_number(items_key, 100)
        .page_keys("page", "limit")
        .total_key("total_count")
}

impl Region {
    pub async fn db_accounts(&self, instance_id: &str) -> Result<Vec<DbAccount>> {
        self.list_all_as(
            Service::Rds,
            &format!("instances/{instance_id}/db_user/detail"),
            &[],
            &page("users"),
        )
        .await
        .context(format!("list accounts of {instance_id}"))
    }

    pub async fn create_db_account(&self, instance_id: &str, name: &str, password: &str) -> Result<()> {
        let body = json!({"name": name, "password": password});
        self.post(Service::Rds, &format!("instances/{instance_id}/db_user"), &body)
            .await
            .context(format!("create account {name} on {instance_id}"))?;
        Ok(())
    }

    pub async fn delete_db_account(&self, instance_id: &str, name: &str) -> Result<()> {
        self.delete(Service::Rds, &format!("instances/{instance_id}/db_user/{name}"))
            .await
            .context(format!("delete account {name} on {instance_id}"))?;
        Ok(())
    }

    /// 华为云没有开放修改数据库账号密码的接口
    pub async fn reset_db_account_password(&self, _instance_id: &str, _name: &str, _password: &str) -> Result<()> {
        Err(Error::NotSupported(
            "API does not exist or has not been published".to_owned(),
        ))
    }

    pub async fn db_databases(&self, instance_id: &str) -> Result<Vec<Database>> {
        self.list_all_as(
            Service::Rds,
            &format!("instances/{instance_id}/database/detail"),
            &[],
            &page("databases"),
        )
        .await
        .context(format!("list databases of {instance_id}"))
    }

    pub async fn create_db_database(&self, instance_id: &str, name: &str, character_set: &str) -> Result<()> {
        let body = json!({"name": name, "character_set": character_set});
        self.post(Service::Rds, &format!("instances/{instance_id}/database"), &body)
            .await
            .context(format!("create database {name} on {instance_id}"))?;
        Ok(())
    }

    /// 授予账号对数据库的读写或只读权限
    pub async fn grant_db_privilege(
        &self,
        instance_id: &str,
        account: &str,
        database: &str,
        readonly: bool,
    ) -> Result<()> {
        let body = json!({
            "db_name": database,
            "users": [{"name": account, "readonly": readonly}],
        });
        self.post(Service::Rds, &format!("instances/{instance_id}/db_privilege"), &body)
            .await
            .context(format!("grant {database} to {account} on {instance_id}"))?;
        Ok(())
    }
}
