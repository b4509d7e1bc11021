//! 计费: 包年/包月周期和续费

use crate::HuaweiClient;
use crate::config::CloudEnv;
use crate::error::{Error, Result, ResultExt};
use crate::service::Service;
use reqwest::Method;
use serde_json::json;

/// 到期后自动退订
const EXPIRE_MODE_AUTO_UNSUBSCRIBE: i64 = 2;
const AUTO_PAY_TRUE: i64 = 1;
const PERIOD_TYPE_MONTH: i64 = 2;
const PERIOD_TYPE_YEAR: i64 = 3;

/// 包年/包月周期
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BillingCycle {
    months: u32,
    pub auto_renew: bool,
}

impl BillingCycle {
    pub fn months(n: u32) -> Self {
        Self {
            months: n,
            auto_renew: false,
        }
    }

    pub fn years(n: u32) -> Self {
        Self::months(n * 12)
    }

    pub fn auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    pub fn get_months(&self) -> u32 {
        self.months
    }

    /// 整年时返回年数，否则为0
    pub fn get_years(&self) -> u32 {
        if self.months % 12 == 0 { self.months / 12 } else { 0 }
    }

    /// 创建包周期云主机时的`(periodType, periodNum)`
    pub(crate) fn create_period(&self) -> (&'static str, u32) {
        if self.months <= 9 {
            ("month", self.months)
        } else {
            ("year", self.get_years())
        }
    }

    /// 续费时的`(period_type, period_num)`: 1~11个月或1~3年
    pub(crate) fn renew_period(&self) -> Result<(i64, u32)> {
        let (month, year) = (self.get_months(), self.get_years());
        if (1..=11).contains(&month) {
            Ok((PERIOD_TYPE_MONTH, month))
        } else if (1..=3).contains(&year) {
            Ok((PERIOD_TYPE_YEAR, year))
        } else {
            Err(Error::Fatal(format!(
                "invalid renew period {month} month, must be 1~11 month or 1~3 year"
            )))
        }
    }
}

impl HuaweiClient {
    pub(crate) fn bss_service(&self) -> Service {
        match self.inner.config.cloud_env {
            CloudEnv::China => Service::Bss,
            CloudEnv::International => Service::BssIntl,
        }
    }

    /// 续费包周期资源
    pub async fn renew_resource(&self, resource_id: &str, cycle: BillingCycle) -> Result<()> {
        let (period_type, period_num) = cycle.renew_period()?;
        let body = json!({
            "resource_ids": [resource_id],
            "expire_mode": EXPIRE_MODE_AUTO_UNSUBSCRIBE,
            "isAutoPay": AUTO_PAY_TRUE,
            "period_type": period_type,
            "period_num": period_num,
        });
        self.global(
            Method::POST,
            self.bss_service(),
            "orders/subscriptions/resources/renew",
            &[],
            Some(&body),
        )
        .await
        .context(format!("renew {resource_id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renew_period_ranges() {
        assert_eq!(BillingCycle::months(1).renew_period().unwrap(), (2, 1));
        assert_eq!(BillingCycle::months(11).renew_period().unwrap(), (2, 11));
        assert_eq!(BillingCycle::years(1).renew_period().unwrap(), (3, 1));
        assert_eq!(BillingCycle::months(36).renew_period().unwrap(), (3, 3));
        assert!(BillingCycle::months(0).renew_period().is_err());
        assert!(BillingCycle::months(13).renew_period().is_err());
        assert!(BillingCycle::years(4).renew_period().is_err());
    }

    #[test]
    fn create_period() {
        assert_eq!(BillingCycle::months(9).create_period(), ("month", 9));
        assert_eq!(BillingCycle::years(2).create_period(), ("year", 2));
    }
}
