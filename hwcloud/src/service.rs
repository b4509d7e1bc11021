use crate::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

macro_rules! services {
    ($($variant:ident => $tag:literal, $template:literal;)+) => {
        /// 服务endpoint标签，每个标签对应一个url模板
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Service {
            $($variant,)+
        }

        impl Service {
            pub const ALL: &'static [Service] = &[$(Service::$variant,)+];

            pub fn tag(&self) -> &'static str {
                match self {
                    $(Service::$variant => $tag,)+
                }
            }

            /// 占位符: `{region}` `{project}` `{resource}`
            pub(crate) fn template(&self) -> &'static str {
                match self {
                    $(Service::$variant => $template,)+
                }
            }
        }

        impl FromStr for Service {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Service::$variant),)+
                    _ => Err(Error::NotSupported(format!("unknown service `{s}`"))),
                }
            }
        }
    };
}

services! {
    Iam => "iam", "https://iam.myhuaweicloud.com/v3.0/{resource}";
    IamV3 => "iam_v3", "https://iam.myhuaweicloud.com/v3/{resource}";
    IamV3Ext => "iam_v3_ext", "https://iam.myhuaweicloud.com/v3-ext/{resource}";
    Elb => "elb", "https://elb.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    Vpc => "vpc", "https://vpc.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    VpcV2 => "vpc_v2.0", "https://vpc.{region}.myhuaweicloud.com/v2.0/{project}/{resource}";
    VpcV3 => "vpc_v3", "https://vpc.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    Ces => "ces", "https://ces.{region}.myhuaweicloud.com/v1.0/{project}/{resource}";
    Rds => "rds", "https://rds.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    Ecs => "ecs", "https://ecs.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    EcsV1_1 => "ecs_v1.1", "https://ecs.{region}.myhuaweicloud.com/v1.1/{project}/{resource}";
    EcsV2 => "ecs_v2", "https://ecs.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    EcsV2_1 => "ecs_v2.1", "https://ecs.{region}.myhuaweicloud.com/v2.1/{project}/{resource}";
    Eps => "eps", "https://eps.myhuaweicloud.com/v1.0/{resource}";
    Evs => "evs", "https://evs.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    EvsV1 => "evs_v1", "https://evs.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    EvsV2_1 => "evs_v2.1", "https://evs.{region}.myhuaweicloud.com/v2.1/{project}/{resource}";
    Bss => "bss", "https://bss.myhuaweicloud.com/v2/{resource}";
    BssIntl => "bss-intl", "https://bss-intl.myhuaweicloud.com/v2/{resource}";
    SfsTurbo => "sfs-turbo", "https://sfs-turbo.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    Cts => "cts", "https://cts.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    Nat => "nat", "https://nat.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    NatV2 => "nat_v2", "https://nat.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Cdn => "cdn", "https://cdn.myhuaweicloud.com/v1.0/{resource}";
    GaussDb => "gaussdb", "https://gaussdb.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    GaussDbNoSql => "gaussdb-nosql", "https://gaussdb-nosql.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    GaussDbOpenGauss => "gaussdb-opengauss", "https://gaussdb-opengauss.{region}.myhuaweicloud.com/v3/{project}/{resource}";
    FunctionGraph => "functiongraph", "https://functiongraph.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Apig => "apig", "https://apig.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Modelarts => "modelarts", "https://modelarts.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    ModelartsV1 => "modelarts_v1", "https://modelarts.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    Scm => "scm", "https://scm.cn-north-4.myhuaweicloud.com/v3/{resource}";
    Cce => "cce", "https://cce.{region}.myhuaweicloud.com/api/v3/projects/{project}/{resource}";
    As => "as", "https://as.{region}.myhuaweicloud.com/autoscaling-api/v1/{project}/{resource}";
    Dcs => "dcs", "https://dcs.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Mrs => "mrs", "https://mrs.{region}.myhuaweicloud.com/v1.1/{project}/{resource}";
    Ims => "ims", "https://ims.{region}.myhuaweicloud.com/v2/{resource}";
    ImsV1 => "ims_v1", "https://ims.{region}.myhuaweicloud.com/v1/{project}/{resource}";
    Dis => "dis", "https://dis.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Lts => "lts", "https://lts.{region}.myhuaweicloud.com/v2/{project}/{resource}";
    Vpn => "vpn", "https://vpn.{region}.myhuaweicloud.com/v5/{project}/{resource}";
    Obs => "obs", "https://obs.{region}.myhuaweicloud.com/{resource}";
}

impl Service {
    /// 不区分region的全局服务
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            Service::Iam
                | Service::IamV3
                | Service::IamV3Ext
                | Service::Eps
                | Service::Bss
                | Service::BssIntl
                | Service::Scm
                | Service::Cdn
        )
    }

    /// 不携带`X-Project-Id`
    pub fn is_domain_scoped(&self) -> bool {
        self.is_global()
    }

    /// url中需要projectId
    pub fn needs_project(&self) -> bool {
        self.template().contains("{project}")
    }

    /// 域名的第一段，403回调时作为service名称
    pub fn host_prefix(&self) -> &'static str {
        let t = self.template().trim_start_matches("https://");
        t.split('.').next().unwrap_or(t)
    }
}

impl Display for Service {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for s in Service::ALL {
            assert_eq!(s.tag().parse::<Service>().unwrap(), *s);
        }
        assert!("ecs_v9".parse::<Service>().is_err());
    }

    #[test]
    fn scoping() {
        assert!(Service::Eps.is_domain_scoped());
        assert!(!Service::Ecs.is_domain_scoped());
        assert!(Service::Ecs.needs_project());
        assert!(!Service::Ims.needs_project());
        assert!(Service::ImsV1.needs_project());
        assert_eq!(Service::VpcV2.host_prefix(), "vpc");
        assert_eq!(Service::BssIntl.host_prefix(), "bss-intl");
        assert_eq!(Service::Scm.host_prefix(), "scm");
    }
}
