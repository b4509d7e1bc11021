//! 统一身份认证: 用户、用户组、权限、SAML联邦和访问密钥
//!
//! 所有接口都是全局的，挂在[`crate::HuaweiClient`]上

mod aksk;
mod group;
mod role;
mod saml;
mod user;

pub use aksk::{AccessKey, NewAccessKey};
pub use group::Group;
pub use role::{Role, RoleScope, role_scopes};
pub use saml::{IdentityProvider, SAML_PROTOCOL, default_mapping_rules};
pub use user::{CreateUser, User};
