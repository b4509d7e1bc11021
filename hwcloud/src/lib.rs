#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod job;
pub mod pagination;
pub mod region;
pub mod service;
pub mod status;
pub mod transport;
pub mod utils;

// region:    --- resource adapters
pub mod bss;
pub mod cdn;
pub mod ces;
pub mod cts;
pub mod dcs;
pub mod ecs;
pub mod elb;
pub mod eps;
pub mod evs;
pub mod iam;
pub mod ims;
pub mod modelarts;
pub mod nat;
pub mod obs;
pub mod rds;
pub mod scm;
pub mod sfs;
pub mod vpc;
// endregion: --- resource adapters

pub use client::HuaweiClient;
pub use config::ProviderConfig;
pub use error::{Error, ErrorKind, Result};
pub use region::Region;
