//! Shared helpers for the `hwcloud` crate: the SDK-HMAC-SHA256 request signer,
//! date formatting and small hashing utilities.

pub mod error;
pub mod helper;
pub mod sdk_sign;

pub use error::Error;
