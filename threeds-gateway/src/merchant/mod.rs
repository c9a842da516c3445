//! Merchant configuration and request preparation.
//!
//! [`MerchantContext`] holds the account identity and endpoints;
//! [`prepare_request`] merges it into an outgoing field set.

pub mod config;
pub mod prepare;

pub use config::{DEFAULT_DIRECT_URL, DEFAULT_HOSTED_URL, MerchantContext};
pub use prepare::{ECHO_FIELDS, RequestSettings, prepare_request};
