//! Cloudflare WAF toolkit.
//!
//! Authenticated, cacheable access to the Cloudflare REST API and local
//! block-list rule file maintenance.

pub mod blocklist;
pub mod cli;
pub mod cloudflare;
pub mod config;
pub mod error;
pub mod http;
pub mod utils;

pub use error::{CfwafError, CfwafResult};
