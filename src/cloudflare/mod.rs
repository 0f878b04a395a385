//! Cloudflare integration for the WAF toolkit.
//! This module provides the authenticated API client, the typed response
//! envelope decoder and the record types the tool works with.

mod auth;
mod client;
mod envelope;
mod records;

pub use auth::Credentials;
pub use client::CloudflareClient;
pub use envelope::{decode, ApiErrorDetail, DecodeError, Envelope, ResultInfo};
pub use records::{Account, WafFilter, Zone, ZoneRef, ZoneWafFilters};
