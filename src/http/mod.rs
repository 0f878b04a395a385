//! HTTP transport layer for the Cloudflare WAF toolkit.
//! This module provides the pooled client sessions and the optional
//! response cache every API call goes through.

mod cache;
mod transport;

pub use cache::{CacheError, CacheStore, MemoryStore, SqliteStore, StoredResponse};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, TransportError, TransportSession};
