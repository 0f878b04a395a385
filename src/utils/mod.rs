//! Utility modules for the Cloudflare WAF toolkit.
//! This module contains common utilities used across the application.

mod logging;

pub use logging::{api_call_span, init_logging};
