use std::io::Write;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use cfwaf::config::{CacheBackend, Settings};

/// Settings pointing at a mock server: bearer token, no response cache,
/// single-page fetches
pub fn test_settings(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.cloudflare.api_base_url = base_url.trim_end_matches('/').to_string();
    settings.cloudflare.api_token = Some("test-token".to_string());
    settings.cloudflare.fetch_all_pages = false;
    settings.cache.backend = CacheBackend::None;
    settings
}

/// A successful Cloudflare envelope wrapping `result`
pub fn envelope(result: Value) -> Value {
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
    })
}

/// A successful envelope carrying pagination info
pub fn paged_envelope(result: Value, page: u32, total_pages: u32, per_page: u32) -> Value {
    let count = result.as_array().map(Vec::len).unwrap_or(0);
    json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result,
        "result_info": {
            "page": page,
            "per_page": per_page,
            "count": count,
            "total_pages": total_pages,
            "total_count": count,
        },
    })
}

/// A zone record as the API returns it
pub fn zone(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "active",
        "paused": false,
        "name_servers": ["ara.ns.cloudflare.com", "bob.ns.cloudflare.com"],
    })
}

/// Shared buffer collecting formatted log output, for asserting on what a
/// call logged. Install with `tracing_subscriber::fmt().with_writer(...)`.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
