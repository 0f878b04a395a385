use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use super::cache::{CacheError, CacheStore, MemoryStore, SqliteStore, StoredResponse};
use crate::config::{CacheBackend, CacheSettings, HttpSettings};

/// Errors raised by the HTTP transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network-level failures (connect, timeout, TLS); never retried
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response cache failures
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// An immutable request envelope: method, URL, headers and optional body
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Creates a request envelope
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Option<Vec<u8>>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Creates a bodyless GET envelope
    pub fn get(url: Url, headers: HeaderMap) -> Self {
        Self::new(Method::GET, url, headers, None)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// A transport response: status, headers and raw body bytes
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    from_cache: bool,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Canonical reason phrase for the status, or an empty string
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// True when the body was served from the response cache
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}

/// Factory for scoped transport sessions.
///
/// Holds configuration only; the pooled client is created when a session is
/// opened and released when the session is dropped. The cache store is
/// created lazily on first open and shared across sessions.
pub struct HttpTransport {
    cache: CacheSettings,
    http: HttpSettings,
    default_headers: HeaderMap,
    store: Mutex<Option<Arc<dyn CacheStore>>>,
}

impl HttpTransport {
    /// Creates a transport from cache and HTTP settings plus headers applied
    /// to every outgoing request
    pub fn new(cache: CacheSettings, http: HttpSettings, default_headers: HeaderMap) -> Self {
        Self {
            cache,
            http,
            default_headers,
            store: Mutex::new(None),
        }
    }

    /// Opens a scoped session with a freshly built pooled client.
    ///
    /// Dropping the returned session releases the client on every exit path;
    /// reopening builds a new one.
    pub fn open(&self) -> Result<TransportSession, TransportError> {
        let client = self.build_client()?;
        let store = self.store()?;
        Ok(TransportSession {
            client,
            store,
            force_cache: self.cache.force_cache,
        })
    }

    fn build_client(&self) -> Result<Client, TransportError> {
        let redirect = if self.http.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .redirect(redirect)
            .default_headers(self.default_headers.clone())
            .build()?;
        Ok(client)
    }

    fn store(&self) -> Result<Option<Arc<dyn CacheStore>>, TransportError> {
        if !self.cache.enabled {
            return Ok(None);
        }

        let mut slot = self
            .store
            .lock()
            .map_err(|_| CacheError::Backend("transport store lock poisoned".into()))?;
        if slot.is_none() {
            let ttl = Duration::from_secs(self.cache.ttl_seconds);
            let sweep = Duration::from_secs(self.cache.revalidate_interval_seconds);
            let store: Arc<dyn CacheStore> = match self.cache.backend {
                CacheBackend::None => return Ok(None),
                CacheBackend::Memory => Arc::new(MemoryStore::new(ttl, sweep)),
                CacheBackend::Sqlite => {
                    Arc::new(SqliteStore::open(&self.cache.storage_location, ttl, sweep)?)
                }
            };
            *slot = Some(store);
        }
        Ok(slot.clone())
    }
}

/// Scoped handle to the pooled client; see [`HttpTransport::open`]
pub struct TransportSession {
    client: Client,
    store: Option<Arc<dyn CacheStore>>,
    force_cache: bool,
}

impl TransportSession {
    /// Sends a request, consulting the response cache for GETs.
    ///
    /// With force-cache enabled a non-expired entry is served with no
    /// network exchange. Otherwise a stored entry contributes conditional
    /// validators and a 304 answer is satisfied from the store. Successful
    /// GET responses are written back.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let key = (self.store.is_some() && *request.method() == Method::GET)
            .then(|| cache_key(request));

        let mut cached = None;
        if let (Some(store), Some(key)) = (&self.store, &key) {
            cached = store.get(key)?;
            if let Some(entry) = &cached {
                if self.force_cache {
                    debug!(url = %request.url(), "serving response from cache");
                    return response_from_entry(entry);
                }
            }
        }

        // Attach validators when revalidating a stored entry
        let mut headers = request.headers().clone();
        if let Some(entry) = &cached {
            if let Some(value) = entry.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok())
            {
                headers.insert(IF_NONE_MATCH, value);
            }
            if let Some(value) = entry
                .last_modified
                .as_deref()
                .and_then(|v| HeaderValue::from_str(v).ok())
            {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(headers);
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        if status == StatusCode::NOT_MODIFIED {
            if let (Some(entry), Some(store), Some(key)) = (cached, &self.store, &key) {
                debug!(url = %request.url(), "cached response revalidated");
                let refreshed = StoredResponse {
                    stored_at: Utc::now(),
                    ..entry
                };
                store.put(key, &refreshed)?;
                return response_from_entry(&refreshed);
            }
        }

        if status.is_success() {
            if let (Some(store), Some(key)) = (&self.store, &key) {
                store.put(key, &entry_from_response(status, &response_headers, &body))?;
            }
        }

        Ok(ApiResponse {
            status,
            headers: response_headers,
            body,
            from_cache: false,
        })
    }
}

/// Derives the storage key for a request. Method, URL and header values are
/// hashed, so auth material never lands in the store in the clear.
fn cache_key(request: &ApiRequest) -> String {
    let mut header_parts: Vec<(String, String)> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();
    header_parts.sort();

    let mut hasher = blake3::Hasher::new();
    hasher.update(request.method().as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(request.url().as_str().as_bytes());
    for (name, value) in &header_parts {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn entry_from_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> StoredResponse {
    let stored_headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();
    let header_value = |name: HeaderName| {
        headers
            .get(&name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    StoredResponse {
        status: status.as_u16(),
        headers: stored_headers,
        body: body.to_vec(),
        stored_at: Utc::now(),
        etag: header_value(ETAG),
        last_modified: header_value(LAST_MODIFIED),
    }
}

fn response_from_entry(entry: &StoredResponse) -> Result<ApiResponse, TransportError> {
    let status = StatusCode::from_u16(entry.status)
        .map_err(|_| CacheError::Backend(format!("corrupt status {} in cache entry", entry.status)))?;
    let mut headers = HeaderMap::new();
    for (name, value) in &entry.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CacheError::Backend(format!("corrupt header name {name:?} in cache entry")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| CacheError::Backend("corrupt header value in cache entry".into()))?;
        headers.append(name, value);
    }
    Ok(ApiResponse {
        status,
        headers,
        body: entry.body.clone(),
        from_cache: true,
    })
}
