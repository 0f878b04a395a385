use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_CACHE_LOCATION: &str = ".cache/http/cfwaf.sqlite3";

/// Configuration settings for the Cloudflare WAF toolkit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cloudflare API configuration
    pub cloudflare: CloudflareSettings,
    /// Response cache configuration
    pub cache: CacheSettings,
    /// HTTP client configuration
    pub http: HttpSettings,
}

/// Cloudflare-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudflareSettings {
    /// Base URL of the Cloudflare v4 REST API
    pub api_base_url: String,
    /// API token for bearer auth
    pub api_token: Option<String>,
    /// Account email for key-pair auth
    pub api_email: Option<String>,
    /// Account API key for key-pair auth
    pub api_key: Option<String>,
    /// Walk every page of list endpoints instead of fetching only one
    pub fetch_all_pages: bool,
    /// Page size requested while walking pages
    pub per_page: u32,
}

/// Storage backend for the response cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// No response caching
    None,
    /// Per-process in-memory store
    Memory,
    /// On-disk SQLite store
    Sqlite,
}

/// Response cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Master switch for response caching
    pub enabled: bool,
    /// Storage backend to use when caching is enabled
    pub backend: CacheBackend,
    /// Location of the SQLite cache database
    pub storage_location: String,
    /// Seconds a cached response stays servable
    pub ttl_seconds: u64,
    /// Minimum seconds between expired-entry sweeps
    pub revalidate_interval_seconds: u64,
    /// Serve any non-expired entry without contacting the network
    pub force_cache: bool,
}

/// HTTP client configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Follow HTTP redirects
    pub follow_redirects: bool,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Extra headers applied to every outgoing request
    pub default_headers: HashMap<String, String>,
}

impl Settings {
    /// Load configuration from config files and environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("settings").required(false))
            .add_source(config::File::with_name(".secrets").required(false))
            .add_source(config::Environment::with_prefix("CFWAF").separator("__"))
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        // The conventional CF_* credential variables win over file values
        if let Ok(token) = env::var("CF_API_TOKEN") {
            settings.cloudflare.api_token = Some(token);
        }
        if let Ok(email) = env::var("CF_API_EMAIL") {
            settings.cloudflare.api_email = Some(email);
        }
        if let Ok(key) = env::var("CF_API_KEY") {
            settings.cloudflare.api_key = Some(key);
        }

        Ok(settings)
    }
}

impl Default for CloudflareSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            api_email: None,
            api_key: None,
            fetch_all_pages: true,
            per_page: 50,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Sqlite,
            storage_location: DEFAULT_CACHE_LOCATION.to_string(),
            ttl_seconds: 900,
            revalidate_interval_seconds: 60,
            force_cache: true,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            timeout_seconds: 30,
            default_headers: HashMap::new(),
        }
    }
}
