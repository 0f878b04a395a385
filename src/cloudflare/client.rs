use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{warn, Instrument};

use super::auth::{bearer_value, Credentials};
use super::envelope::{decode, Envelope};
use super::records::{Account, WafFilter, Zone};
use crate::config::Settings;
use crate::error::{CfwafError, CfwafResult};
use crate::http::{ApiRequest, HttpTransport};
use crate::utils::api_call_span;

/// Client for interacting with Cloudflare's v4 REST API.
///
/// Credentials and cache policy are fixed at construction; each call opens
/// one scoped transport session and drops it before returning.
pub struct CloudflareClient {
    base_url: String,
    credentials: Credentials,
    transport: HttpTransport,
    fetch_all_pages: bool,
    per_page: u32,
}

impl CloudflareClient {
    /// Creates a new Cloudflare client from validated settings
    pub fn new(settings: &Settings) -> CfwafResult<Self> {
        let credentials = Credentials::from_parts(
            settings.cloudflare.api_token.clone(),
            settings.cloudflare.api_email.clone(),
            settings.cloudflare.api_key.clone(),
        )?;
        let default_headers = build_default_headers(&settings.http.default_headers)?;
        let transport = HttpTransport::new(
            settings.cache.clone(),
            settings.http.clone(),
            default_headers,
        );

        Ok(Self {
            base_url: settings
                .cloudflare
                .api_base_url
                .trim_end_matches('/')
                .to_string(),
            credentials,
            transport,
            fetch_all_pages: settings.cloudflare.fetch_all_pages,
            per_page: settings.cloudflare.per_page,
        })
    }

    /// Lists the accounts visible to the configured credentials
    pub async fn accounts(&self, token: Option<&str>) -> CfwafResult<Option<Vec<Account>>> {
        self.fetch_list("/accounts", token, "accounts").await
    }

    /// Lists the zones visible to the configured credentials
    pub async fn zones(&self, token: Option<&str>) -> CfwafResult<Option<Vec<Zone>>> {
        self.fetch_list("/zones", token, "zones").await
    }

    /// Lists the WAF filters attached to a zone
    pub async fn zone_waf_filters(
        &self,
        zone_id: &str,
        token: Option<&str>,
    ) -> CfwafResult<Option<Vec<WafFilter>>> {
        self.fetch_list(&format!("/zones/{zone_id}/filters"), token, "zone_filters")
            .await
    }

    /// Runs one list call: build auth, open a session, walk the pages,
    /// validate each status and decode each envelope.
    ///
    /// Non-2xx responses and null results are logged and surfaced as
    /// `Ok(None)`; transport and decode failures propagate as errors.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        resource: &str,
    ) -> CfwafResult<Option<Vec<T>>> {
        let auth_headers = self.build_auth_headers(token)?;
        let span = api_call_span(resource);

        async {
            let session = self.transport.open()?;
            let mut items = Vec::new();
            let mut page = 1u32;

            loop {
                let url = self.page_url(path, page)?;
                let request = ApiRequest::get(url, auth_headers.clone());
                let response = session.send(&request).await?;

                if !response.is_success() {
                    warn!(
                        status = response.status().as_u16(),
                        reason = response.reason(),
                        body = %response.text(),
                        "Cloudflare API request failed"
                    );
                    return Ok(None);
                }

                let envelope: Envelope<Vec<T>> = decode(response.body())?;
                let info = envelope.result_info.clone();
                let Some(page_items) = envelope.into_result() else {
                    warn!(page, "envelope carried a null result, treating as no data");
                    return Ok(None);
                };
                items.extend(page_items);

                if !self.fetch_all_pages {
                    break;
                }
                match info {
                    Some(info) if page < info.total_pages => page += 1,
                    _ => break,
                }
            }

            Ok(Some(items))
        }
        .instrument(span)
        .await
    }

    /// Builds the auth headers for one call. A per-call token forces bearer
    /// auth; otherwise the configured credential decides the strategy.
    fn build_auth_headers(&self, token: Option<&str>) -> CfwafResult<HeaderMap> {
        if token.is_some() || matches!(self.credentials, Credentials::Bearer { .. }) {
            let token = self.validate_token_auth(token)?;
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, bearer_value(token)?);
            Ok(headers)
        } else {
            self.credentials.auth_headers()
        }
    }

    /// Resolves the effective bearer token for a call, preferring the
    /// per-call override over the configured credential
    fn validate_token_auth<'a>(&'a self, token: Option<&'a str>) -> CfwafResult<&'a str> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(token),
            None => match &self.credentials {
                Credentials::Bearer { token } => Ok(token),
                Credentials::KeyPair { .. } => {
                    Err(CfwafError::Configuration("no API token provided".into()))
                }
            },
        }
    }

    fn page_url(&self, path: &str, page: u32) -> CfwafResult<Url> {
        let mut url = format!("{}{}", self.base_url, path);
        if self.fetch_all_pages {
            url = format!("{url}?page={page}&per_page={}", self.per_page);
        }
        Url::parse(&url)
            .map_err(|e| CfwafError::Configuration(format!("invalid API URL {url:?}: {e}")))
    }
}

// Delegates credential rendering to the redacting `Credentials` impl and
// skips the transport internals
impl fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("fetch_all_pages", &self.fetch_all_pages)
            .field("per_page", &self.per_page)
            .finish_non_exhaustive()
    }
}

fn build_default_headers(
    headers: &std::collections::HashMap<String, String>,
) -> CfwafResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            CfwafError::Configuration(format!("invalid default header name {name:?}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            CfwafError::Configuration(format!("invalid default header value for {name}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::auth::{X_AUTH_EMAIL, X_AUTH_KEY};
    use crate::config::{CacheBackend, CloudflareSettings};

    fn settings(
        token: Option<&str>,
        email: Option<&str>,
        key: Option<&str>,
    ) -> Settings {
        let mut settings = Settings {
            cloudflare: CloudflareSettings {
                api_token: token.map(str::to_string),
                api_email: email.map(str::to_string),
                api_key: key.map(str::to_string),
                ..CloudflareSettings::default()
            },
            ..Settings::default()
        };
        settings.cache.backend = CacheBackend::None;
        settings
    }

    #[test]
    fn construction_fails_without_credentials() {
        let err = CloudflareClient::new(&settings(None, None, None)).unwrap_err();
        assert!(matches!(err, CfwafError::Configuration(_)));
    }

    #[test]
    fn client_debug_redacts_the_token() {
        let client = CloudflareClient::new(&settings(Some("abc123"), None, None)).unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("abc123"));
    }

    #[test]
    fn bearer_headers_win_when_both_shapes_are_configured() {
        let client = CloudflareClient::new(&settings(
            Some("abc123"),
            Some("admin@example.com"),
            Some("deadbeef"),
        ))
        .unwrap();

        let headers = client.build_auth_headers(None).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc123");
        assert!(headers.get(X_AUTH_EMAIL).is_none());
        assert!(headers.get(X_AUTH_KEY).is_none());
    }

    #[test]
    fn key_pair_headers_used_without_a_token() {
        let client = CloudflareClient::new(&settings(
            None,
            Some("admin@example.com"),
            Some("deadbeef"),
        ))
        .unwrap();

        let headers = client.build_auth_headers(None).unwrap();
        assert_eq!(headers[X_AUTH_EMAIL], "admin@example.com");
        assert_eq!(headers[X_AUTH_KEY], "deadbeef");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn per_call_token_overrides_key_pair_auth() {
        let client = CloudflareClient::new(&settings(
            None,
            Some("admin@example.com"),
            Some("deadbeef"),
        ))
        .unwrap();

        let headers = client.build_auth_headers(Some("override")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer override");
        assert!(headers.get(X_AUTH_EMAIL).is_none());
    }

    #[test]
    fn empty_override_without_a_configured_token_is_rejected() {
        let client = CloudflareClient::new(&settings(
            None,
            Some("admin@example.com"),
            Some("deadbeef"),
        ))
        .unwrap();

        let err = client.build_auth_headers(Some("")).unwrap_err();
        assert!(matches!(err, CfwafError::Configuration(_)));
        assert!(err.to_string().contains("no API token provided"));
    }

    #[test]
    fn empty_override_falls_back_to_the_configured_token() {
        let client = CloudflareClient::new(&settings(Some("abc123"), None, None)).unwrap();
        let headers = client.build_auth_headers(Some("")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc123");
    }

    #[test]
    fn page_url_carries_pagination_parameters_only_when_walking() {
        let mut cfg = settings(Some("abc123"), None, None);
        cfg.cloudflare.per_page = 25;
        let client = CloudflareClient::new(&cfg).unwrap();
        assert_eq!(
            client.page_url("/zones", 2).unwrap().as_str(),
            "https://api.cloudflare.com/client/v4/zones?page=2&per_page=25"
        );

        cfg.cloudflare.fetch_all_pages = false;
        let client = CloudflareClient::new(&cfg).unwrap();
        assert_eq!(
            client.page_url("/zones", 1).unwrap().as_str(),
            "https://api.cloudflare.com/client/v4/zones"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_tolerated() {
        let mut cfg = settings(Some("abc123"), None, None);
        cfg.cloudflare.api_base_url = "https://api.cloudflare.com/client/v4/".to_string();
        cfg.cloudflare.fetch_all_pages = false;
        let client = CloudflareClient::new(&cfg).unwrap();
        assert_eq!(
            client.page_url("/accounts", 1).unwrap().as_str(),
            "https://api.cloudflare.com/client/v4/accounts"
        );
    }

    #[test]
    fn invalid_default_header_is_a_configuration_error() {
        let mut cfg = settings(Some("abc123"), None, None);
        cfg.http
            .default_headers
            .insert("bad header".to_string(), "x".to_string());
        let err = CloudflareClient::new(&cfg).unwrap_err();
        assert!(matches!(err, CfwafError::Configuration(_)));
    }
}
