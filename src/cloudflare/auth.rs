use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::error::{CfwafError, CfwafResult};

/// Header carrying the account email for key-pair auth
pub const X_AUTH_EMAIL: &str = "x-auth-email";
/// Header carrying the API key for key-pair auth
pub const X_AUTH_KEY: &str = "x-auth-key";

/// API credentials; the variant decides the auth header strategy
#[derive(Clone)]
pub enum Credentials {
    /// `Authorization: Bearer <token>` auth
    Bearer { token: String },
    /// Legacy `X-Auth-Email` / `X-Auth-Key` auth
    KeyPair { email: String, key: String },
}

impl Credentials {
    /// Builds credentials from optional parts.
    ///
    /// A non-empty token wins over a key pair; empty strings count as
    /// absent. Fails when neither shape is complete.
    pub fn from_parts(
        token: Option<String>,
        email: Option<String>,
        key: Option<String>,
    ) -> CfwafResult<Self> {
        let token = token.filter(|t| !t.is_empty());
        let email = email.filter(|e| !e.is_empty());
        let key = key.filter(|k| !k.is_empty());

        if let Some(token) = token {
            return Ok(Credentials::Bearer { token });
        }
        match (email, key) {
            (Some(email), Some(key)) => Ok(Credentials::KeyPair { email, key }),
            _ => Err(CfwafError::Configuration(
                "no API credentials configured: set an API token or an email/key pair".into(),
            )),
        }
    }

    /// Auth headers for this credential; exactly one strategy is emitted
    pub fn auth_headers(&self) -> CfwafResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        match self {
            Credentials::Bearer { token } => {
                headers.insert(AUTHORIZATION, bearer_value(token)?);
            }
            Credentials::KeyPair { email, key } => {
                headers.insert(X_AUTH_EMAIL, secret_value(email)?);
                headers.insert(X_AUTH_KEY, secret_value(key)?);
            }
        }
        Ok(headers)
    }
}

// Secrets must not leak through debug logging
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
            Credentials::KeyPair { email, .. } => f
                .debug_struct("KeyPair")
                .field("email", email)
                .field("key", &"<redacted>")
                .finish(),
        }
    }
}

/// Builds a `Bearer <token>` header value, marked sensitive
pub(crate) fn bearer_value(token: &str) -> CfwafResult<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        CfwafError::Configuration("API token contains invalid header characters".into())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn secret_value(secret: &str) -> CfwafResult<HeaderValue> {
    let mut value = HeaderValue::from_str(secret).map_err(|_| {
        CfwafError::Configuration("credential contains invalid header characters".into())
    })?;
    value.set_sensitive(true);
    Ok(value)
}
