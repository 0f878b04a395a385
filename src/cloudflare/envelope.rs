use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding Cloudflare response envelopes
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body was not valid JSON, or a field did not match the expected shape
    #[error("invalid JSON in response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope arrived without a `result` key
    #[error("response envelope has no `result` key")]
    MissingResult,

    /// Envelope reported `success: false`
    #[error("API reported failure: {}", summarize_errors(.0))]
    Unsuccessful(Vec<ApiErrorDetail>),
}

/// A Cloudflare API error object
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: i64,
    pub message: String,
}

/// Pagination metadata attached to list envelopes
#[derive(Debug, Clone, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: u32,
}

/// Cloudflare's JSON wrapper around every API payload
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
    /// Informational entries; carried through but never interpreted
    #[serde(default)]
    pub messages: Vec<Value>,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    /// Consumes the envelope, yielding the `result` payload. A `null`
    /// result decodes as `None`: the API's way of saying there is no data,
    /// as opposed to the key being absent, which is a decode error.
    pub fn into_result(self) -> Option<T> {
        self.result
    }
}

/// Decodes a response body into a typed envelope.
///
/// `success: false` and a missing `result` key are rejected before the
/// payload is deserialized, so callers never observe a half-decoded
/// envelope.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>, DecodeError> {
    let raw: Value = serde_json::from_slice(body)?;

    if raw.get("success").and_then(Value::as_bool) == Some(false) {
        let errors = raw
            .get("errors")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        return Err(DecodeError::Unsuccessful(errors));
    }

    if let Some(fields) = raw.as_object() {
        if !fields.contains_key("result") {
            return Err(DecodeError::MissingResult);
        }
    }

    Ok(serde_json::from_value(raw)?)
}

fn summarize_errors(errors: &[ApiErrorDetail]) -> String {
    if errors.is_empty() {
        return "no error details given".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::records::Zone;

    #[test]
    fn decodes_a_list_envelope() {
        let body = br#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": [
                {"id": "023e105f4ecef8ad9ca31a8372d0c353", "name": "example.com"},
                {"id": "023e105f4ecef8ad9ca31a8372d0c354", "name": "example.org"}
            ],
            "result_info": {"page": 1, "per_page": 20, "count": 2, "total_pages": 1, "total_count": 2}
        }"#;

        let envelope: Envelope<Vec<Zone>> = decode(body).unwrap();
        assert!(envelope.success);
        let info = envelope.result_info.clone().unwrap();
        assert_eq!(info.total_pages, 1);

        let zones = envelope.into_result().unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "example.com");
    }

    #[test]
    fn null_result_decodes_as_no_data() {
        let body = br#"{"success": true, "errors": [], "messages": [], "result": null}"#;
        let envelope: Envelope<Vec<Zone>> = decode(body).unwrap();
        assert!(envelope.into_result().is_none());
    }

    #[test]
    fn rejects_a_body_that_is_not_json() {
        let err = decode::<Vec<Zone>>(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn rejects_an_envelope_without_a_result_key() {
        let body = br#"{"success": true, "errors": [], "messages": []}"#;
        let err = decode::<Vec<Zone>>(body).unwrap_err();
        assert!(matches!(err, DecodeError::MissingResult));
    }

    #[test]
    fn rejects_an_unsuccessful_envelope_before_reading_result() {
        let body = br#"{
            "success": false,
            "errors": [{"code": 9109, "message": "Invalid access token"}],
            "messages": []
        }"#;
        let err = decode::<Vec<Zone>>(body).unwrap_err();
        match err {
            DecodeError::Unsuccessful(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, 9109);
            }
            other => panic!("expected Unsuccessful, got {other:?}"),
        }
        let display = decode::<Vec<Zone>>(body).unwrap_err().to_string();
        assert!(display.contains("9109"));
        assert!(display.contains("Invalid access token"));
    }

    #[test]
    fn rejects_a_result_of_the_wrong_shape() {
        let body = br#"{"success": true, "errors": [], "messages": [], "result": "oops"}"#;
        let err = decode::<Vec<Zone>>(body).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }
}
