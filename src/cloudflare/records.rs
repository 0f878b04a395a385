use serde::{Deserialize, Serialize};

/// A Cloudflare account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

/// A Cloudflare zone; fields beyond the identifying pair are optional so
/// older API payloads still decode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub account: Option<Account>,
}

/// Identifying subset of a zone carried in dump artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneRef {
    pub id: String,
    pub name: String,
}

impl From<&Zone> for ZoneRef {
    fn from(zone: &Zone) -> Self {
        Self {
            id: zone.id.clone(),
            name: zone.name.clone(),
        }
    }
}

/// A WAF filter expression attached to a zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WafFilter {
    pub id: String,
    pub expression: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// One zone's filters in the WAF fan-out dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneWafFilters {
    pub zone: ZoneRef,
    pub filters: Vec<WafFilter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_decodes_with_and_without_optional_fields() {
        let full: Zone = serde_json::from_str(
            r#"{
                "id": "023e105f4ecef8ad9ca31a8372d0c353",
                "name": "example.com",
                "status": "active",
                "paused": false,
                "name_servers": ["bob.ns.cloudflare.com", "lola.ns.cloudflare.com"],
                "account": {"id": "01a7362d577a6c3019a474fd6f485823", "name": "Demo Account"}
            }"#,
        )
        .unwrap();
        assert_eq!(full.status.as_deref(), Some("active"));
        assert_eq!(full.name_servers.len(), 2);

        let bare: Zone =
            serde_json::from_str(r#"{"id": "abc", "name": "example.org"}"#).unwrap();
        assert!(bare.status.is_none());
        assert!(!bare.paused);
        assert!(bare.account.is_none());
    }

    #[test]
    fn waf_filter_round_trips_the_ref_field() {
        let filter: WafFilter = serde_json::from_str(
            r#"{
                "id": "372e67954025e0ba6aaa6d586b9e0b61",
                "expression": "(ip.src in {198.51.100.0/24})",
                "paused": false,
                "description": "Block scraper ranges",
                "ref": "FIL-100"
            }"#,
        )
        .unwrap();
        assert_eq!(filter.reference.as_deref(), Some("FIL-100"));

        let serialized = serde_json::to_value(&filter).unwrap();
        assert_eq!(serialized["ref"], "FIL-100");
        assert!(serialized.get("reference").is_none());
    }

    #[test]
    fn zone_ref_borrows_the_identifying_pair() {
        let zone: Zone =
            serde_json::from_str(r#"{"id": "abc", "name": "example.org"}"#).unwrap();
        let zone_ref = ZoneRef::from(&zone);
        assert_eq!(zone_ref.id, "abc");
        assert_eq!(zone_ref.name, "example.org");
    }
}
