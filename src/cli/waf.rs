//! `cfwaf waf` handlers.

use std::path::Path;

use crate::cloudflare::{CloudflareClient, ZoneRef, ZoneWafFilters};
use crate::config::Settings;

pub async fn filters(
    settings: &Settings,
    token: Option<&str>,
    zone_id: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let client = CloudflareClient::new(settings)?;
    let Some(filters) = client.zone_waf_filters(zone_id, token).await? else {
        println!("no filters returned for zone {zone_id}");
        return Ok(());
    };

    if let Some(path) = output {
        super::write_json(path, &filters)?;
        println!("wrote {} filters to {}", filters.len(), path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&filters)?);
    }
    Ok(())
}

/// Collects the filters of every zone, skipping zones whose listing fails.
pub async fn dump(
    settings: &Settings,
    token: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let client = CloudflareClient::new(settings)?;
    let Some(zones) = client.zones(token).await? else {
        println!("no zones returned; nothing to dump");
        return Ok(());
    };

    let mut dump = Vec::with_capacity(zones.len());
    for zone in &zones {
        match client.zone_waf_filters(&zone.id, token).await {
            Ok(Some(filters)) => dump.push(ZoneWafFilters {
                zone: ZoneRef::from(zone),
                filters,
            }),
            Ok(None) => {
                tracing::warn!(zone = %zone.name, "filter listing rejected, zone skipped");
            }
            Err(error) => {
                tracing::warn!(zone = %zone.name, %error, "filter listing failed, zone skipped");
            }
        }
    }

    if let Some(path) = output {
        super::write_json(path, &dump)?;
        println!(
            "wrote filters for {} of {} zones to {}",
            dump.len(),
            zones.len(),
            path.display()
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }
    Ok(())
}
