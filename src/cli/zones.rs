//! `cfwaf zones` handlers.

use std::path::Path;

use crate::cloudflare::CloudflareClient;
use crate::config::Settings;

pub async fn list(
    settings: &Settings,
    token: Option<&str>,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let client = CloudflareClient::new(settings)?;
    let Some(zones) = client.zones(token).await? else {
        println!("no zones returned");
        return Ok(());
    };

    if let Some(path) = output {
        super::write_json(path, &zones)?;
        println!("wrote {} zones to {}", zones.len(), path.display());
    } else if json {
        println!("{}", serde_json::to_string_pretty(&zones)?);
    } else {
        println!("{:<34} {:<30} {:<10} {}", "ID", "NAME", "STATUS", "PAUSED");
        println!("{}", "-".repeat(84));
        for zone in &zones {
            println!(
                "{:<34} {:<30} {:<10} {}",
                zone.id,
                zone.name,
                zone.status.as_deref().unwrap_or("-"),
                zone.paused,
            );
        }
    }
    Ok(())
}
