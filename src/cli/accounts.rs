//! `cfwaf accounts` handlers.

use crate::cloudflare::CloudflareClient;
use crate::config::Settings;

pub async fn list(settings: &Settings, token: Option<&str>) -> anyhow::Result<()> {
    let client = CloudflareClient::new(settings)?;
    let Some(accounts) = client.accounts(token).await? else {
        println!("no accounts returned");
        return Ok(());
    };

    println!("{:<34} {}", "ID", "NAME");
    println!("{}", "-".repeat(60));
    for account in &accounts {
        println!("{:<34} {}", account.id, account.name);
    }
    Ok(())
}
