//! `cfwaf config` handlers.

use crate::config::Settings;

pub fn show(settings: &Settings, show_secrets: bool) -> anyhow::Result<()> {
    let mut shown = settings.clone();
    if !show_secrets {
        redact(&mut shown.cloudflare.api_token);
        redact(&mut shown.cloudflare.api_key);
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

fn redact(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some("<redacted>".to_string());
    }
}
