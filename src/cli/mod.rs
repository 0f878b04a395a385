//! Command-line interface.
//!
//! clap definitions and the per-command handlers.

mod accounts;
mod blocklist;
mod config_show;
mod waf;
mod zones;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::blocklist::DEFAULT_RULES_DIR;
use crate::config::load_config;

#[derive(Parser)]
#[command(name = "cfwaf")]
#[command(version)]
#[command(about = "Inspect Cloudflare accounts, zones and WAF filters; maintain local block-lists", long_about = None)]
pub struct Cli {
    /// API token for this invocation, overriding the configured credentials
    #[arg(long, global = true)]
    pub token: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the accounts visible to the configured credentials
    #[command(subcommand)]
    Accounts(AccountsCommands),
    /// Inspect zones
    #[command(subcommand)]
    Zones(ZonesCommands),
    /// Inspect WAF firewall filters
    #[command(subcommand)]
    Waf(WafCommands),
    /// Maintain the local block-list rule files
    #[command(subcommand)]
    Blocklist(BlocklistCommands),
    /// Inspect the resolved configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List accounts as a table
    List,
}

#[derive(Subcommand)]
pub enum ZonesCommands {
    /// List zones
    List {
        /// Print the zone list as JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Write the zone list to a file as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum WafCommands {
    /// List the firewall filters of a single zone
    Filters {
        /// Zone identifier
        #[arg(long)]
        zone: String,
        /// Write the filters to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Collect the firewall filters of every zone
    Dump {
        /// Write the collected filters to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BlocklistCommands {
    /// Sort and de-duplicate the block-list rule files in place
    Lint {
        /// Directory holding the rule files
        #[arg(long, default_value = DEFAULT_RULES_DIR)]
        dir: PathBuf,
        /// IP rules file, overriding the directory layout
        #[arg(long)]
        ips: Option<PathBuf>,
        /// Country rules file, overriding the directory layout
        #[arg(long)]
        countries: Option<PathBuf>,
        /// User-agent rules file, overriding the directory layout
        #[arg(long)]
        ua: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show {
        /// Print credential values instead of redacting them
        #[arg(long)]
        show_secrets: bool,
    },
}

/// Dispatches a parsed command line to its handler.
///
/// Settings are loaded per arm: block-list linting is purely local and
/// must work without settings files.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let token = cli.token.as_deref();

    match cli.command {
        Commands::Blocklist(command) => blocklist::handle(&command),
        Commands::Accounts(AccountsCommands::List) => {
            accounts::list(&load_config()?, token).await
        }
        Commands::Zones(ZonesCommands::List { json, output }) => {
            zones::list(&load_config()?, token, json, output.as_deref()).await
        }
        Commands::Waf(WafCommands::Filters { zone, output }) => {
            waf::filters(&load_config()?, token, &zone, output.as_deref()).await
        }
        Commands::Waf(WafCommands::Dump { output }) => {
            waf::dump(&load_config()?, token, output.as_deref()).await
        }
        Commands::Config(ConfigCommands::Show { show_secrets }) => {
            config_show::show(&load_config()?, show_secrets)
        }
    }
}

/// Writes a value to a file as pretty-printed JSON
fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocklist::IP_BLOCKS_FILE;

    #[tokio::test]
    async fn blocklist_lint_runs_without_any_settings() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(IP_BLOCKS_FILE), "10.0.0.0/8\n1.2.3.4")?;

        let dir_arg = dir.path().display().to_string();
        let cli = Cli::parse_from(["cfwaf", "blocklist", "lint", "--dir", dir_arg.as_str()]);
        run(cli).await?;

        let linted = std::fs::read_to_string(dir.path().join(IP_BLOCKS_FILE))?;
        assert_eq!(linted, "1.2.3.4\n10.0.0.0/8");
        Ok(())
    }
}
