use clap::Parser;

use cfwaf::cli::{self, Cli};
use cfwaf::utils::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    cli::run(cli).await
}
