//! `cfwaf blocklist` handlers.

use std::path::{Path, PathBuf};

use super::BlocklistCommands;
use crate::blocklist::{
    sort_country_file, sort_ip_file, sort_ua_file, COUNTRY_BLOCKS_FILE, IP_BLOCKS_FILE,
    UA_BLOCKS_FILE,
};
use crate::error::CfwafResult;

type SortFn = fn(&Path, Option<&Path>, bool) -> CfwafResult<bool>;

pub fn handle(command: &BlocklistCommands) -> anyhow::Result<()> {
    let BlocklistCommands::Lint {
        dir,
        ips,
        countries,
        ua,
    } = command;

    let jobs: [(Option<&Path>, &str, SortFn); 3] = [
        (ips.as_deref(), IP_BLOCKS_FILE, sort_ip_file),
        (countries.as_deref(), COUNTRY_BLOCKS_FILE, sort_country_file),
        (ua.as_deref(), UA_BLOCKS_FILE, sort_ua_file),
    ];

    let mut linted = 0usize;
    for (explicit, default_name, sort) in jobs {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = dir.join(default_name);
                // Only explicitly named files are required to exist
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "rule file not found, skipped");
                    continue;
                }
                path
            }
        };
        sort(&path, None, true)?;
        println!("linted {}", path.display());
        linted += 1;
    }

    if linted == 0 {
        println!("no rule files found under {}", dir.display());
    }
    Ok(())
}
