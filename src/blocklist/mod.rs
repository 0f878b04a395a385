//! Block-list file maintenance for the Cloudflare WAF toolkit.
//! This module sorts and deduplicates the local text files the WAF filter
//! rules are built from: IP ranges, country codes and user-agent patterns.

use std::path::{Path, PathBuf};

use ipnetwork::IpNetwork;
use tracing::{info, warn};

use crate::error::{CfwafError, CfwafResult};

/// Default directory holding the WAF block-list files
pub const DEFAULT_RULES_DIR: &str = "./.data/cf_waf_filter_rules";
/// Default IP block-list file name
pub const IP_BLOCKS_FILE: &str = "block_ips.txt";
/// Default country-code block-list file name
pub const COUNTRY_BLOCKS_FILE: &str = "countries.txt";
/// Default user-agent block-list file name
pub const UA_BLOCKS_FILE: &str = "ua_strings.txt";

/// Sorts the IP block-list numerically and deduplicates it.
///
/// Entries may be bare addresses or CIDR ranges; each line keeps its
/// original spelling. Returns `Ok(false)` when no output location applies.
pub fn sort_ip_file(
    file_path: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> CfwafResult<bool> {
    let Some(output) = resolve_output(file_path, output, overwrite) else {
        return Ok(false);
    };

    let lines = read_lines(file_path)?;
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines {
        let network: IpNetwork = line
            .parse()
            .map_err(|e| CfwafError::InvalidInput(format!("invalid IP entry {line:?}: {e}")))?;
        entries.push((network, line));
    }
    entries.sort_by_key(|(network, _)| *network);
    entries.dedup_by_key(|(network, _)| *network);

    let sorted: Vec<String> = entries.into_iter().map(|(_, line)| line).collect();
    write_lines(&output, &sorted)?;
    info!(count = sorted.len(), output = %output.display(), "wrote sorted IP block-list");
    Ok(true)
}

/// Sorts the country-code block-list alphabetically and deduplicates it.
/// Returns `Ok(false)` when no output location applies.
pub fn sort_country_file(
    file_path: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> CfwafResult<bool> {
    let Some(output) = resolve_output(file_path, output, overwrite) else {
        return Ok(false);
    };

    let mut codes = read_lines(file_path)?;
    codes.sort();
    codes.dedup();

    write_lines(&output, &codes)?;
    info!(count = codes.len(), output = %output.display(), "wrote sorted country block-list");
    Ok(true)
}

/// Sorts the user-agent block-list alphabetically, comparing patterns with
/// their `*` wildcards ignored while preserving the original strings.
/// Returns `Ok(false)` when no output location applies.
pub fn sort_ua_file(
    file_path: &Path,
    output: Option<&Path>,
    overwrite: bool,
) -> CfwafResult<bool> {
    let Some(output) = resolve_output(file_path, output, overwrite) else {
        return Ok(false);
    };

    let mut patterns = read_lines(file_path)?;
    patterns.sort_by_key(|pattern| pattern.replace('*', ""));
    patterns.dedup();

    write_lines(&output, &patterns)?;
    info!(count = patterns.len(), output = %output.display(), "wrote sorted user-agent block-list");
    Ok(true)
}

/// Where a sort writes its output: an explicit path, the input itself when
/// overwriting is allowed, or nowhere
fn resolve_output(file_path: &Path, output: Option<&Path>, overwrite: bool) -> Option<PathBuf> {
    match output {
        Some(path) => Some(path.to_path_buf()),
        None if overwrite => {
            warn!(file = %file_path.display(), "no output path given, overwriting in place");
            Some(file_path.to_path_buf())
        }
        None => {
            warn!(
                file = %file_path.display(),
                "no output path given and overwrite disabled, leaving file untouched"
            );
            None
        }
    }
}

fn read_lines(path: &Path) -> CfwafResult<Vec<String>> {
    if !path.exists() {
        return Err(CfwafError::InvalidInput(format!(
            "block-list file {} does not exist",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn write_lines(path: &Path, lines: &[String]) -> CfwafResult<()> {
    std::fs::write(path, lines.join("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn ip_sort_orders_numerically_and_preserves_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            &dir,
            "block_ips.txt",
            "203.0.113.7\n10.0.0.0/24\n2001:db8::1\n10.0.0.0/24\n192.0.2.1\n",
        );

        assert!(sort_ip_file(&path, None, true).unwrap());

        let sorted = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            sorted,
            "10.0.0.0/24\n192.0.2.1\n203.0.113.7\n2001:db8::1"
        );
    }

    #[test]
    fn ip_sort_rejects_unparsable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, "block_ips.txt", "10.0.0.1\nnot-an-ip\n");

        let err = sort_ip_file(&path, None, true).unwrap_err();
        assert!(matches!(err, CfwafError::InvalidInput(_)));
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn country_sort_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, "countries.txt", "RU\nCN\nKP\nCN\n");

        assert!(sort_country_file(&path, None, true).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "CN\nKP\nRU");
    }

    #[test]
    fn ua_sort_ignores_wildcards_but_keeps_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            &dir,
            "ua_strings.txt",
            "*zgrab*\n*curl*\nAhrefsBot\n*burpcollaborator*\n",
        );

        assert!(sort_ua_file(&path, None, true).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "AhrefsBot\n*burpcollaborator*\n*curl*\n*zgrab*"
        );
    }

    #[test]
    fn no_output_and_no_overwrite_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, "countries.txt", "RU\nCN\n");

        assert!(!sort_country_file(&path, None, false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "RU\nCN\n");
    }

    #[test]
    fn explicit_output_leaves_the_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, "countries.txt", "RU\nCN\n");
        let out = dir.path().join("sorted.txt");

        assert!(sort_country_file(&path, Some(&out), false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "RU\nCN\n");
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "CN\nRU");
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");
        let err = sort_country_file(&missing, None, true).unwrap_err();
        assert!(matches!(err, CfwafError::InvalidInput(_)));
    }
}
