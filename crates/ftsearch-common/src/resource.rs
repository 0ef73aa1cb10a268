//! Process resource observation
//!
//! Memory figures are for log context only; nothing in the pipeline makes
//! decisions based on them.

use std::fs::File;
use std::io::{BufRead, BufReader};

const PROC_STATUS_PATH: &str = "/proc/self/status";

/// Resident set size of the current process in bytes
///
/// Reads `VmRSS` from `/proc/self/status`. Returns `0` when the file does not
/// exist (non-Linux hosts) or the line cannot be parsed, so callers treat zero
/// as "not measurable".
pub fn memory_usage() -> u64 {
    let Ok(file) = File::open(PROC_STATUS_PATH) else {
        return 0;
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .find_map(|line| parse_vm_rss(&line))
        .unwrap_or(0)
}

/// Parse a `VmRSS:   12345 kB` status line into bytes
fn parse_vm_rss(line: &str) -> Option<u64> {
    let rest = line.strip_prefix("VmRSS:")?;
    let kib = rest.trim().strip_suffix("kB")?.trim().parse::<u64>().ok()?;
    kib.checked_mul(1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss_line() {
        assert_eq!(parse_vm_rss("VmRSS:\t   2048 kB"), Some(2048 * 1024));
    }

    #[test]
    fn test_parse_ignores_other_lines() {
        assert_eq!(parse_vm_rss("VmSize:\t   2048 kB"), None);
        assert_eq!(parse_vm_rss("VmRSS:\t   lots kB"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memory_usage_is_measurable_on_linux() {
        assert!(memory_usage() > 0);
    }
}
