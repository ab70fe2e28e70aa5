//! Extraction of IP records from free-form text

use crate::subnet::{IpRecord, PrefixLengths};
use regex::Regex;
use std::io::BufRead;
use std::net::IpAddr;
use std::path::Path;
use std::sync::LazyLock;

static IPV4_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static regex is valid")
});

/// First valid IP address on a line
///
/// Dotted-quad candidates are tried first, then whitespace-separated
/// tokens that parse as IPv6. Candidates such as `999.1.1.1` are skipped.
pub fn extract_ip(line: &str) -> Option<IpAddr> {
    IPV4_CANDIDATE
        .find_iter(line)
        .find_map(|m| m.as_str().parse::<IpAddr>().ok())
        .or_else(|| {
            line.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|token| token.contains(':'))
                .find_map(|token| {
                    token
                        .trim_matches(|c| c == '[' || c == ']')
                        .parse::<std::net::Ipv6Addr>()
                        .ok()
                        .map(IpAddr::V6)
                })
        })
}

/// Records from a reader, one per line carrying an IP; other lines are skipped
pub fn read_records<R: BufRead>(
    reader: R,
    prefixes: PrefixLengths,
) -> std::io::Result<Vec<IpRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if let Some(record) =
            extract_ip(trimmed).and_then(|ip| IpRecord::new(trimmed, ip, prefixes))
        {
            records.push(record);
        }
    }
    Ok(records)
}

/// Records from a file
pub fn read_records_from_file(
    path: &Path,
    prefixes: PrefixLengths,
) -> std::io::Result<Vec<IpRecord>> {
    let file = std::fs::File::open(path)?;
    read_records(std::io::BufReader::new(file), prefixes)
}
