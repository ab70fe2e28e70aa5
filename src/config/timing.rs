//! Compile-time defaults for pacing, timeouts and grouping
//!
//! Every value here can be overridden per run through
//! [`CollectorConfig`](crate::config::CollectorConfig), either from a TOML
//! file or from command-line flags.

use std::time::Duration;

/// Minimum delay between two calls to the same HTTP source, in milliseconds
pub const DEFAULT_HTTP_MIN_INTERVAL_MS: u64 = 300;
/// Minimum delay between two calls to a WHOIS-style source, in milliseconds
pub const DEFAULT_WHOIS_MIN_INTERVAL_MS: u64 = 1000;
/// Request timeout for HTTP sources, in milliseconds
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
/// Connect + read timeout for WHOIS and DNS sources, in milliseconds
pub const DEFAULT_WHOIS_TIMEOUT_MS: u64 = 10_000;
/// Extra attempts an adapter makes after a transient failure
pub const DEFAULT_RETRIES: u8 = 1;

/// Default IPv4 grouping prefix
pub const DEFAULT_IPV4_PREFIX_LEN: u8 = 16;
/// Default IPv6 grouping prefix
pub const DEFAULT_IPV6_PREFIX_LEN: u8 = 48;

/// Default HTTP pacing as a duration
pub fn http_min_interval() -> Duration {
    Duration::from_millis(DEFAULT_HTTP_MIN_INTERVAL_MS)
}

/// Default WHOIS pacing as a duration
pub fn whois_min_interval() -> Duration {
    Duration::from_millis(DEFAULT_WHOIS_MIN_INTERVAL_MS)
}

/// Default HTTP timeout as a duration
pub fn http_timeout() -> Duration {
    Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS)
}

/// Default WHOIS timeout as a duration
pub fn whois_timeout() -> Duration {
    Duration::from_millis(DEFAULT_WHOIS_TIMEOUT_MS)
}
