//! Team Cymru bulk whois source
//!
//! Speaks the netcat-style bulk interface on `whois.cymru.com:43`:
//!
//! ```text
//! begin
//! verbose
//! 45.164.77.202
//! end
//! ```
//!
//! Each answer line is `AS | IP | BGP Prefix | CC | Registry | Allocated | AS Name`.

use super::{LookupTarget, RouteSource};
use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::resolution::{AsnRecord, SourceKind};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default bulk whois server
pub const CYMRU_WHOIS_ADDR: &str = "whois.cymru.com:43";

/// Responses larger than this are not a single-address answer
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

/// Team Cymru bulk whois lookup by sample address
#[derive(Debug, Clone)]
pub struct CymruWhoisSource {
    server: String,
    timeout: Duration,
}

impl CymruWhoisSource {
    /// Create the source; `base_url` overrides the `host:port` to dial
    pub fn new(settings: &SourceSettings) -> Self {
        Self {
            server: settings
                .base_url
                .clone()
                .unwrap_or_else(|| CYMRU_WHOIS_ADDR.to_string()),
            timeout: settings.timeout,
        }
    }

    async fn query(&self, request: &str) -> Result<String, SourceError> {
        let mut stream = TcpStream::connect(self.server.as_str())
            .await
            .map_err(|e| SourceError::Transient(format!("connect {}: {e}", self.server)))?;
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| SourceError::Transient(format!("write: {e}")))?;

        let mut response = Vec::new();
        stream
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut response)
            .await
            .map_err(|e| SourceError::Transient(format!("read: {e}")))?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

/// Format a bulk request for one address
pub fn form_bulk_request(target: &LookupTarget) -> String {
    format!("begin\nverbose\n{}\nend\n", target.sample_ip)
}

/// Parse the first data line of a verbose bulk response
///
/// The banner, the column header and `NA` rows all yield nothing.
pub fn parse_bulk_response(response: &str) -> Option<AsnRecord> {
    response
        .lines()
        .filter(|line| line.contains('|') && !line.starts_with("Bulk"))
        .find_map(|line| {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() < 7 {
                return None;
            }
            AsnRecord::from_parts(parts[0], Some(parts[6]), Some(parts[3]))
        })
}

#[async_trait]
impl RouteSource for CymruWhoisSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Cymru
    }

    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let request = form_bulk_request(target);
        let response = tokio::time::timeout(self.timeout, self.query(&request))
            .await
            .map_err(|_| SourceError::Transient(format!("{} timed out", self.server)))??;

        if response.trim_start().starts_with("Error") {
            return Err(SourceError::Fatal(response.trim().to_string()));
        }
        Ok(parse_bulk_response(&response))
    }
}
