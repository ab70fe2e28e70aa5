//! Team Cymru DNS source (`origin.asn.cymru.com` TXT records)

use super::{LookupTarget, RouteSource};
use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::rate_limit::RateLimiter;
use crate::resolution::{AsnRecord, SourceKind};
use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

/// Origin AS lookup over DNS, by sample IPv4 address
///
/// The catch-all at the end of the chain: it answers for any announced
/// address and costs two small DNS queries.
#[derive(Clone, Debug)]
pub struct CymruDnsSource {
    resolver: Arc<TokioResolver>,
    timeout: Duration,
    pacer: Option<Arc<RateLimiter>>,
}

impl CymruDnsSource {
    /// Create the source with a default resolver
    pub fn new(settings: &SourceSettings) -> Self {
        Self::with_resolver(create_default_resolver(), settings.timeout)
    }

    /// Create the source with a specific DNS resolver
    pub fn with_resolver(resolver: Arc<TokioResolver>, timeout: Duration) -> Self {
        Self {
            resolver,
            timeout,
            pacer: None,
        }
    }

    /// Take a slot from `limiter` before the AS-name follow-up query
    pub fn paced_by(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.pacer = Some(limiter);
        self
    }

    async fn txt(&self, name: String) -> Result<Option<String>, SourceError> {
        let query = tokio::time::timeout(self.timeout, self.resolver.txt_lookup(name));
        let lookup = match query.await {
            Err(_) => return Err(SourceError::Transient("DNS query timed out".to_string())),
            Ok(Err(e)) if e.is_no_records_found() || e.is_nx_domain() => return Ok(None),
            Ok(Err(e)) => return Err(SourceError::Transient(e.to_string())),
            Ok(Ok(lookup)) => lookup,
        };
        Ok(lookup.iter().next().map(|record| {
            record
                .iter()
                .map(|data| String::from_utf8_lossy(data))
                .collect::<Vec<_>>()
                .join("")
        }))
    }
}

/// Create a default DNS resolver for Cymru lookups
pub fn create_default_resolver() -> Arc<TokioResolver> {
    Arc::new(
        TokioResolver::builder_with_config(
            ResolverConfig::cloudflare(),
            TokioConnectionProvider::default(),
        )
        .build(),
    )
}

/// Reverse-octet origin query name for an address
pub fn form_dns_query(ip: &Ipv4Addr) -> String {
    let o = ip.octets();
    format!("{}.{}.{}.{}.origin.asn.cymru.com", o[3], o[2], o[1], o[0])
}

/// Parse `ASN | prefix | CC | registry | allocated`, returning ASN and country
pub fn parse_origin_txt(txt: &str) -> Option<(String, Option<String>)> {
    let parts: Vec<&str> = txt.split('|').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }
    let country = Some(parts[2].to_string()).filter(|c| !c.is_empty());
    Some((parts[0].to_string(), country))
}

/// Parse `ASN | CC | registry | allocated | AS name`, returning the name
pub fn parse_as_name_txt(txt: &str) -> Option<String> {
    let parts: Vec<&str> = txt.split('|').map(str::trim).collect();
    parts
        .get(4)
        .filter(|name| !name.is_empty())
        .map(|name| (*name).to_string())
}

#[async_trait]
impl RouteSource for CymruDnsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::CymruDns
    }

    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let IpAddr::V4(ipv4) = target.sample_ip else {
            return Ok(None);
        };

        let Some(txt) = self.txt(form_dns_query(&ipv4)).await? else {
            return Ok(None);
        };
        let Some((asn, country)) = parse_origin_txt(&txt) else {
            return Ok(None);
        };
        // Multi-origin answers list several ASNs; keep the first
        let asn = asn.split_whitespace().next().unwrap_or_default().to_string();

        if let Some(pacer) = &self.pacer {
            pacer.acquire().await;
        }
        // A missing AS name is not worth failing the lookup over
        let name = match self.txt(format!("AS{asn}.asn.cymru.com")).await {
            Ok(Some(as_txt)) => parse_as_name_txt(&as_txt),
            _ => None,
        };

        Ok(AsnRecord::from_parts(&asn, name.as_deref(), country.as_deref()))
    }
}
