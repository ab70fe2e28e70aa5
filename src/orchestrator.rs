//! Ordered multi-source resolution for one subnet at a time

use crate::config::CollectorConfig;
use crate::error::{CollectorError, SourceError};
use crate::resolution::{ResolutionResult, SourceKind};
use crate::sources::{build_sources, LookupTarget, RateLimitedSource};
use crate::subnet::Subnet;
use ipnet::IpNet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static SPECIAL_USE_BLOCKS: LazyLock<Vec<(IpNet, &'static str)>> = LazyLock::new(|| {
    [
        ("127.0.0.0/8", "Loopback"),
        ("10.0.0.0/8", "Private Network"),
        ("172.16.0.0/12", "Private Network"),
        ("192.168.0.0/16", "Private Network"),
        ("100.64.0.0/10", "Carrier Grade NAT"),
        ("0.0.0.0/8", "Special Use"),
        ("169.254.0.0/16", "Special Use"),
        ("192.0.2.0/24", "Special Use"),
        ("198.51.100.0/24", "Special Use"),
        ("203.0.113.0/24", "Special Use"),
        ("224.0.0.0/4", "Special Use"),
        ("255.255.255.255/32", "Special Use"),
        ("::1/128", "Loopback"),
        ("fc00::/7", "Private Network"),
        ("::/128", "Special Use"),
        ("fe80::/10", "Special Use"),
        ("ff00::/8", "Special Use"),
        ("2001:db8::/32", "Special Use"),
    ]
    .into_iter()
    .map(|(block, label)| (block.parse::<IpNet>().expect("static block is valid"), label))
    .collect()
});

/// Label for subnets no routing source can know about
///
/// Only a subnet lying entirely inside a special-use block gets a label;
/// a subnet that merely overlaps one (203.0.0.0/16 around 203.0.113.0/24)
/// is routable and returns `None`.
pub fn special_use_label(subnet: &Subnet) -> Option<&'static str> {
    let net = subnet.net();
    SPECIAL_USE_BLOCKS
        .iter()
        .find(|(block, _)| block.contains(&net))
        .map(|(_, label)| *label)
}

/// Tries sources in priority order until one returns an ASN
///
/// The first source with an answer wins; later sources are never asked
/// and answers are not reconciled across sources.
pub struct Orchestrator {
    sources: Vec<RateLimitedSource>,
    skip_special_use: bool,
    enrich_details: bool,
}

impl Orchestrator {
    /// Create an orchestrator over sources in priority order
    pub fn new(sources: Vec<RateLimitedSource>) -> Self {
        Self {
            sources,
            skip_special_use: true,
            enrich_details: true,
        }
    }

    /// Create an orchestrator with the configured sources
    pub fn from_config(config: &CollectorConfig) -> Result<Self, CollectorError> {
        let sources =
            build_sources(config).map_err(|e| CollectorError::Config(e.to_string()))?;
        Ok(Self::new(sources)
            .skip_special_use(config.skip_special_use)
            .enrich_details(config.enrich_details))
    }

    /// Resolve special-use subnets locally instead of querying sources
    pub fn skip_special_use(mut self, skip: bool) -> Self {
        self.skip_special_use = skip;
        self
    }

    /// Ask RIPEstat for a holder name when the winning source had none
    pub fn enrich_details(mut self, enrich: bool) -> Self {
        self.enrich_details = enrich;
        self
    }

    /// Resolve one subnet; never fails
    ///
    /// Unresolved, transient and fatal outcomes all move on to the next
    /// source. When every source is exhausted the result is unresolved.
    pub async fn resolve(&self, target: &LookupTarget) -> ResolutionResult {
        if self.skip_special_use {
            if let Some(label) = special_use_label(&target.subnet) {
                debug!(subnet = %target.subnet, label, "special-use subnet, not querying sources");
                let mut result = ResolutionResult::unresolved(target.subnet);
                result.asn_desc = Some(label.to_string());
                return result;
            }
        }

        for source in &self.sources {
            let kind = source.kind();
            debug!(source = %kind, subnet = %target.subnet, "querying source");
            match source.resolve(target).await {
                Ok(Some(record)) => {
                    info!(source = %kind, subnet = %target.subnet, asn = record.asn, "resolved");
                    let mut result = ResolutionResult::found(target.subnet, record, kind);
                    self.enrich(&mut result).await;
                    return result;
                }
                Ok(None) => {
                    debug!(source = %kind, subnet = %target.subnet, "no data");
                }
                Err(e @ SourceError::Transient(_)) => {
                    debug!(source = %kind, subnet = %target.subnet, "giving up on source: {e}");
                }
                Err(e @ SourceError::Fatal(_)) => {
                    warn!(source = %kind, subnet = %target.subnet, "{e}");
                }
            }
        }

        info!(subnet = %target.subnet, "no source could resolve subnet");
        ResolutionResult::unresolved(target.subnet)
    }

    async fn enrich(&self, result: &mut ResolutionResult) {
        if !self.enrich_details || result.asn_desc.is_some() {
            return;
        }
        let (Some(asn), Some(ripe)) = (
            result.asn,
            self.sources.iter().find(|s| s.kind() == SourceKind::Ripe),
        ) else {
            return;
        };
        match ripe.describe_asn(asn).await {
            Ok(holder) => result.asn_desc = holder,
            Err(e) => debug!(asn, "holder lookup failed: {e}"),
        }
    }
}
