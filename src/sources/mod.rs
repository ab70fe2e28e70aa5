//! Routing-data source adapters
//!
//! Each upstream (Team Cymru, RIPEstat, the RIR RDAP services, ARIN
//! Whois-RWS) implements [`RouteSource`]. The orchestrator never calls a
//! source directly: it goes through [`RateLimitedSource`], which owns the
//! source's pacing gate and transient-retry budget. Sources that send a
//! follow-up request within one lookup (ARIN, Cymru DNS) share that gate
//! and take a second slot before the follow-up.

pub mod arin;
pub mod cymru;
pub mod cymru_dns;
mod http;
pub mod rdap;
pub mod ripe;

use crate::config::CollectorConfig;
use crate::error::SourceError;
use crate::rate_limit::RateLimiter;
use crate::resolution::{AsnRecord, SourceKind};
use crate::subnet::Subnet;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

pub use arin::ArinSource;
pub use cymru::CymruWhoisSource;
pub use cymru_dns::CymruDnsSource;
pub use rdap::RdapSource;
pub use ripe::RipeStatSource;

/// What a source is asked about
///
/// Sources that query by prefix use `subnet`; sources that only answer
/// for single addresses use `sample_ip`, the first input address seen in
/// the subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTarget {
    /// Subnet being resolved
    pub subnet: Subnet,
    /// Representative address inside the subnet
    pub sample_ip: IpAddr,
}

impl LookupTarget {
    /// Create a target
    pub fn new(subnet: Subnet, sample_ip: IpAddr) -> Self {
        Self { subnet, sample_ip }
    }
}

/// One upstream routing-data source
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Which source this is
    fn kind(&self) -> SourceKind;

    /// Look up the origin AS for a target
    ///
    /// `Ok(None)` means the source has no usable record.
    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError>;

    /// Look up the holder name of an AS, for sources that can
    async fn describe_asn(&self, _asn: u32) -> Result<Option<String>, SourceError> {
        Ok(None)
    }
}

/// A source paired with its rate limiter and retry budget
pub struct RateLimitedSource {
    source: Arc<dyn RouteSource>,
    limiter: Arc<RateLimiter>,
    retries: u8,
}

impl RateLimitedSource {
    /// Wrap a source
    pub fn new(source: Arc<dyn RouteSource>, limiter: RateLimiter, retries: u8) -> Self {
        Self::with_limiter(source, Arc::new(limiter), retries)
    }

    /// Wrap a source with a limiter the source itself may also hold
    pub fn with_limiter(
        source: Arc<dyn RouteSource>,
        limiter: Arc<RateLimiter>,
        retries: u8,
    ) -> Self {
        Self {
            source,
            limiter,
            retries,
        }
    }

    /// Which source this wraps
    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// The source's rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Resolve through the limiter, retrying transient failures
    ///
    /// Every attempt takes one limiter slot. Fatal errors are returned
    /// immediately; transient ones only once the budget is spent.
    pub async fn resolve(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let mut attempt = 0u8;
        loop {
            self.limiter.acquire().await;
            match self.source.lookup(target).await {
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    debug!(
                        source = %self.kind(),
                        subnet = %target.subnet,
                        attempt,
                        "retrying after transient failure: {e}"
                    );
                }
                other => return other,
            }
        }
    }

    /// Ask the source for an AS holder name, through the same limiter
    pub async fn describe_asn(&self, asn: u32) -> Result<Option<String>, SourceError> {
        self.limiter.acquire().await;
        self.source.describe_asn(asn).await
    }
}

/// Construct the configured sources, in priority order
pub fn build_sources(config: &CollectorConfig) -> Result<Vec<RateLimitedSource>, SourceError> {
    let mut out = Vec::with_capacity(config.sources.len());
    for &kind in &config.sources {
        let settings = config.settings(kind);
        let limiter = Arc::new(RateLimiter::new(settings.min_interval));
        let source: Arc<dyn RouteSource> = match kind {
            SourceKind::Cymru => Arc::new(CymruWhoisSource::new(&settings)),
            SourceKind::Ripe => Arc::new(RipeStatSource::new(&settings)?),
            SourceKind::Lacnic | SourceKind::Apnic | SourceKind::Afrinic => {
                Arc::new(RdapSource::new(kind, &settings)?)
            }
            SourceKind::Arin => {
                Arc::new(ArinSource::new(&settings)?.paced_by(Arc::clone(&limiter)))
            }
            SourceKind::CymruDns => {
                Arc::new(CymruDnsSource::new(&settings).paced_by(Arc::clone(&limiter)))
            }
        };
        out.push(RateLimitedSource::with_limiter(
            source,
            limiter,
            settings.retries,
        ));
    }
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use std::time::Duration;

    fn target() -> LookupTarget {
        LookupTarget::new(
            "45.164.0.0/16".parse().unwrap(),
            "45.164.77.202".parse().unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_once_on_transient() {
        let source = Arc::new(ScriptedSource::scripted(
            SourceKind::Ripe,
            vec![Err(SourceError::Transient("timeout".into()))],
            Ok(Some(record(268592, "EXAMPLE", "BR"))),
        ));
        let wrapped = RateLimitedSource::new(
            source.clone(),
            RateLimiter::new(Duration::from_millis(300)),
            1,
        );
        let result = wrapped.resolve(&target()).await.unwrap();
        assert_eq!(result.unwrap().asn, 268592);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let source = Arc::new(ScriptedSource::always(
            SourceKind::Ripe,
            Err(SourceError::Transient("503".into())),
        ));
        let wrapped = RateLimitedSource::new(
            source.clone(),
            RateLimiter::new(Duration::from_millis(300)),
            1,
        );
        let err = wrapped.resolve(&target()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_not_retried() {
        let source = Arc::new(ScriptedSource::always(
            SourceKind::Lacnic,
            Err(SourceError::Fatal("400".into())),
        ));
        let wrapped =
            RateLimitedSource::new(source.clone(), RateLimiter::new(Duration::ZERO), 3);
        assert!(wrapped.resolve(&target()).await.is_err());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_respect_interval() {
        let source = Arc::new(ScriptedSource::always(
            SourceKind::Cymru,
            Err(SourceError::Transient("reset".into())),
        ));
        let wrapped = RateLimitedSource::new(
            source.clone(),
            RateLimiter::new(Duration::from_secs(1)),
            2,
        );
        let _ = wrapped.resolve(&target()).await;
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(1));
        }
    }

    #[test]
    fn test_build_sources_follows_config_order() {
        let config = CollectorConfig::builder()
            .sources(vec![SourceKind::Arin, SourceKind::Cymru, SourceKind::Apnic])
            .build()
            .unwrap();
        let sources = build_sources(&config).unwrap();
        let kinds: Vec<_> = sources.iter().map(RateLimitedSource::kind).collect();
        assert_eq!(
            kinds,
            vec![SourceKind::Arin, SourceKind::Cymru, SourceKind::Apnic]
        );
        assert_eq!(
            sources[0].limiter().min_interval(),
            Duration::from_millis(1000)
        );
        assert_eq!(
            sources[2].limiter().min_interval(),
            Duration::from_millis(300)
        );
    }
}
