//! ARIN source: RDAP first, Whois-RWS as the second endpoint

use super::http::{client, get_json};
use super::rdap::parse_rdap_network;
use super::{LookupTarget, RouteSource};
use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::rate_limit::RateLimiter;
use crate::resolution::{AsnRecord, SourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Default ARIN RDAP endpoint
pub const ARIN_RDAP_URL: &str = "https://rdap.arin.net/registry/ip/";
/// Default ARIN Whois-RWS endpoint
pub const ARIN_WHOIS_RWS_URL: &str = "https://whois.arin.net/rest/ip/";

/// ARIN lookup by sample address
///
/// Also the catch-all of the RIR chain: ARIN's RDAP service redirects
/// queries for space it does not administer to the responsible registry.
#[derive(Debug, Clone)]
pub struct ArinSource {
    client: reqwest::Client,
    rdap_url: String,
    rws_url: String,
    pacer: Option<Arc<RateLimiter>>,
}

impl ArinSource {
    /// Create the source; a `base_url` override serves both endpoints
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        let (rdap_url, rws_url) = match &settings.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                (format!("{base}/registry/ip/"), format!("{base}/rest/ip/"))
            }
            None => (ARIN_RDAP_URL.to_string(), ARIN_WHOIS_RWS_URL.to_string()),
        };
        Ok(Self {
            client: client(settings.timeout)?,
            rdap_url,
            rws_url,
            pacer: None,
        })
    }

    /// Take a slot from `limiter` before the Whois-RWS follow-up
    pub fn paced_by(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.pacer = Some(limiter);
        self
    }

    async fn lookup_rdap(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let url = format!("{}{}", self.rdap_url, target.sample_ip);
        Ok(get_json(&self.client, &url)
            .await?
            .as_ref()
            .and_then(parse_rdap_network))
    }

    async fn lookup_rws(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        if let Some(pacer) = &self.pacer {
            pacer.acquire().await;
        }
        let url = format!("{}{}", self.rws_url, target.sample_ip);
        Ok(get_json(&self.client, &url)
            .await?
            .as_ref()
            .and_then(parse_whois_rws))
    }
}

#[async_trait]
impl RouteSource for ArinSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Arin
    }

    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let rdap = self.lookup_rdap(target).await;
        if let Ok(Some(found)) = rdap {
            return Ok(Some(found));
        }
        if let Err(e) = &rdap {
            debug!(subnet = %target.subnet, "ARIN RDAP failed, trying Whois-RWS: {e}");
        }
        match (rdap, self.lookup_rws(target).await) {
            (_, Ok(Some(found))) => Ok(Some(found)),
            (Err(e), Ok(None)) => Err(e),
            (_, rws) => rws,
        }
    }
}

/// Whois-RWS renders XML text nodes as `{"$": "..."}`
fn text_node(value: &Value) -> Option<&str> {
    value
        .get("$")
        .and_then(Value::as_str)
        .or_else(|| value.as_str())
}

/// Extract origin AS and holder from a Whois-RWS `net` document
pub fn parse_whois_rws(payload: &Value) -> Option<AsnRecord> {
    let net = payload.get("net")?;
    let origin = net.pointer("/originASes/originAS")?;
    // A single origin is an object, several are an array
    let asn = match origin {
        Value::Array(list) => list.iter().find_map(text_node),
        other => text_node(other),
    }?;
    let holder = net
        .pointer("/orgRef/@name")
        .and_then(Value::as_str)
        .or_else(|| net.get("name").and_then(text_node));
    AsnRecord::from_parts(asn, holder, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn target() -> LookupTarget {
        LookupTarget::new("8.8.0.0/16".parse().unwrap(), "8.8.8.8".parse().unwrap())
    }

    fn settings(base: String) -> SourceSettings {
        SourceSettings {
            base_url: Some(base),
            ..SourceSettings::for_kind(SourceKind::Arin)
        }
    }

    #[test]
    fn test_parse_whois_rws_single_origin() {
        let payload = json!({
            "net": {
                "name": {"$": "GOGL"},
                "orgRef": {"@name": "Google LLC", "@handle": "GOGL"},
                "originASes": {"originAS": {"$": "AS15169"}}
            }
        });
        let rec = parse_whois_rws(&payload).unwrap();
        assert_eq!(rec.asn, 15169);
        assert_eq!(rec.asn_desc.as_deref(), Some("Google LLC"));
    }

    #[test]
    fn test_parse_whois_rws_multiple_origins() {
        let payload = json!({
            "net": {
                "name": {"$": "EXAMPLE-NET"},
                "originASes": {"originAS": [{"$": "AS64500"}, {"$": "AS64501"}]}
            }
        });
        let rec = parse_whois_rws(&payload).unwrap();
        assert_eq!(rec.asn, 64500);
        assert_eq!(rec.asn_desc.as_deref(), Some("EXAMPLE-NET"));
    }

    #[test]
    fn test_parse_whois_rws_without_origin() {
        let payload = json!({"net": {"name": {"$": "LEGACY"}}});
        assert!(parse_whois_rws(&payload).is_none());
    }

    #[tokio::test]
    async fn test_rdap_answer_skips_rws() {
        let server = MockServer::start();
        let rdap = server.mock(|when, then| {
            when.method(GET).path("/registry/ip/8.8.8.8");
            then.status(200).json_body(json!({
                "name": "GOGL",
                "arin_originas0_originautnums": [15169]
            }));
        });
        let rws = server.mock(|when, then| {
            when.method(GET).path("/rest/ip/8.8.8.8");
            then.status(500);
        });

        let source = ArinSource::new(&settings(server.base_url())).unwrap();
        let rec = source.lookup(&target()).await.unwrap().unwrap();
        assert_eq!(rec.asn, 15169);
        rdap.assert();
        rws.assert_hits(0);
    }

    #[tokio::test]
    async fn test_falls_back_to_rws() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/registry/ip/8.8.8.8");
            then.status(404);
        });
        let rws = server.mock(|when, then| {
            when.method(GET).path("/rest/ip/8.8.8.8");
            then.status(200).json_body(json!({
                "net": {"name": {"$": "GOGL"}, "originASes": {"originAS": {"$": "AS15169"}}}
            }));
        });

        let source = ArinSource::new(&settings(server.base_url())).unwrap();
        let rec = source.lookup(&target()).await.unwrap().unwrap();
        rws.assert();
        assert_eq!(rec.asn, 15169);
    }

    #[tokio::test]
    async fn test_rws_follow_up_is_paced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/registry/ip/8.8.8.8");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/ip/8.8.8.8");
            then.status(200).json_body(json!({
                "net": {"name": {"$": "GOGL"}, "originASes": {"originAS": {"$": "AS15169"}}}
            }));
        });

        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(250)));
        let source = ArinSource::new(&settings(server.base_url()))
            .unwrap()
            .paced_by(Arc::clone(&limiter));
        let start = std::time::Instant::now();
        // The caller's slot for the RDAP request
        limiter.acquire().await;
        let rec = source.lookup(&target()).await.unwrap().unwrap();
        assert_eq!(rec.asn, 15169);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_rdap_error_surfaces_when_rws_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/registry/ip/8.8.8.8");
            then.status(503);
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/ip/8.8.8.8");
            then.status(404);
        });

        let source = ArinSource::new(&settings(server.base_url())).unwrap();
        let err = source.lookup(&target()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
