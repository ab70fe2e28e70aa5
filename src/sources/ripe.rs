//! RIPEstat data API source

use super::http::{as_text, client, get_json, pointer_str};
use super::{LookupTarget, RouteSource};
use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::resolution::{AsnRecord, SourceKind};
use async_trait::async_trait;
use serde_json::Value;

/// Default RIPEstat endpoint
pub const RIPESTAT_BASE_URL: &str = "https://stat.ripe.net/data";

/// Looks up announced origins via RIPEstat `prefix-overview`
///
/// RIPEstat sees the global routing table through RIS, so it answers for
/// prefixes from every region, not just the RIPE service area.
#[derive(Debug, Clone)]
pub struct RipeStatSource {
    client: reqwest::Client,
    base_url: String,
}

impl RipeStatSource {
    /// Create the source from its settings
    pub fn new(settings: &SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: client(settings.timeout)?,
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| RIPESTAT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn prefix_overview_url(&self, target: &LookupTarget) -> String {
        format!(
            "{}/prefix-overview/data.json?resource={}",
            self.base_url, target.subnet
        )
    }

    fn as_overview_url(&self, asn: u32) -> String {
        format!("{}/as-overview/data.json?resource=AS{asn}", self.base_url)
    }
}

/// Extract the first origin from a `prefix-overview` payload
pub(crate) fn parse_prefix_overview(payload: &Value) -> Option<AsnRecord> {
    let first = payload.pointer("/data/asns/0")?;
    let asn = as_text(first.get("asn")?)?;
    AsnRecord::from_parts(&asn, first.get("holder").and_then(Value::as_str), None)
}

#[async_trait]
impl RouteSource for RipeStatSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Ripe
    }

    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        let url = self.prefix_overview_url(target);
        Ok(get_json(&self.client, &url)
            .await?
            .as_ref()
            .and_then(parse_prefix_overview))
    }

    async fn describe_asn(&self, asn: u32) -> Result<Option<String>, SourceError> {
        let url = self.as_overview_url(asn);
        Ok(get_json(&self.client, &url).await?.and_then(|payload| {
            AsnRecord::from_parts(&asn.to_string(), pointer_str(&payload, "/data/holder"), None)
                .and_then(|r| r.asn_desc)
        }))
    }
}
