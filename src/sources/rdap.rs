//! RDAP sources for LACNIC, APNIC and AFRINIC
//!
//! RDAP `ip` objects rarely carry the origin AS directly. The parser looks
//! in the places registries actually put it: ARIN's
//! `arin_originas0_originautnums` extension, an `originAutnums` array, and
//! finally entities whose handle is an AS number.

use super::http::{as_text, client, get_json};
use super::{LookupTarget, RouteSource};
use crate::config::SourceSettings;
use crate::error::SourceError;
use crate::resolution::{parse_asn, AsnRecord, SourceKind};
use async_trait::async_trait;
use serde_json::Value;

/// Default RDAP `ip` endpoint for a registry
pub fn default_base_url(kind: SourceKind) -> Option<&'static str> {
    match kind {
        SourceKind::Lacnic => Some("https://rdap.lacnic.net/rdap/ip/"),
        SourceKind::Apnic => Some("https://rdap.apnic.net/rdap/ip/"),
        SourceKind::Afrinic => Some("https://rdap.afrinic.net/rdap/ip/"),
        SourceKind::Arin => Some("https://rdap.arin.net/registry/ip/"),
        _ => None,
    }
}

/// RDAP lookup against one regional registry
#[derive(Debug, Clone)]
pub struct RdapSource {
    kind: SourceKind,
    client: reqwest::Client,
    base_url: String,
}

impl RdapSource {
    /// Create an RDAP source for `kind`
    pub fn new(kind: SourceKind, settings: &SourceSettings) -> Result<Self, SourceError> {
        let base_url = match (&settings.base_url, default_base_url(kind)) {
            (Some(url), _) => url.clone(),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(SourceError::Fatal(format!("{kind} has no RDAP endpoint")))
            }
        };
        Ok(Self {
            kind,
            client: client(settings.timeout)?,
            base_url,
        })
    }

    fn url(&self, target: &LookupTarget) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{}", target.subnet)
    }
}

#[async_trait]
impl RouteSource for RdapSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn lookup(&self, target: &LookupTarget) -> Result<Option<AsnRecord>, SourceError> {
        Ok(get_json(&self.client, &self.url(target))
            .await?
            .as_ref()
            .and_then(parse_rdap_network))
    }
}

/// Extract origin AS, holder and country from an RDAP `ip network` object
pub fn parse_rdap_network(payload: &Value) -> Option<AsnRecord> {
    let asn = origin_asn(payload)?;
    let holder = registrant_name(payload).or_else(|| {
        payload
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    AsnRecord::from_parts(
        &asn.to_string(),
        holder.as_deref(),
        payload.get("country").and_then(Value::as_str),
    )
}

fn origin_asn(payload: &Value) -> Option<u32> {
    for key in ["arin_originas0_originautnums", "originAutnums"] {
        if let Some(asn) = payload
            .get(key)
            .and_then(Value::as_array)
            .and_then(|list| list.iter().find_map(|v| as_text(v).as_deref().and_then(parse_asn)))
        {
            return Some(asn);
        }
    }
    entities(payload).find_map(|entity| {
        let handle = entity.get("handle").and_then(Value::as_str)?;
        if handle.to_ascii_uppercase().starts_with("AS") {
            parse_asn(handle)
        } else {
            None
        }
    })
}

fn registrant_name(payload: &Value) -> Option<String> {
    entities(payload)
        .find(|entity| {
            entity
                .get("roles")
                .and_then(Value::as_array)
                .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrant")))
        })
        .and_then(vcard_fn)
}

fn entities(payload: &Value) -> impl Iterator<Item = &Value> {
    payload
        .get("entities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// The `fn` (formatted name) property of an entity's jCard
fn vcard_fn(entity: &Value) -> Option<String> {
    entity
        .pointer("/vcardArray/1")?
        .as_array()?
        .iter()
        .find(|prop| prop.get(0).and_then(Value::as_str) == Some("fn"))
        .and_then(|prop| prop.get(3))
        .and_then(Value::as_str)
        .map(str::to_string)
}
