//! Core resolution types shared by sources, orchestrator and reports

use crate::subnet::Subnet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routing-data sources, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Team Cymru bulk whois (whois.cymru.com:43)
    Cymru,
    /// RIPEstat data API
    Ripe,
    /// LACNIC RDAP
    Lacnic,
    /// APNIC RDAP
    Apnic,
    /// AFRINIC RDAP
    Afrinic,
    /// ARIN RDAP and Whois-RWS
    Arin,
    /// Team Cymru DNS TXT records
    CymruDns,
}

impl SourceKind {
    /// All sources in priority order
    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::Cymru,
            SourceKind::Ripe,
            SourceKind::Lacnic,
            SourceKind::Apnic,
            SourceKind::Afrinic,
            SourceKind::Arin,
            SourceKind::CymruDns,
        ]
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Cymru => "Team Cymru",
            SourceKind::Ripe => "RIPE",
            SourceKind::Lacnic => "LACNIC",
            SourceKind::Apnic => "APNIC",
            SourceKind::Afrinic => "AFRINIC",
            SourceKind::Arin => "ARIN",
            SourceKind::CymruDns => "Team Cymru DNS",
        }
    }

    /// Whether this source speaks a WHOIS-style protocol and needs the slower pacing
    pub fn is_whois_style(&self) -> bool {
        matches!(
            self,
            SourceKind::Cymru | SourceKind::Arin | SourceKind::CymruDns
        )
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "cymru" | "teamcymru" => Ok(SourceKind::Cymru),
            "ripe" => Ok(SourceKind::Ripe),
            "lacnic" => Ok(SourceKind::Lacnic),
            "apnic" => Ok(SourceKind::Apnic),
            "afrinic" => Ok(SourceKind::Afrinic),
            "arin" => Ok(SourceKind::Arin),
            "cymrudns" | "teamcymrudns" => Ok(SourceKind::CymruDns),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// What a source found for one lookup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsnRecord {
    /// Autonomous system number
    pub asn: u32,
    /// Organization / AS holder name
    pub asn_desc: Option<String>,
    /// Two-letter country code
    pub country: Option<String>,
}

impl AsnRecord {
    /// Build a record from the loosely-typed fields sources return
    ///
    /// Returns `None` when the ASN is absent or a placeholder such as `NA`,
    /// which is how sources say they have no data.
    pub fn from_parts(asn: &str, asn_desc: Option<&str>, country: Option<&str>) -> Option<Self> {
        Some(Self {
            asn: parse_asn(asn)?,
            asn_desc: clean_field(asn_desc),
            country: clean_field(country).map(|c| c.to_ascii_uppercase()),
        })
    }
}

/// Parse an ASN in any of the spellings sources use (`268592`, `AS268592`, `as268592`)
pub fn parse_asn(raw: &str) -> Option<u32> {
    let trimmed = raw.trim().trim_matches('"').trim();
    let digits = trimmed
        .strip_prefix("AS")
        .or_else(|| trimmed.strip_prefix("as"))
        .unwrap_or(trimmed);
    // Multi-origin answers come space separated; the first origin wins
    let first = digits.split_whitespace().next()?;
    match first.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(asn) => Some(asn),
    }
}

fn clean_field(value: Option<&str>) -> Option<String> {
    let v = value?.trim().trim_matches('"').trim();
    if v.is_empty() || v.eq_ignore_ascii_case("NA") || v.eq_ignore_ascii_case("N/A") {
        None
    } else {
        Some(v.to_string())
    }
}

/// Outcome of resolving one subnet
///
/// An unresolved subnet keeps `asn` and `source` empty; it is still
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Subnet this result describes
    pub subnet: Subnet,
    /// Autonomous system number
    pub asn: Option<u32>,
    /// Organization / AS holder name
    pub asn_desc: Option<String>,
    /// Two-letter country code
    pub country: Option<String>,
    /// Source that answered
    pub source: Option<SourceKind>,
}

impl ResolutionResult {
    /// A result for a subnet no source could resolve
    pub fn unresolved(subnet: Subnet) -> Self {
        Self {
            subnet,
            asn: None,
            asn_desc: None,
            country: None,
            source: None,
        }
    }

    /// A result from a source's answer
    pub fn found(subnet: Subnet, record: AsnRecord, source: SourceKind) -> Self {
        Self {
            subnet,
            asn: Some(record.asn),
            asn_desc: record.asn_desc,
            country: record.country,
            source: Some(source),
        }
    }

    /// Whether an ASN was found
    pub fn is_resolved(&self) -> bool {
        self.asn.is_some()
    }
}
