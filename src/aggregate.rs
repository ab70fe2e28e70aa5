//! Summary and detail rows derived from records and resolutions

use crate::resolution::{ResolutionResult, SourceKind};
use crate::subnet::{IpRecord, Subnet};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One row per distinct subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    /// Subnet
    pub subnet: Subnet,
    /// Autonomous system number
    pub asn: Option<u32>,
    /// Organization / AS holder name
    pub asn_desc: Option<String>,
    /// Two-letter country code
    pub country: Option<String>,
    /// Number of input records in the subnet
    pub count: usize,
    /// Source that answered; not part of the CSV layout
    #[serde(skip)]
    pub source: Option<SourceKind>,
}

/// One row per input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    /// Raw input line
    pub original_line: String,
    /// Subnet of the record's address
    pub subnet: Subnet,
    /// Autonomous system number
    pub asn: Option<u32>,
    /// Organization / AS holder name
    pub asn_desc: Option<String>,
    /// Two-letter country code
    pub country: Option<String>,
}

/// Summary and detail rows of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// One row per subnet, in order of first appearance
    pub summary: Vec<SummaryRow>,
    /// One row per record, in input order
    pub detail: Vec<DetailRow>,
}

impl Report {
    /// Sum of all summary counts
    pub fn total_count(&self) -> usize {
        self.summary.iter().map(|row| row.count).sum()
    }

    /// Subnets whose summary row has no ASN
    pub fn missing_asn(&self) -> Vec<Subnet> {
        self.summary
            .iter()
            .filter(|row| row.asn.is_none())
            .map(|row| row.subnet)
            .collect()
    }

    /// Overwrite the summary row and detail rows of `result.subnet`
    ///
    /// Returns false if the subnet is not part of the report.
    pub fn replace_resolution(&mut self, result: &ResolutionResult) -> bool {
        let Some(row) = self.summary.iter_mut().find(|r| r.subnet == result.subnet) else {
            return false;
        };
        row.asn = result.asn;
        row.asn_desc.clone_from(&result.asn_desc);
        row.country.clone_from(&result.country);
        row.source = result.source;

        for detail in self.detail.iter_mut().filter(|d| d.subnet == result.subnet) {
            detail.asn = result.asn;
            detail.asn_desc.clone_from(&result.asn_desc);
            detail.country.clone_from(&result.country);
        }
        true
    }
}

/// Subnets of `records` in order of first appearance, with a sample address each
pub fn distinct_subnets(records: &[IpRecord]) -> Vec<(Subnet, std::net::IpAddr)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        if seen.insert(record.subnet) {
            out.push((record.subnet, record.ip));
        }
    }
    out
}

/// Build the report for `records` from resolved subnets
///
/// A subnet missing from `results` is reported as unresolved.
pub fn aggregate(records: &[IpRecord], results: &HashMap<Subnet, ResolutionResult>) -> Report {
    let mut counts: HashMap<Subnet, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.subnet).or_default() += 1;
    }

    let resolution_of = |subnet: Subnet| {
        results
            .get(&subnet)
            .cloned()
            .unwrap_or_else(|| ResolutionResult::unresolved(subnet))
    };

    let summary = distinct_subnets(records)
        .into_iter()
        .map(|(subnet, _)| {
            let r = resolution_of(subnet);
            SummaryRow {
                subnet,
                asn: r.asn,
                asn_desc: r.asn_desc,
                country: r.country,
                count: counts.get(&subnet).copied().unwrap_or_default(),
                source: r.source,
            }
        })
        .collect();

    let detail = records
        .iter()
        .map(|record| {
            let r = results.get(&record.subnet);
            DetailRow {
                original_line: record.original_line.clone(),
                subnet: record.subnet,
                asn: r.and_then(|r| r.asn),
                asn_desc: r.and_then(|r| r.asn_desc.clone()),
                country: r.and_then(|r| r.country.clone()),
            }
        })
        .collect();

    Report { summary, detail }
}
