//! Second pass over rows that ended up without an ASN

use crate::aggregate::Report;
use crate::orchestrator::Orchestrator;
use crate::sources::LookupTarget;
use crate::subnet::Subnet;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::info;

/// Re-resolve every summary row lacking an ASN and patch the report in place
///
/// Rows that already carry an ASN are never re-queried. `samples` maps
/// each subnet to the address used to query it. Returns the number of
/// rows that gained an ASN.
pub async fn correct_missing(
    orchestrator: &Orchestrator,
    report: &mut Report,
    samples: &HashMap<Subnet, IpAddr>,
) -> usize {
    let missing = report.missing_asn();
    if missing.is_empty() {
        info!("no missing ASN entries found");
        return 0;
    }
    info!(count = missing.len(), "re-resolving subnets without an ASN");

    let mut corrected = 0;
    for subnet in missing {
        let sample_ip = samples.get(&subnet).copied().unwrap_or_else(|| subnet.network());
        let result = orchestrator
            .resolve(&LookupTarget::new(subnet, sample_ip))
            .await;
        if result.is_resolved() {
            report.replace_resolution(&result);
            corrected += 1;
        }
    }
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::rate_limit::RateLimiter;
    use crate::resolution::{ResolutionResult, SourceKind};
    use crate::sources::test_utils::{record, ScriptedSource};
    use crate::sources::{RateLimitedSource, RouteSource};
    use crate::subnet::{IpRecord, PrefixLengths};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Vec<IpRecord>, HashMap<Subnet, IpAddr>) {
        let records: Vec<IpRecord> = ["1 45.164.77.202", "2 8.8.8.8", "3 45.164.88.10"]
            .iter()
            .map(|line| {
                let ip = line.split_whitespace().nth(1).unwrap().parse().unwrap();
                IpRecord::new(*line, ip, PrefixLengths::default()).unwrap()
            })
            .collect();
        let samples = crate::aggregate::distinct_subnets(&records)
            .into_iter()
            .collect();
        (records, samples)
    }

    fn orchestrator(source: &Arc<ScriptedSource>) -> Orchestrator {
        Orchestrator::new(vec![RateLimitedSource::new(
            source.clone() as Arc<dyn RouteSource>,
            RateLimiter::new(Duration::from_millis(300)),
            0,
        )])
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_missing_rows_requeried() {
        let (records, samples) = setup();
        let google = ResolutionResult::found(
            "8.8.0.0/16".parse().unwrap(),
            record(15169, "GOOGLE", "US"),
            SourceKind::Ripe,
        );
        let mut report = aggregate(&records, &HashMap::from([(google.subnet, google)]));

        let source = Arc::new(ScriptedSource::always(
            SourceKind::CymruDns,
            Ok(Some(record(268592, "EXAMPLE", "BR"))),
        ));
        let corrected = correct_missing(&orchestrator(&source), &mut report, &samples).await;

        assert_eq!(corrected, 1);
        assert_eq!(source.call_count(), 1);
        assert_eq!(source.calls.lock().unwrap()[0].0.to_string(), "45.164.0.0/16");

        assert_eq!(report.summary[0].asn, Some(268592));
        assert_eq!(report.summary[0].source, Some(SourceKind::CymruDns));
        // The already-resolved row keeps its original source
        assert_eq!(report.summary[1].asn, Some(15169));
        assert_eq!(report.summary[1].source, Some(SourceKind::Ripe));
        assert_eq!(report.detail[2].asn, Some(268592));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent() {
        let (records, samples) = setup();
        let mut report = aggregate(&records, &HashMap::new());
        let source = Arc::new(ScriptedSource::always(
            SourceKind::Cymru,
            Ok(Some(record(268592, "EXAMPLE", "BR"))),
        ));
        let orch = orchestrator(&source);

        correct_missing(&orch, &mut report, &samples).await;
        let after_first = report.clone();
        let calls_after_first = source.call_count();

        let corrected = correct_missing(&orch, &mut report, &samples).await;
        assert_eq!(corrected, 0);
        assert_eq!(report, after_first);
        assert_eq!(source.call_count(), calls_after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_unresolved_rows_unchanged() {
        let (records, samples) = setup();
        let mut report = aggregate(&records, &HashMap::new());
        let before = report.clone();
        let source = Arc::new(ScriptedSource::always(SourceKind::Cymru, Ok(None)));

        let corrected = correct_missing(&orchestrator(&source), &mut report, &samples).await;
        assert_eq!(corrected, 0);
        assert_eq!(report, before);
    }
}
