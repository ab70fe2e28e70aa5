//! Batch driver: resolve every subnet once, checkpointing as it goes

use crate::aggregate::{aggregate, distinct_subnets, Report};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::CollectorConfig;
use crate::corrector::correct_missing;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::output::{write_report, OutputPaths};
use crate::resolution::{ResolutionResult, SourceKind};
use crate::sources::LookupTarget;
use crate::subnet::{IpRecord, Subnet};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::info;

/// Progress notification, one per subnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position of the subnet
    pub index: usize,
    /// Number of distinct subnets in the batch
    pub total: usize,
    /// Subnet handled
    pub subnet: Subnet,
    /// Source that answered, if any
    pub source: Option<SourceKind>,
    /// ASN found, if any
    pub asn: Option<u32>,
    /// Holder name found, if any
    pub asn_desc: Option<String>,
    /// The subnet came from the checkpoint and was not queried
    pub skipped: bool,
}

impl ProgressEvent {
    fn new(index: usize, total: usize, result: &ResolutionResult, skipped: bool) -> Self {
        Self {
            index,
            total,
            subnet: result.subnet,
            source: result.source,
            asn: result.asn,
            asn_desc: result.asn_desc.clone(),
            skipped,
        }
    }
}

/// Resolves a batch of records into a report
pub struct Collector {
    orchestrator: Orchestrator,
    check_missing: bool,
}

impl Collector {
    /// Create a collector around an orchestrator
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            check_missing: false,
        }
    }

    /// Run the missing-ASN correction after the main pass
    pub fn check_missing(mut self, enabled: bool) -> Self {
        self.check_missing = enabled;
        self
    }

    /// Resolve all subnets of `records` not yet in `checkpoint`
    ///
    /// The checkpoint is updated after every subnet and, when `store` is
    /// given, persisted before moving on, so a resumed run only queries
    /// subnets that were not committed. Per-subnet failures never stop the
    /// batch; only a failure to persist the checkpoint does.
    pub async fn run<F>(
        &self,
        records: &[IpRecord],
        checkpoint: &mut Checkpoint,
        store: Option<&CheckpointStore>,
        mut progress: F,
    ) -> Result<Report>
    where
        F: FnMut(&ProgressEvent),
    {
        let subnets = distinct_subnets(records);
        let total = subnets.len();
        info!(
            subnets = total,
            records = records.len(),
            resumed = checkpoint.len(),
            "starting collection"
        );

        for (i, (subnet, sample_ip)) in subnets.iter().enumerate() {
            let index = i + 1;
            if let Some(done) = checkpoint.results.get(subnet) {
                progress(&ProgressEvent::new(index, total, done, true));
                continue;
            }

            let result = self
                .orchestrator
                .resolve(&LookupTarget::new(*subnet, *sample_ip))
                .await;
            let event = ProgressEvent::new(index, total, &result, false);
            checkpoint.record(result);
            if let Some(store) = store {
                store.save(checkpoint)?;
            }
            progress(&event);
        }

        let mut report = aggregate(records, &checkpoint.results_map());
        if self.check_missing {
            let samples: HashMap<Subnet, IpAddr> = subnets.into_iter().collect();
            let corrected = correct_missing(&self.orchestrator, &mut report, &samples).await;
            info!(corrected, "missing-ASN pass complete");
        }
        Ok(report)
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Identifier of the run
    pub run_id: String,
    /// Report files written
    pub paths: OutputPaths,
    /// The report itself
    pub report: Report,
}

/// Current UTC time as a run id
pub fn new_run_id() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Run a full collection: checkpoint selection, resolution, reports, cleanup
///
/// With `use_checkpoint` set, the newest checkpoint in the output
/// directory is resumed and its run id reused, so the reports land in the
/// same files. The checkpoint is removed once both reports are written.
pub async fn collect<F>(
    config: &CollectorConfig,
    records: &[IpRecord],
    progress: F,
) -> Result<RunOutcome>
where
    F: FnMut(&ProgressEvent),
{
    config.validate()?;
    let dir = config.output_dir.as_path();
    let prefix = config.output_prefix.as_str();

    let store = config
        .use_checkpoint
        .then(|| CheckpointStore::find_latest(dir, prefix))
        .flatten()
        .unwrap_or_else(|| CheckpointStore::for_run(dir, prefix, &new_run_id()));
    let mut checkpoint = store.load();
    if !checkpoint.is_empty() {
        info!(
            path = %store.path().display(),
            processed = checkpoint.len(),
            "continuing from checkpoint"
        );
    }

    let collector = Collector::new(Orchestrator::from_config(config)?)
        .check_missing(config.check_missing);
    let report = collector
        .run(records, &mut checkpoint, Some(&store), progress)
        .await?;

    let paths = OutputPaths::for_run(dir, prefix, store.run_id());
    write_report(&paths, &report)?;
    store.discard()?;

    Ok(RunOutcome {
        run_id: store.run_id().to_string(),
        paths,
        report,
    })
}
