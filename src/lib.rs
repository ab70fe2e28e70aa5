//! asn-collector - batch ASN resolution for lists of IP addresses
//!
//! Addresses are grouped into subnets, each subnet is resolved once
//! against an ordered chain of routing-data sources (Team Cymru, RIPEstat,
//! the RIR RDAP services, ARIN), and the results are written as summary
//! and detail CSV reports. Every source is paced by its own rate limiter,
//! and progress is checkpointed so an interrupted run can be resumed.
//!
//! ```no_run
//! use asn_collector::{collect, read_records_from_file, CollectorConfig};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfig::builder().check_missing(true).build()?;
//! let records = read_records_from_file(Path::new("unique-ips.log"), config.prefixes)?;
//! let outcome = collect(&config, &records, |event| {
//!     println!("[{}/{}] {}", event.index, event.total, event.subnet);
//! })
//! .await?;
//! println!("wrote {}", outcome.paths.summary.display());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod checkpoint;
pub mod collector;
pub mod config;
pub mod corrector;
pub mod error;
pub mod input;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod rate_limit;
pub mod resolution;
pub mod sources;
pub mod subnet;

// Re-export core types for library users
pub use aggregate::{aggregate, DetailRow, Report, SummaryRow};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use collector::{collect, Collector, ProgressEvent, RunOutcome};
pub use config::{CollectorConfig, CollectorConfigBuilder, SourceSettings};
pub use corrector::correct_missing;
pub use error::{CollectorError, SourceError};
pub use input::{extract_ip, read_records, read_records_from_file};
pub use orchestrator::Orchestrator;
pub use output::OutputPaths;
pub use rate_limit::RateLimiter;
pub use resolution::{AsnRecord, ResolutionResult, SourceKind};
pub use sources::{LookupTarget, RateLimitedSource, RouteSource};
pub use subnet::{IpRecord, PrefixLengths, Subnet};
