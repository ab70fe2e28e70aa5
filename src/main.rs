//! asn-collector - resolve the origin AS of every subnet in an IP list.
//!
//! This is the command-line interface for the asn_collector library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use asn_collector::{
    collect, read_records_from_file, CollectorConfig, CollectorConfigBuilder, ProgressEvent,
    SourceKind,
};
use clap::Parser;
use std::path::PathBuf;

/// Get the version string for asn-collector
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the collector.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Resolve origin ASNs for a list of IP addresses", long_about = None)]
struct Args {
    /// File with one IP address per line, possibly inside other text
    #[clap(short, long, default_value = "unique-ips.log")]
    input: PathBuf,

    /// Prefix for report and checkpoint file names
    #[clap(short = 'o', long)]
    output_prefix: Option<String>,

    /// Directory for reports and checkpoints
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// IPv4 prefix length used to group addresses
    #[clap(long, value_parser = clap::value_parser!(u8).range(0..=32))]
    ipv4_prefix: Option<u8>,

    /// IPv6 prefix length used to group addresses
    #[clap(long, value_parser = clap::value_parser!(u8).range(0..=128))]
    ipv6_prefix: Option<u8>,

    /// TOML file with source settings
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Do not fall back to Team Cymru DNS after the other sources
    #[clap(long)]
    no_dns_fallback: bool,

    /// Re-resolve subnets left without an ASN after the main pass
    #[clap(long)]
    check_missing: bool,

    /// Resume from the most recent checkpoint
    #[clap(long)]
    checkpoint: bool,

    /// Enable debug diagnostics on stderr
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    // Quick check for version before starting async runtime
    let args: Vec<String> = std::env::args().collect();
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-V") {
        println!("asn-collector {}", get_version());
        return;
    }

    let args = Args::parse();
    asn_collector::logging::init_cli_logger(args.verbose);

    // Requests are strictly sequential, a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    if let Err(e) = runtime.block_on(async_main(args)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> Result<CollectorConfig> {
    let base = match &args.config {
        Some(path) => CollectorConfig::from_toml_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => CollectorConfig::default(),
    };

    let mut sources = base.sources.clone();
    if args.no_dns_fallback {
        sources.retain(|kind| *kind != SourceKind::CymruDns);
    }

    let mut builder = CollectorConfigBuilder::from_config(base)
        .sources(sources)
        .check_missing(args.check_missing)
        .use_checkpoint(args.checkpoint);
    if let Some(len) = args.ipv4_prefix {
        builder = builder.ipv4_prefix(len);
    }
    if let Some(len) = args.ipv6_prefix {
        builder = builder.ipv6_prefix(len);
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(prefix) = &args.output_prefix {
        builder = builder.output_prefix(prefix);
    }
    Ok(builder.build()?)
}

fn print_progress(event: &ProgressEvent) {
    let source = event.source.map_or("-", |s| s.name());
    let asn = event
        .asn
        .map_or_else(|| "unresolved".to_string(), |asn| format!("AS{}", asn));
    let desc = event.asn_desc.as_deref().unwrap_or("");
    if event.skipped {
        println!(
            "[{}/{}] {} (checkpoint) {} {}",
            event.index, event.total, event.subnet, asn, desc
        );
    } else {
        println!(
            "[{}/{}] {} via {}: {} {}",
            event.index, event.total, event.subnet, source, asn, desc
        );
    }
}

async fn async_main(args: Args) -> Result<()> {
    let config = build_config(&args)?;

    let records = read_records_from_file(&args.input, config.prefixes)
        .with_context(|| format!("cannot read input {}", args.input.display()))?;
    if records.is_empty() {
        println!("No IP addresses found in {}", args.input.display());
    }

    let outcome = collect(&config, &records, print_progress).await?;

    let report = &outcome.report;
    let missing = report.missing_asn().len();
    println!();
    println!(
        "Resolved {} of {} subnets ({} addresses)",
        report.summary.len() - missing,
        report.summary.len(),
        report.total_count()
    );
    println!("Summary: {}", outcome.paths.summary.display());
    println!("Detail:  {}", outcome.paths.detail.display());
    Ok(())
}
