//! Configuration for collection runs
//!
//! Defaults come from [`timing`]; a TOML file may override them and the
//! command line overrides the file.

pub mod timing;

use crate::error::{CollectorError, Result};
use crate::resolution::SourceKind;
use crate::subnet::PrefixLengths;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output file prefix
pub const DEFAULT_OUTPUT_PREFIX: &str = "ripe_ris_data_full";

/// Pacing, timeout and endpoint settings for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Minimum spacing between two calls to the source
    pub min_interval: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub retries: u8,
    /// Endpoint override (HTTP base URL or `host:port` for whois)
    pub base_url: Option<String>,
}

impl SourceSettings {
    /// Default settings for a source kind
    pub fn for_kind(kind: SourceKind) -> Self {
        let (min_interval, timeout) = if kind.is_whois_style() {
            (timing::whois_min_interval(), timing::whois_timeout())
        } else {
            (timing::http_min_interval(), timing::http_timeout())
        };
        Self {
            min_interval,
            timeout,
            retries: timing::DEFAULT_RETRIES,
            base_url: None,
        }
    }
}

/// Configuration for a collection run
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Prefix lengths used to group addresses into subnets
    pub prefixes: PrefixLengths,
    /// Sources to query, in priority order
    pub sources: Vec<SourceKind>,
    /// Per-source overrides; sources without an entry use defaults
    pub source_settings: HashMap<SourceKind, SourceSettings>,
    /// Resolve private and other special-use subnets locally as unresolved
    pub skip_special_use: bool,
    /// Look up the holder name when the answering source omitted it
    pub enrich_details: bool,
    /// Re-resolve rows without an ASN after the main pass
    pub check_missing: bool,
    /// Resume from the most recent checkpoint if one exists
    pub use_checkpoint: bool,
    /// Directory for reports and checkpoints
    pub output_dir: PathBuf,
    /// File name prefix for reports and checkpoints
    pub output_prefix: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            prefixes: PrefixLengths::default(),
            sources: SourceKind::all().to_vec(),
            source_settings: HashMap::new(),
            skip_special_use: true,
            enrich_details: true,
            check_missing: false,
            use_checkpoint: false,
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

impl CollectorConfig {
    /// Create a new CollectorConfig builder
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::new()
    }

    /// Effective settings for a source
    pub fn settings(&self, kind: SourceKind) -> SourceSettings {
        self.source_settings
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| SourceSettings::for_kind(kind))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.prefixes.ipv4 > 32 {
            return Err(CollectorError::Config(
                "ipv4 prefix must be at most 32".to_string(),
            ));
        }
        if self.prefixes.ipv6 > 128 {
            return Err(CollectorError::Config(
                "ipv6 prefix must be at most 128".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(CollectorError::Config(
                "at least one source must be enabled".to_string(),
            ));
        }
        if self.output_prefix.is_empty() {
            return Err(CollectorError::Config(
                "output prefix must not be empty".to_string(),
            ));
        }
        for kind in &self.sources {
            if self.settings(*kind).timeout.is_zero() {
                return Err(CollectorError::Config(format!(
                    "timeout for {kind} must be greater than 0"
                )));
            }
        }
        Ok(())
    }

    /// Load a configuration from a TOML file on top of the defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a TOML configuration on top of the defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| CollectorError::Config(e.to_string()))?;
        let mut config = Self::default();
        file.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}

/// On-disk shape of the TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    ipv4_prefix: Option<u8>,
    ipv6_prefix: Option<u8>,
    sources: Option<Vec<String>>,
    skip_special_use: Option<bool>,
    enrich_details: Option<bool>,
    output_dir: Option<PathBuf>,
    output_prefix: Option<String>,
    #[serde(default)]
    source: HashMap<String, SourceFileSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceFileSettings {
    min_interval_ms: Option<u64>,
    timeout_ms: Option<u64>,
    retries: Option<u8>,
    base_url: Option<String>,
}

impl ConfigFile {
    fn apply(self, config: &mut CollectorConfig) -> Result<()> {
        if let Some(v) = self.ipv4_prefix {
            config.prefixes.ipv4 = v;
        }
        if let Some(v) = self.ipv6_prefix {
            config.prefixes.ipv6 = v;
        }
        if let Some(names) = self.sources {
            config.sources = names
                .iter()
                .map(|n| n.parse::<SourceKind>())
                .collect::<std::result::Result<_, _>>()
                .map_err(CollectorError::Config)?;
        }
        if let Some(v) = self.skip_special_use {
            config.skip_special_use = v;
        }
        if let Some(v) = self.enrich_details {
            config.enrich_details = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.output_prefix {
            config.output_prefix = v;
        }
        for (name, overrides) in self.source {
            let kind = name.parse::<SourceKind>().map_err(CollectorError::Config)?;
            let mut settings = config.settings(kind);
            if let Some(ms) = overrides.min_interval_ms {
                settings.min_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = overrides.timeout_ms {
                settings.timeout = Duration::from_millis(ms);
            }
            if let Some(r) = overrides.retries {
                settings.retries = r;
            }
            if overrides.base_url.is_some() {
                settings.base_url = overrides.base_url;
            }
            config.source_settings.insert(kind, settings);
        }
        Ok(())
    }
}

/// Builder for CollectorConfig
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: CollectorConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// Set the IPv4 grouping prefix
    pub fn ipv4_prefix(mut self, len: u8) -> Self {
        self.config.prefixes.ipv4 = len;
        self
    }

    /// Set the IPv6 grouping prefix
    pub fn ipv6_prefix(mut self, len: u8) -> Self {
        self.config.prefixes.ipv6 = len;
        self
    }

    /// Set the sources to query, in priority order
    pub fn sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.config.sources = sources;
        self
    }

    /// Override the settings of one source
    pub fn source_settings(mut self, kind: SourceKind, settings: SourceSettings) -> Self {
        self.config.source_settings.insert(kind, settings);
        self
    }

    /// Enable or disable local handling of special-use subnets
    pub fn skip_special_use(mut self, skip: bool) -> Self {
        self.config.skip_special_use = skip;
        self
    }

    /// Enable or disable holder-name enrichment
    pub fn enrich_details(mut self, enrich: bool) -> Self {
        self.config.enrich_details = enrich;
        self
    }

    /// Enable the missing-ASN correction pass
    pub fn check_missing(mut self, enabled: bool) -> Self {
        self.config.check_missing = enabled;
        self
    }

    /// Resume from an existing checkpoint
    pub fn use_checkpoint(mut self, enabled: bool) -> Self {
        self.config.use_checkpoint = enabled;
        self
    }

    /// Set the output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Set the output file prefix
    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CollectorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CollectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
