//! Configuration and benchmark result documents.
//!
//! `VisualizerConfig` is loaded from YAML and controls output, reduction and
//! publishing. `PeakResults` and `InlineResults` are the JSON documents a
//! benchmark campaign hands over for reporting.

use crate::frontier::DEFAULT_LATENCY_TOLERANCE;
use crate::metrics::{ConvergenceConfig, PanelSet};
use crate::records::StatisticsSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::Map;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse results JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid token count key: {0}")]
    InvalidTokenKey(String),
}

/// Top-level visualizer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualizerConfig {
    /// Directory receiving charts and reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Relative latency tolerance of the frontier reducer
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    /// Metric groups drawn against concurrency for every input-token group
    #[serde(default = "default_panel_sets")]
    pub panel_sets: Vec<PanelSet>,
    /// Chart width in pixels
    #[serde(default = "default_chart_width")]
    pub chart_width: usize,
    /// Chart height in pixels
    #[serde(default = "default_chart_height")]
    pub chart_height: usize,
    /// Report upload and notification; read from the environment when absent
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("visual_results")
}
const fn default_tolerance() -> f64 {
    DEFAULT_LATENCY_TOLERANCE
}
fn default_panel_sets() -> Vec<PanelSet> {
    vec![PanelSet::Final]
}
const fn default_chart_width() -> usize {
    1600
}
const fn default_chart_height() -> usize {
    800
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            tolerance: default_tolerance(),
            convergence: ConvergenceConfig::default(),
            panel_sets: default_panel_sets(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            publish: None,
        }
    }
}

impl VisualizerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

/// Object store and webhook settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishConfig {
    /// Upload reports and send notifications
    #[serde(default)]
    pub enabled: bool,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lifetime of the presigned report link
    #[serde(default = "default_url_expiry_secs")]
    pub url_expiry_secs: u64,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_key_prefix() -> String {
    "perf_analyzer/report".to_string()
}
const fn default_url_expiry_secs() -> u64 {
    24 * 3600
}

impl PublishConfig {
    /// Build publish settings from environment-style variables.
    ///
    /// Reads `REGION`, `SECRET_ID`, `SECRET_KEY`, `BUCKET`, `WEBHOOK_URL` and
    /// `SAVE2COS` through `lookup`. Publishing is enabled only when `SAVE2COS`
    /// is one of `true`, `1`, `t`, `y`, `yes` (any case).
    #[must_use]
    pub fn from_env_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = lookup("SAVE2COS").is_some_and(|v| parse_flag(&v));

        Self {
            enabled,
            region: lookup("REGION").unwrap_or_default(),
            access_key: lookup("SECRET_ID").unwrap_or_default(),
            secret_key: lookup("SECRET_KEY").unwrap_or_default(),
            bucket: lookup("BUCKET").unwrap_or_default(),
            endpoint: lookup("ENDPOINT").filter(|s| !s.is_empty()),
            key_prefix: default_key_prefix(),
            url_expiry_secs: default_url_expiry_secs(),
            webhook_url: lookup("WEBHOOK_URL").filter(|s| !s.is_empty()),
        }
    }

    /// Check the fields an upload needs
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` naming the first empty field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("region", &self.region),
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
            ("bucket", &self.bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(name.to_string()));
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "t" | "y" | "yes"
    )
}

/// Where a campaign stored its statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    /// Run directories on the local filesystem
    #[default]
    Local,
    /// Download URLs on an object store
    #[serde(alias = "cos")]
    Remote,
}

/// Campaign metadata shared by both result documents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CampaignConfig {
    /// Recipient mentioned in notifications
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub save: SaveMode,
    /// Remaining settings in source order, shown in the report's
    /// configuration table
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CampaignConfig {
    /// Every setting as display rows, `user` and `save` included
    #[must_use]
    pub fn rows(&self) -> Vec<(String, String)> {
        let save = match self.save {
            SaveMode::Local => "local",
            SaveMode::Remote => "cos",
        };
        let mut rows = vec![
            ("user".to_string(), self.user.clone()),
            ("save".to_string(), save.to_string()),
        ];
        rows.extend(self.extra.iter().map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        }));
        rows
    }
}

/// One output-token configuration of a peak campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeakEntry {
    /// Statistics location: a download URL, or a run directory in local mode
    pub cos_url: String,
    #[serde(default)]
    pub cos_path: Option<String>,
    /// Converged throughput, filled in during processing
    #[serde(default)]
    pub throughput: Option<f64>,
}

impl PeakEntry {
    #[must_use]
    pub fn source(&self, mode: SaveMode) -> StatisticsSource {
        match mode {
            SaveMode::Local => StatisticsSource::Local(PathBuf::from(&self.cos_url)),
            SaveMode::Remote => StatisticsSource::Remote(self.cos_url.clone()),
        }
    }
}

/// Peak throughput campaign: input tokens -> output tokens -> entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeakResults {
    #[serde(default)]
    pub config: CampaignConfig,
    pub data: BTreeMap<String, BTreeMap<String, PeakEntry>>,
}

/// Entries of one input-token group, ascending by output tokens
pub type PeakGroup<'a> = Vec<(u64, &'a PeakEntry)>;

impl PeakResults {
    /// Load peak results from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Groups in ascending numeric order of input tokens, each with its
    /// entries in ascending numeric order of output tokens.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTokenKey` for a non-numeric key.
    pub fn sorted_groups(&self) -> Result<Vec<(u64, PeakGroup<'_>)>, ConfigError> {
        let mut groups = self
            .data
            .iter()
            .map(|(input, outputs)| {
                let mut entries = outputs
                    .iter()
                    .map(|(output, entry)| Ok((parse_token_key(output)?, entry)))
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                entries.sort_by_key(|(output, _)| *output);
                Ok((parse_token_key(input)?, entries))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        groups.sort_by_key(|(input, _)| *input);
        Ok(groups)
    }
}

fn parse_token_key(key: &str) -> Result<u64, ConfigError> {
    key.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidTokenKey(key.to_string()))
}

/// Throughput measured under a request time limit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineEntry {
    pub timeout_seconds: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub output_tokens_per_seconds: f64,
    pub input_tokens_per_seconds: f64,
    pub request_per_seconds: f64,
}

/// Time-limited throughput campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InlineResults {
    #[serde(default)]
    pub config: CampaignConfig,
    pub data: Vec<InlineEntry>,
}

impl InlineResults {
    /// Load inline results from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Entries ordered by (timeout, input tokens, output tokens)
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<InlineEntry> {
        let mut entries = self.data.clone();
        entries.sort_by_key(|e| (e.timeout_seconds, e.input_tokens, e.output_tokens));
        entries
    }
}
