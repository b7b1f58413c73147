//! Benchmark statistics records and their sources.
//!
//! A benchmark run writes one `statistics_YYYY-MM-DD-HH-MM-SS.json` file
//! holding a summary record per concurrency round. Older runs use camelCase
//! keys, newer ones snake_case; both deserialize into [`StatisticsRecord`].

use crate::frontier::{Curve, Point};
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const STATISTICS_PREFIX: &str = "statistics_";
const STATISTICS_TIMESTAMP: &str = "%Y-%m-%d-%H-%M-%S";

/// Errors that can occur while loading statistics
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to read statistics: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse statistics JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to download statistics: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("No statistics_<timestamp>.json file found in {0}")]
    NotFound(PathBuf),

    #[error("Run label is not a numeric rank: {0}")]
    InvalidRank(String),

    #[error("Invalid statistics search pattern: {0}")]
    InvalidPattern(String),
}

/// Summary of one benchmark round at a fixed concurrency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRecord {
    /// Concurrent requests in flight (some producers write it as a string)
    #[serde(deserialize_with = "deserialize_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub fail: u32,
    #[serde(default)]
    pub total: u32,
    /// Inferences per second, as written by older producers
    #[serde(default)]
    pub throughput: Option<f64>,
    #[serde(default, alias = "request_per_second")]
    pub request_per_second: Option<f64>,
    #[serde(
        default,
        alias = "input_tokens_per_second",
        alias = "server_input_tokens_per_second"
    )]
    pub input_tokens_per_second: f64,
    #[serde(
        default,
        alias = "output_tokens_per_second",
        alias = "server_output_tokens_per_second"
    )]
    pub output_tokens_per_second: f64,
    /// Mean request latency seen by the client, in milliseconds
    #[serde(default, alias = "avg_time_client_side")]
    pub avg_time_client_side: f64,
    #[serde(default, alias = "avg_time_server_side")]
    pub avg_time_server_side: f64,
    #[serde(default, alias = "avg_input_tokens")]
    pub avg_input_tokens: f64,
    #[serde(default, alias = "avg_output_tokens")]
    pub avg_output_tokens: f64,
    #[serde(default, alias = "avg_input_len")]
    pub avg_input_len: f64,
    #[serde(default, alias = "avg_output_len")]
    pub avg_output_len: f64,
    #[serde(default, rename = "P99", alias = "p99")]
    pub p99: f64,
    #[serde(default, rename = "P90", alias = "p90")]
    pub p90: f64,
    #[serde(default, rename = "P80", alias = "p80")]
    pub p80: f64,
}

fn deserialize_concurrency<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Concurrency {
        Number(u32),
        Text(String),
    }

    match Concurrency::deserialize(deserializer)? {
        Concurrency::Number(n) => Ok(n),
        Concurrency::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl StatisticsRecord {
    /// Inferences per second, from whichever field the producer wrote
    #[must_use]
    pub fn inferences_per_second(&self) -> f64 {
        self.throughput.or(self.request_per_second).unwrap_or(0.0)
    }

    /// Fraction of successful requests (0 when no requests were sent)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.success) / f64::from(self.total)
    }
}

/// Records of one benchmark configuration under a display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRun {
    pub label: String,
    pub records: Vec<StatisticsRecord>,
}

impl LabeledRun {
    #[must_use]
    pub fn new(label: impl Into<String>, records: Vec<StatisticsRecord>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }

    /// Build a frontier curve: output tokens/s against client-side latency
    #[must_use]
    pub fn to_curve(&self, rank: i64) -> Curve {
        let mut records: Vec<&StatisticsRecord> = self.records.iter().collect();
        records.sort_by_key(|r| r.concurrency);

        let points = records
            .into_iter()
            .map(|r| Point::new(r.output_tokens_per_second, r.avg_time_client_side))
            .collect();

        Curve::new(self.label.clone(), rank, points)
    }
}

/// Numeric rank encoded in a run label such as `"128"`
///
/// # Errors
///
/// Returns `RecordError::InvalidRank` if the label is not an integer.
pub fn rank_of(label: &str) -> Result<i64, RecordError> {
    label
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidRank(label.to_string()))
}

/// Load statistics records from a JSON file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_statistics_file<P: AsRef<Path>>(path: P) -> Result<Vec<StatisticsRecord>, RecordError> {
    let content = std::fs::read_to_string(path)?;
    let records = serde_json::from_str(&content)?;
    Ok(records)
}

/// Find the statistics file written into a run directory.
///
/// Only names of the form `statistics_YYYY-MM-DD-HH-MM-SS.json` count. When
/// several are present the latest timestamp wins.
///
/// # Errors
///
/// Returns `RecordError::NotFound` if the directory holds no such file.
pub fn find_statistics_file<P: AsRef<Path>>(dir: P) -> Result<PathBuf, RecordError> {
    let dir = dir.as_ref();
    let pattern = format!(
        "{}/{STATISTICS_PREFIX}*.json",
        glob::Pattern::escape(&dir.to_string_lossy())
    );

    let paths = glob::glob(&pattern).map_err(|e| RecordError::InvalidPattern(e.to_string()))?;

    paths
        .filter_map(Result::ok)
        .filter_map(|path| statistics_timestamp(&path).map(|ts| (ts, path)))
        .max_by_key(|(ts, _)| *ts)
        .map(|(_, path)| path)
        .ok_or_else(|| RecordError::NotFound(dir.to_path_buf()))
}

fn statistics_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    let stamp = name
        .strip_prefix(STATISTICS_PREFIX)?
        .strip_suffix(".json")?;
    NaiveDateTime::parse_from_str(stamp, STATISTICS_TIMESTAMP).ok()
}

/// Where a run's statistics live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatisticsSource {
    /// Directory containing a `statistics_<timestamp>.json` file
    Local(PathBuf),
    /// URL serving the statistics JSON
    Remote(String),
}

impl StatisticsSource {
    /// Load the records this source points at
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, the download fails or the
    /// payload is not a list of statistics records.
    pub fn load(&self) -> Result<Vec<StatisticsRecord>, RecordError> {
        match self {
            Self::Local(dir) => {
                let path = find_statistics_file(dir)?;
                tracing::debug!(path = %path.display(), "Loading local statistics");
                load_statistics_file(path)
            }
            Self::Remote(url) => {
                tracing::debug!(%url, "Downloading statistics");
                let response = reqwest::blocking::get(url)?.error_for_status()?;
                let body = response.text()?;
                Ok(serde_json::from_str(&body)?)
            }
        }
    }
}
