//! Per-run metric extraction and throughput convergence.
//!
//! Throughput usually climbs with concurrency and then plateaus. The plateau
//! value is found with a sliding window over the output tokens/s series:
//! - the first window whose max/min spread is within the threshold marks
//!   the start of the plateau;
//! - everything from there on is averaged, minus the extremes.

use crate::records::{LabeledRun, StatisticsRecord};
use serde::{Deserialize, Serialize};

/// Convergence detection settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConvergenceConfig {
    /// Number of consecutive rounds in a window
    #[serde(default = "default_window")]
    pub window: usize,
    /// Maximum relative spread (max/min - 1) of a converged window
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

const fn default_window() -> usize {
    3
}
const fn default_threshold() -> f64 {
    0.05
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            threshold: default_threshold(),
        }
    }
}

impl ConvergenceConfig {
    /// Converged value of `values` under these settings
    #[must_use]
    pub fn converge(&self, values: &[f64]) -> f64 {
        find_convergence_value(values, self.window, self.threshold)
    }
}

/// Find the value a series settles on.
///
/// Scans windows `values[i - window..i]` for `i` in `window..values.len()`.
/// At the first window with `max / min - 1 <= threshold` the tail starting at
/// that window is averaged with every occurrence of its max and min removed.
/// A window whose minimum is not positive never converges.
///
/// Returns the last value if nothing converges, and 0 for an empty series.
#[must_use]
pub fn find_convergence_value(values: &[f64], window: usize, threshold: f64) -> f64 {
    let Some(&last) = values.last() else {
        return 0.0;
    };
    if window == 0 {
        return last;
    }

    for i in window..values.len() {
        let (min, max) = min_max(&values[i - window..i]);
        if min > 0.0 && max / min - 1.0 <= threshold {
            return mean_without_min_max(&values[i - window..]);
        }
    }

    last
}

/// Mean of `values` excluding every value equal to the max or the min.
///
/// Falls back to the plain mean when nothing is left after trimming.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn mean_without_min_max(values: &[f64]) -> f64 {
    let (min, max) = min_max(values);
    let trimmed: Vec<f64> = values
        .iter()
        .copied()
        .filter(|&v| v != min && v != max)
        .collect();

    if trimmed.is_empty() {
        compute_mean(values)
    } else {
        compute_mean(&trimmed)
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[allow(clippy::cast_precision_loss)]
fn compute_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Converged output tokens/s of a run, rounded to three decimals
#[must_use]
pub fn converged_throughput(run: &LabeledRun, config: &ConvergenceConfig) -> f64 {
    let mut records: Vec<&StatisticsRecord> = run.records.iter().collect();
    records.sort_by_key(|r| r.concurrency);

    let series: Vec<f64> = records
        .iter()
        .map(|r| r.output_tokens_per_second)
        .collect();

    (config.converge(&series) * 1000.0).round() / 1000.0
}

/// A metric that can be plotted against concurrency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    InferencesPerSecond,
    InputTokensPerSecond,
    OutputTokensPerSecond,
    SuccessRate,
    TotalRequests,
    AvgLatencyServer,
    AvgLatencyClient,
    P99,
    P90,
    P80,
    AvgInputTokens,
    AvgInputLen,
    AvgOutputTokens,
    AvgOutputLen,
}

impl Metric {
    /// Axis title used in charts
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::InferencesPerSecond => "Inferences/Second",
            Self::InputTokensPerSecond => "Input Tokens/Second",
            Self::OutputTokensPerSecond => "Output Tokens/Second",
            Self::SuccessRate => "Success Rate",
            Self::TotalRequests => "Total Requests",
            Self::AvgLatencyServer => "Avg Latency Server (ms)",
            Self::AvgLatencyClient => "Avg Latency Client (ms)",
            Self::P99 => "p99(ms)",
            Self::P90 => "p90",
            Self::P80 => "p80",
            Self::AvgInputTokens => "avgInputTokens",
            Self::AvgInputLen => "avgInputLen",
            Self::AvgOutputTokens => "avgOutputTokens",
            Self::AvgOutputLen => "avgOutputLen",
        }
    }

    #[must_use]
    pub fn value(self, record: &StatisticsRecord) -> f64 {
        match self {
            Self::InferencesPerSecond => record.inferences_per_second(),
            Self::InputTokensPerSecond => record.input_tokens_per_second,
            Self::OutputTokensPerSecond => record.output_tokens_per_second,
            Self::SuccessRate => record.success_rate(),
            Self::TotalRequests => f64::from(record.total),
            Self::AvgLatencyServer => record.avg_time_server_side,
            Self::AvgLatencyClient => record.avg_time_client_side,
            Self::P99 => record.p99,
            Self::P90 => record.p90,
            Self::P80 => record.p80,
            Self::AvgInputTokens => record.avg_input_tokens,
            Self::AvgInputLen => record.avg_input_len,
            Self::AvgOutputTokens => record.avg_output_tokens,
            Self::AvgOutputLen => record.avg_output_len,
        }
    }

    /// Values of this metric for a run, ordered by concurrency
    #[must_use]
    pub fn series(self, run: &LabeledRun) -> MetricSeries {
        let mut records: Vec<&StatisticsRecord> = run.records.iter().collect();
        records.sort_by_key(|r| r.concurrency);

        MetricSeries {
            metric: self,
            label: run.label.clone(),
            concurrency: records.iter().map(|r| r.concurrency).collect(),
            values: records.iter().map(|r| self.value(r)).collect(),
        }
    }
}

/// One run's values of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub label: String,
    pub concurrency: Vec<u32>,
    pub values: Vec<f64>,
}

/// A group of metrics drawn together as a subplot grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelSet {
    /// Headline throughput and latency (1x3)
    Final,
    /// Latency breakdown (2x3)
    Time,
    /// Throughput and request counts (2x3)
    Token,
    /// Request and response sizes (2x2)
    InOut,
}

impl PanelSet {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::Time => "time",
            Self::Token => "token",
            Self::InOut => "in_out",
        }
    }

    #[must_use]
    pub const fn metrics(self) -> &'static [Metric] {
        match self {
            Self::Final => &[
                Metric::InferencesPerSecond,
                Metric::OutputTokensPerSecond,
                Metric::AvgLatencyClient,
            ],
            Self::Time => &[
                Metric::AvgLatencyServer,
                Metric::AvgLatencyClient,
                Metric::P99,
                Metric::P90,
                Metric::P80,
            ],
            Self::Token => &[
                Metric::InferencesPerSecond,
                Metric::InputTokensPerSecond,
                Metric::OutputTokensPerSecond,
                Metric::SuccessRate,
                Metric::TotalRequests,
            ],
            Self::InOut => &[
                Metric::AvgInputTokens,
                Metric::AvgInputLen,
                Metric::AvgOutputTokens,
                Metric::AvgOutputLen,
            ],
        }
    }

    /// Subplot grid as `(rows, columns)`
    #[must_use]
    pub const fn grid(self) -> (usize, usize) {
        match self {
            Self::Final => (1, 3),
            Self::Time | Self::Token => (2, 3),
            Self::InOut => (2, 2),
        }
    }
}
