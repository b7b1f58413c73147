//! # perf-visualizer
//!
//! Charts, frontier curves and reports for inference benchmark campaigns.
//!
//! A campaign sweeps concurrency for several (input tokens, output tokens)
//! configurations. For each input-token group the per-configuration
//! throughput/latency curves are reduced to one frontier: the points an
//! operator would pick, with configurations that are beaten by a neighbour
//! at comparable latency removed.
//!
//! ## Architecture
//!
//! ```text
//! peak_results.json / inline_results.json
//!        ↓
//! Statistics records (local run directories | download URLs)
//!        ↓
//! Converged throughput + metrics vs concurrency charts
//!        ↓
//! Frontier reduction per input-token group
//!        ↓
//! Report (HTML, Markdown)
//!        ↓
//! Object store upload + webhook notification
//! ```

pub mod chart;
pub mod config;
pub mod frontier;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod records;
pub mod report;

pub use chart::{ChartError, ChartFile, ChartWriter};
pub use config::{
    CampaignConfig, ConfigError, InlineEntry, InlineResults, PeakEntry, PeakResults,
    PublishConfig, SaveMode, VisualizerConfig,
};
pub use frontier::{
    is_close, ComparisonFault, Curve, CurveOutcome, FrontierCurve, FrontierReducer, Point,
    ReducedCurve, DEFAULT_LATENCY_TOLERANCE,
};
pub use metrics::{
    converged_throughput, find_convergence_value, mean_without_min_max, ConvergenceConfig,
    Metric, MetricSeries, PanelSet,
};
pub use pipeline::{
    merge_runs, process_frontier, process_inline, process_peak, InlineOutcome, PeakOutcome,
    PipelineContext,
};
pub use publish::{Notifier, ObjectStore, PublishError, Publisher, WebhookNotifier};
pub use records::{
    find_statistics_file, load_statistics_file, rank_of, LabeledRun, RecordError,
    StatisticsRecord, StatisticsSource,
};
pub use report::{InlineReport, PeakReport, PeakReportBuilder, ReportFiles};
