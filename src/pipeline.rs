//! End-to-end processing of benchmark campaigns.
//!
//! Loads statistics, computes converged throughput, draws charts, reduces
//! each input-token group to its frontier, writes the report and hands it to
//! the publisher.

use crate::chart::{ChartFile, ChartWriter};
use crate::config::{InlineResults, PeakResults, VisualizerConfig};
use crate::frontier::{FrontierCurve, FrontierReducer};
use crate::metrics::{converged_throughput, PanelSet};
use crate::publish::Publisher;
use crate::records::{rank_of, LabeledRun, RecordError, StatisticsSource};
use crate::report::{
    report_file_stem, write_report, InlineReport, PeakReport, PeakReportBuilder, ReportFiles,
    ThroughputRow,
};
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

/// Title of generated reports
pub const REPORT_TITLE: &str = "Model Performance Report";

/// Settings and collaborators shared by every processing step
pub struct PipelineContext {
    config: VisualizerConfig,
    publisher: Publisher,
}

impl PipelineContext {
    #[must_use]
    pub const fn new(config: VisualizerConfig, publisher: Publisher) -> Self {
        Self { config, publisher }
    }

    #[must_use]
    pub const fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    #[must_use]
    pub const fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    fn chart_writer(&self) -> ChartWriter {
        ChartWriter::new(&self.config.output_dir)
            .with_size(self.config.chart_width, self.config.chart_height)
    }
}

/// Everything a peak campaign produced
#[derive(Debug)]
pub struct PeakOutcome {
    pub report: PeakReport,
    pub files: ReportFiles,
    pub frontiers: Vec<FrontierCurve>,
    /// Download link of the uploaded report
    pub url: Option<String>,
}

/// Everything a time-limited campaign produced
#[derive(Debug)]
pub struct InlineOutcome {
    pub report: InlineReport,
    pub files: ReportFiles,
    pub url: Option<String>,
}

/// Reduce labelled runs to one frontier curve.
///
/// Run labels must be numeric; they give the order in which runs are
/// compared.
///
/// # Errors
///
/// Returns `RecordError::InvalidRank` for a non-numeric label.
pub fn merge_runs(
    runs: &[LabeledRun],
    label: &str,
    tolerance: f64,
) -> Result<FrontierCurve, RecordError> {
    let curves = runs
        .iter()
        .map(|run| {
            let curve = run.to_curve(rank_of(&run.label)?);
            if !curve.is_latency_monotonic() {
                tracing::warn!(
                    run = %run.label,
                    "Latency decreases with concurrency; frontier may be inaccurate"
                );
            }
            Ok(curve)
        })
        .collect::<Result<Vec<_>, RecordError>>()?;

    Ok(FrontierReducer::with_tolerance(tolerance).merge(curves, label))
}

fn metrics_chart_title(panels: PanelSet, input_tokens: u64) -> String {
    match panels {
        PanelSet::Final => format!("metrics_vs_concurrency_of_input_tokens_{input_tokens}"),
        other => format!(
            "{}_metrics_vs_concurrency_of_input_tokens_{input_tokens}",
            other.name()
        ),
    }
}

/// Process a peak throughput campaign.
///
/// # Errors
///
/// Returns an error if any run's statistics cannot be loaded, a chart or the
/// report cannot be written, or the report cannot be uploaded.
pub fn process_peak(results: &PeakResults, ctx: &PipelineContext) -> Result<PeakOutcome> {
    let config = ctx.config();
    let charts = ctx.chart_writer();
    let mode = results.config.save;

    let mut builder = PeakReportBuilder::new(REPORT_TITLE).with_config(&results.config);
    let mut frontiers = Vec::new();

    for (input_tokens, entries) in results.sorted_groups()? {
        let mut runs = Vec::with_capacity(entries.len());

        for (output_tokens, entry) in entries {
            let records = entry.source(mode).load().with_context(|| {
                format!(
                    "Failed to load statistics for input_tokens={input_tokens} output_tokens={output_tokens} from {}",
                    entry.cos_url
                )
            })?;
            let run = LabeledRun::new(output_tokens.to_string(), records);

            let throughput = converged_throughput(&run, &config.convergence);
            tracing::info!(input_tokens, output_tokens, throughput, "Converged throughput");
            builder.add_throughput(
                input_tokens,
                ThroughputRow {
                    output_tokens,
                    source: entry.cos_url.clone(),
                    throughput,
                },
            );
            runs.push(run);
        }

        for &panels in &config.panel_sets {
            let title = metrics_chart_title(panels, input_tokens);
            builder.add_chart(charts.metrics_vs_concurrency(&runs, &title, panels)?);
        }

        let frontier = merge_runs(
            &runs,
            &format!("input_tokens: {input_tokens}"),
            config.tolerance,
        )?;
        builder.add_frontier(&frontier);
        frontiers.push(frontier);
    }

    builder.add_chart(charts.throughput_vs_latency(&frontiers, "throughput_vs_latency")?);

    let report = builder.build();
    let stem = report_file_stem(Local::now());
    let files = write_report(&report, &config.output_dir, &stem)
        .context("Failed to write peak report")?;

    let url = ctx
        .publisher()
        .publish_report(&files.html, &results.config.user)?;

    Ok(PeakOutcome {
        report,
        files,
        frontiers,
        url,
    })
}

/// Process a time-limited throughput campaign.
///
/// # Errors
///
/// Returns an error if the report cannot be written or uploaded.
pub fn process_inline(results: &InlineResults, ctx: &PipelineContext) -> Result<InlineOutcome> {
    let entries = results.sorted_entries();
    tracing::info!(entries = entries.len(), "Processing time-limited results");

    let report = InlineReport::new(REPORT_TITLE, &results.config, &entries);
    let stem = report_file_stem(Local::now());
    let files = write_report(&report, &ctx.config().output_dir, &stem)
        .context("Failed to write inline report")?;

    let url = ctx
        .publisher()
        .publish_report(&files.html, &results.config.user)?;

    Ok(InlineOutcome { report, files, url })
}

/// Merge local run directories into one frontier and chart it.
///
/// `runs` pairs a numeric label with a directory holding a statistics file.
///
/// # Errors
///
/// Returns an error if a run cannot be loaded, a label is not numeric or the
/// chart cannot be written.
pub fn process_frontier(
    runs: &[(String, PathBuf)],
    title: &str,
    ctx: &PipelineContext,
) -> Result<(FrontierCurve, ChartFile)> {
    let loaded = runs
        .iter()
        .map(|(label, dir)| {
            let records = StatisticsSource::Local(dir.clone())
                .load()
                .with_context(|| format!("Failed to load run '{label}' from {}", dir.display()))?;
            Ok(LabeledRun::new(label.clone(), records))
        })
        .collect::<Result<Vec<_>>>()?;

    let frontier = merge_runs(&loaded, title, ctx.config().tolerance)?;
    let chart = ctx
        .chart_writer()
        .throughput_vs_latency(std::slice::from_ref(&frontier), title)?;

    Ok((frontier, chart))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::frontier::Point;
    use crate::records::StatisticsRecord;
    use std::path::Path;
    use tempfile::TempDir;

    fn records(rows: &[(u32, f64, f64)]) -> Vec<StatisticsRecord> {
        rows.iter()
            .map(|(c, tokens, latency)| {
                serde_json::from_str(&format!(
                    r#"{{"concurrency": {c}, "success": 1, "total": 1, "throughput": 1.0,
                        "outputTokensPerSecond": {tokens}, "avgTimeClientSide": {latency}}}"#
                ))
                .unwrap()
            })
            .collect()
    }

    fn write_run(dir: &Path, rows: &[(u32, f64, f64)]) {
        std::fs::create_dir_all(dir).unwrap();
        let json = serde_json::to_string(&records(rows)).unwrap();
        std::fs::write(dir.join("statistics_2024-05-01-10-00-00.json"), json).unwrap();
    }

    fn context(output_dir: &Path) -> PipelineContext {
        let config = VisualizerConfig {
            output_dir: output_dir.to_path_buf(),
            ..VisualizerConfig::default()
        };
        PipelineContext::new(config, Publisher::disabled())
    }

    #[test]
    fn test_merge_runs_orders_by_numeric_label() {
        let runs = vec![
            LabeledRun::new("16", records(&[(1, 20.0, 60.0)])),
            LabeledRun::new("8", records(&[(1, 10.0, 50.0)])),
        ];

        let merged = merge_runs(&runs, "input_tokens: 500", 0.1).unwrap();

        assert_eq!(merged.label, "input_tokens: 500");
        assert_eq!(
            merged.points,
            vec![Point::new(10.0, 50.0), Point::new(20.0, 60.0)]
        );
    }

    #[test]
    fn test_merge_runs_rejects_non_numeric_label() {
        let runs = vec![LabeledRun::new("big", records(&[(1, 1.0, 1.0)]))];
        assert!(matches!(
            merge_runs(&runs, "x", 0.1),
            Err(RecordError::InvalidRank(_))
        ));
    }

    #[test]
    fn test_merge_runs_drops_dominated_run() {
        let runs = vec![
            LabeledRun::new("1", records(&[(1, 10.0, 100.0), (2, 20.0, 200.0), (4, 30.0, 300.0)])),
            LabeledRun::new("2", records(&[(1, 15.0, 100.0), (2, 25.0, 200.0), (4, 35.0, 300.0)])),
        ];

        let merged = merge_runs(&runs, "m", 0.1).unwrap();

        assert_eq!(merged.points, vec![Point::new(35.0, 300.0)]);
    }

    #[test]
    fn test_metrics_chart_title() {
        assert_eq!(
            metrics_chart_title(PanelSet::Final, 500),
            "metrics_vs_concurrency_of_input_tokens_500"
        );
        assert_eq!(
            metrics_chart_title(PanelSet::Time, 500),
            "time_metrics_vs_concurrency_of_input_tokens_500"
        );
    }

    #[test]
    fn test_process_peak_local() {
        let tmp = TempDir::new().unwrap();
        let run_8 = tmp.path().join("runs/500/8");
        let run_16 = tmp.path().join("runs/500/16");
        write_run(&run_8, &[(1, 10.0, 100.0), (2, 20.0, 150.0), (4, 21.0, 400.0)]);
        write_run(&run_16, &[(1, 15.0, 300.0), (2, 30.0, 420.0), (4, 31.0, 900.0)]);

        let json = format!(
            r#"{{"config": {{"user": "alice", "save": "local"}},
                "data": {{"500": {{"16": {{"cos_url": "{}"}}, "8": {{"cos_url": "{}"}}}}}}}}"#,
            run_16.display(),
            run_8.display()
        );
        let results: PeakResults = serde_json::from_str(&json).unwrap();
        let out = tmp.path().join("out");

        let outcome = process_peak(&results, &context(&out)).unwrap();

        assert!(outcome.url.is_none());
        assert!(outcome.files.html.exists());
        assert!(outcome.files.markdown.exists());
        assert!(out.join("metrics_vs_concurrency_of_input_tokens_500.html").exists());
        assert!(out.join("throughput_vs_latency.html").exists());

        let group = &outcome.report.throughput[0];
        let outputs: Vec<u64> = group.rows.iter().map(|r| r.output_tokens).collect();
        assert_eq!(outputs, vec![8, 16]);
        assert_eq!(group.rows[0].throughput, 21.0);

        assert_eq!(outcome.frontiers.len(), 1);
        assert_eq!(outcome.frontiers[0].label, "input_tokens: 500");
        assert_eq!(outcome.report.charts.len(), 2);
    }

    #[test]
    fn test_process_peak_missing_run_fails() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"config": {{"user": "alice"}},
                "data": {{"500": {{"8": {{"cos_url": "{}"}}}}}}}}"#,
            tmp.path().join("absent").display()
        );
        let results: PeakResults = serde_json::from_str(&json).unwrap();

        let err = process_peak(&results, &context(&tmp.path().join("out"))).unwrap_err();

        assert!(format!("{err:#}").contains("input_tokens=500 output_tokens=8"));
    }

    #[test]
    fn test_process_inline() {
        let tmp = TempDir::new().unwrap();
        let results: InlineResults = serde_json::from_str(
            r#"{"config": {"user": "bob"}, "data": [
                {"timeoutSeconds": 10, "inputTokens": 500, "outputTokens": 64,
                 "outputTokensPerSeconds": 1.0, "inputTokensPerSeconds": 2.0, "requestPerSeconds": 0.1},
                {"timeoutSeconds": 5, "inputTokens": 500, "outputTokens": 64,
                 "outputTokensPerSeconds": 3.0, "inputTokensPerSeconds": 4.0, "requestPerSeconds": 0.2}
            ]}"#,
        )
        .unwrap();

        let outcome = process_inline(&results, &context(tmp.path())).unwrap();

        assert_eq!(outcome.report.groups[0].timeout_seconds, 5);
        assert!(outcome.files.html.exists());
        assert!(outcome.url.is_none());
    }

    #[test]
    fn test_process_frontier() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("run");
        write_run(&dir, &[(1, 10.0, 100.0), (2, 20.0, 200.0)]);

        let (frontier, chart) = process_frontier(
            &[("8".to_string(), dir)],
            "merged",
            &context(&tmp.path().join("out")),
        )
        .unwrap();

        assert_eq!(frontier.points.len(), 2);
        assert_eq!(chart.path, tmp.path().join("out").join("merged.html"));
    }
}
