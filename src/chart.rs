//! Interactive HTML charts rendered with plotly.

use crate::frontier::FrontierCurve;
use crate::metrics::{Metric, PanelSet};
use crate::records::LabeledRun;
use plotly::common::{Mode, Title};
use plotly::layout::{Axis, GridPattern, LayoutGrid};
use plotly::{Layout, Plot, Scatter};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Layouts support at most this many independent subplot axes
const MAX_PANELS: usize = 8;

/// Errors that can occur while writing charts
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to write chart: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Too many panels for one chart: {0} (max 8)")]
    TooManyPanels(usize),
}

/// A chart written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFile {
    pub title: String,
    pub path: PathBuf,
}

/// Writes charts into one output directory
#[derive(Debug, Clone)]
pub struct ChartWriter {
    output_dir: PathBuf,
    width: usize,
    height: usize,
}

impl ChartWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            width: 1600,
            height: 800,
        }
    }

    /// Set the chart size in pixels
    #[must_use]
    pub const fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Draw every metric of `panels` against concurrency, one trace per run.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be written.
    pub fn metrics_vs_concurrency(
        &self,
        runs: &[LabeledRun],
        title: &str,
        panels: PanelSet,
    ) -> Result<ChartFile, ChartError> {
        let plot = metrics_plot(
            runs,
            panels.metrics(),
            panels.grid(),
            self.base_layout(title),
        )?;
        self.write(&plot, title)
    }

    /// Draw throughput against latency, one trace per curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the chart cannot be written.
    pub fn throughput_vs_latency(
        &self,
        curves: &[FrontierCurve],
        title: &str,
    ) -> Result<ChartFile, ChartError> {
        let plot = frontier_plot(curves, self.base_layout(title));
        self.write(&plot, title)
    }

    fn base_layout(&self, title: &str) -> Layout {
        Layout::new()
            .title(Title::new(title))
            .width(self.width)
            .height(self.height)
    }

    fn write(&self, plot: &Plot, title: &str) -> Result<ChartFile, ChartError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{title}.html"));
        std::fs::write(&path, plot.to_html())?;

        tracing::info!(path = %path.display(), "Chart written");
        Ok(ChartFile {
            title: title.to_string(),
            path,
        })
    }
}

/// Build a subplot grid with one panel per metric on top of `layout`.
///
/// # Errors
///
/// Returns `ChartError::TooManyPanels` if the metrics do not fit a layout.
pub fn metrics_plot(
    runs: &[LabeledRun],
    metrics: &[Metric],
    (rows, columns): (usize, usize),
    layout: Layout,
) -> Result<Plot, ChartError> {
    if metrics.len() > MAX_PANELS {
        return Err(ChartError::TooManyPanels(metrics.len()));
    }

    let mut plot = Plot::new();
    let mut layout = layout.grid(
        LayoutGrid::new()
            .rows(rows)
            .columns(columns)
            .pattern(GridPattern::Independent),
    );

    for (idx, metric) in metrics.iter().enumerate() {
        let panel = idx + 1;
        let (x_ref, y_ref) = axis_refs(panel);

        for run in runs {
            let series = metric.series(run);
            let trace = Scatter::new(series.concurrency, series.values)
                .name(&run.label)
                .mode(Mode::LinesMarkers)
                .legend_group(&run.label)
                .show_legend(idx == 0)
                .x_axis(&x_ref)
                .y_axis(&y_ref);
            plot.add_trace(trace);
        }

        layout = with_panel_axes(
            layout,
            panel,
            Axis::new().title(Title::new("Concurrency")),
            Axis::new().title(Title::new(metric.title())),
        );
    }

    plot.set_layout(layout);
    Ok(plot)
}

/// Build a throughput (tokens/s) against latency (ms) chart on top of `layout`
#[must_use]
pub fn frontier_plot(curves: &[FrontierCurve], layout: Layout) -> Plot {
    let mut plot = Plot::new();

    for curve in curves {
        let trace = Scatter::new(curve.latencies(), curve.throughputs())
            .name(&curve.label)
            .mode(Mode::LinesMarkers);
        plot.add_trace(trace);
    }

    let layout = layout
        .x_axis(Axis::new().title(Title::new("latency (ms)")))
        .y_axis(Axis::new().title(Title::new("throughput (tokens/s)")));
    plot.set_layout(layout);
    plot
}

fn axis_refs(panel: usize) -> (String, String) {
    if panel == 1 {
        ("x".to_string(), "y".to_string())
    } else {
        (format!("x{panel}"), format!("y{panel}"))
    }
}

fn with_panel_axes(layout: Layout, panel: usize, x: Axis, y: Axis) -> Layout {
    match panel {
        1 => layout.x_axis(x).y_axis(y),
        2 => layout.x_axis2(x).y_axis2(y),
        3 => layout.x_axis3(x).y_axis3(y),
        4 => layout.x_axis4(x).y_axis4(y),
        5 => layout.x_axis5(x).y_axis5(y),
        6 => layout.x_axis6(x).y_axis6(y),
        7 => layout.x_axis7(x).y_axis7(y),
        8 => layout.x_axis8(x).y_axis8(y),
        _ => layout,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::frontier::Point;
    use crate::records::StatisticsRecord;
    use tempfile::TempDir;

    fn run(label: &str) -> LabeledRun {
        let records: Vec<StatisticsRecord> = serde_json::from_str(
            r#"[
                {"concurrency": 1, "throughput": 1.0, "outputTokensPerSecond": 10.0, "avgTimeClientSide": 100.0},
                {"concurrency": 2, "throughput": 2.0, "outputTokensPerSecond": 19.0, "avgTimeClientSide": 110.0}
            ]"#,
        )
        .unwrap();
        LabeledRun::new(label, records)
    }

    #[test]
    fn test_axis_refs() {
        assert_eq!(axis_refs(1), ("x".to_string(), "y".to_string()));
        assert_eq!(axis_refs(3), ("x3".to_string(), "y3".to_string()));
    }

    #[test]
    fn test_metrics_plot_html_contains_runs() {
        let plot = metrics_plot(
            &[run("8"), run("16")],
            PanelSet::Final.metrics(),
            PanelSet::Final.grid(),
            Layout::new().title(Title::new("metrics_vs_concurrency_of_input_tokens_500")),
        )
        .unwrap();

        let html = plot.to_html();
        assert!(html.contains("metrics_vs_concurrency_of_input_tokens_500"));
        assert!(html.contains("Avg Latency Client (ms)"));
        assert!(html.contains("x3"));
    }

    #[test]
    fn test_metrics_plot_too_many_panels() {
        let metrics = [Metric::P99; 9];
        let result = metrics_plot(&[run("8")], &metrics, (3, 3), Layout::new());
        assert!(matches!(result, Err(ChartError::TooManyPanels(9))));
    }

    #[test]
    fn test_frontier_plot_labels() {
        let curve = FrontierCurve {
            label: "input_tokens: 500".to_string(),
            points: vec![Point::new(10.0, 100.0), Point::new(20.0, 300.0)],
        };

        let html = frontier_plot(&[curve], Layout::new()).to_html();

        assert!(html.contains("input_tokens: 500"));
        assert!(html.contains("latency (ms)"));
    }

    #[test]
    fn test_writer_creates_file() {
        let dir = TempDir::new().unwrap();
        let writer = ChartWriter::new(dir.path().join("charts")).with_size(800, 400);

        let chart = writer
            .metrics_vs_concurrency(&[run("8")], "metrics", PanelSet::Token)
            .unwrap();

        assert_eq!(chart.title, "metrics");
        assert_eq!(chart.path, dir.path().join("charts").join("metrics.html"));
        assert!(chart.path.exists());
    }
}
