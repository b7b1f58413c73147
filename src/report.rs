//! Report generation for peak and time-limited throughput campaigns.
//!
//! Reports contain:
//! - the campaign configuration
//! - a throughput table grouped by the first key column
//! - for peak campaigns, frontier summaries and links to the charts
//!
//! Each report renders as JSON, Markdown, plain text and standalone HTML.

use crate::chart::ChartFile;
use crate::config::{CampaignConfig, InlineEntry};
use crate::frontier::FrontierCurve;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Report file stem; a local timestamp is appended
pub const REPORT_FILE_STEM: &str = "model_performance_report";

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report title
    pub title: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Visualizer version
    pub version: String,
}

impl ReportMetadata {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One campaign setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Setting")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

fn config_rows(config: &CampaignConfig) -> Vec<ConfigRow> {
    config
        .rows()
        .into_iter()
        .map(|(key, value)| ConfigRow { key, value })
        .collect()
}

/// Converged throughput of one output-token configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputRow {
    pub output_tokens: u64,
    /// Where the statistics came from (URL or run directory)
    pub source: String,
    /// Converged output tokens per second
    pub throughput: f64,
}

/// Throughput rows sharing an input token count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputGroup {
    pub input_tokens: u64,
    pub rows: Vec<ThroughputRow>,
}

/// Shape of one merged frontier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierSummary {
    pub label: String,
    pub points: usize,
    pub peak_throughput: f64,
    /// Latency at the peak throughput point
    pub latency_at_peak: f64,
}

impl From<&FrontierCurve> for FrontierSummary {
    fn from(curve: &FrontierCurve) -> Self {
        let peak = curve
            .points
            .iter()
            .max_by(|a, b| a.throughput.total_cmp(&b.throughput));

        Self {
            label: curve.label.clone(),
            points: curve.points.len(),
            peak_throughput: peak.map_or(0.0, |p| p.throughput),
            latency_at_peak: peak.map_or(0.0, |p| p.latency),
        }
    }
}

/// Peak throughput campaign report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakReport {
    pub metadata: ReportMetadata,
    pub configuration: Vec<ConfigRow>,
    pub throughput: Vec<ThroughputGroup>,
    pub frontiers: Vec<FrontierSummary>,
    pub charts: Vec<ChartFile>,
}

/// Builder for [`PeakReport`]
pub struct PeakReportBuilder {
    title: String,
    configuration: Vec<ConfigRow>,
    throughput: Vec<ThroughputGroup>,
    frontiers: Vec<FrontierSummary>,
    charts: Vec<ChartFile>,
}

impl PeakReportBuilder {
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            configuration: Vec::new(),
            throughput: Vec::new(),
            frontiers: Vec::new(),
            charts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &CampaignConfig) -> Self {
        self.configuration = config_rows(config);
        self
    }

    /// Record a converged throughput; rows are grouped by `input_tokens`
    /// in insertion order.
    pub fn add_throughput(&mut self, input_tokens: u64, row: ThroughputRow) {
        match self
            .throughput
            .iter_mut()
            .find(|g| g.input_tokens == input_tokens)
        {
            Some(group) => group.rows.push(row),
            None => self.throughput.push(ThroughputGroup {
                input_tokens,
                rows: vec![row],
            }),
        }
    }

    pub fn add_frontier(&mut self, curve: &FrontierCurve) {
        self.frontiers.push(FrontierSummary::from(curve));
    }

    pub fn add_chart(&mut self, chart: ChartFile) {
        self.charts.push(chart);
    }

    #[must_use]
    pub fn build(self) -> PeakReport {
        PeakReport {
            metadata: ReportMetadata::new(&self.title),
            configuration: self.configuration,
            throughput: self.throughput,
            frontiers: self.frontiers,
            charts: self.charts,
        }
    }
}

/// Table row for text/markdown output
#[derive(Tabled)]
struct PeakTableRow {
    #[tabled(rename = "Input Tokens")]
    input_tokens: String,
    #[tabled(rename = "Output Tokens")]
    output_tokens: u64,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Throughput (tokens/s)")]
    throughput: String,
}

#[derive(Tabled)]
struct FrontierTableRow {
    #[tabled(rename = "Curve")]
    label: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Peak (tokens/s)")]
    peak: String,
    #[tabled(rename = "Latency at Peak (ms)")]
    latency: String,
}

impl PeakReport {
    /// Render report as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn table_rows(&self, link: fn(&str) -> String) -> Vec<PeakTableRow> {
        self.throughput
            .iter()
            .flat_map(|group| {
                group.rows.iter().enumerate().map(move |(i, row)| PeakTableRow {
                    input_tokens: if i == 0 {
                        group.input_tokens.to_string()
                    } else {
                        String::new()
                    },
                    output_tokens: row.output_tokens,
                    source: link(&row.source),
                    throughput: format!("{:.3}", row.throughput),
                })
            })
            .collect()
    }

    fn frontier_rows(&self) -> Vec<FrontierTableRow> {
        self.frontiers
            .iter()
            .map(|f| FrontierTableRow {
                label: f.label.clone(),
                points: f.points,
                peak: format!("{:.3}", f.peak_throughput),
                latency: format!("{:.1}", f.latency_at_peak),
            })
            .collect()
    }

    /// Render report as markdown
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        write_markdown_header(&mut output, &self.metadata);
        write_markdown_config(&mut output, &self.configuration);

        writeln!(output, "## 1. Throughput by Input and Output Tokens").ok();
        writeln!(output).ok();
        let rows = self.table_rows(|source| format!("[link]({source})"));
        writeln!(output, "{}", Table::new(rows).with(Style::markdown())).ok();
        writeln!(output).ok();

        if !self.frontiers.is_empty() {
            writeln!(output, "## 2. Throughput vs Latency Frontier").ok();
            writeln!(output).ok();
            let table = Table::new(self.frontier_rows())
                .with(Style::markdown())
                .to_string();
            writeln!(output, "{table}").ok();
            writeln!(output).ok();
        }

        if !self.charts.is_empty() {
            writeln!(output, "## Charts").ok();
            writeln!(output).ok();
            for (idx, chart) in self.charts.iter().enumerate() {
                writeln!(
                    output,
                    "{}. [{}]({})",
                    idx + 1,
                    chart.title,
                    chart_href(&chart.path)
                )
                .ok();
            }
        }

        output
    }

    /// Render report as plain text table
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        write_text_banner(&mut output, &self.metadata.title);

        writeln!(output, "CONFIGURATION").ok();
        writeln!(output, "{RULE}").ok();
        for row in &self.configuration {
            writeln!(output, "  {:<20} {}", row.key, row.value).ok();
        }
        writeln!(output).ok();

        writeln!(output, "THROUGHPUT").ok();
        writeln!(output, "{RULE}").ok();
        let rows = self.table_rows(ToString::to_string);
        writeln!(output, "{}", Table::new(rows)).ok();
        writeln!(output).ok();

        if !self.frontiers.is_empty() {
            writeln!(output, "FRONTIER").ok();
            writeln!(output, "{RULE}").ok();
            writeln!(output, "{}", Table::new(self.frontier_rows())).ok();
        }

        output
    }

    /// Render report as a standalone HTML page
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut output = String::new();

        write_html_head(&mut output, &self.metadata);
        write_html_config(&mut output, &self.configuration);

        writeln!(output, "<h2>1. Throughput by Input and Output Tokens</h2>").ok();
        writeln!(output, "<table>").ok();
        writeln!(
            output,
            "<tr><th>input tokens</th><th>output tokens</th><th>source</th><th>throughput (tokens/s)</th></tr>"
        )
        .ok();
        for group in &self.throughput {
            for (i, row) in group.rows.iter().enumerate() {
                write!(output, "<tr>").ok();
                if i == 0 {
                    write!(
                        output,
                        "<td rowspan=\"{}\">{}</td>",
                        group.rows.len(),
                        group.input_tokens
                    )
                    .ok();
                }
                writeln!(
                    output,
                    "<td>{}</td><td><a href=\"{}\">click me</a></td><td>{:.3}</td></tr>",
                    row.output_tokens,
                    escape_html(&row.source),
                    row.throughput
                )
                .ok();
            }
        }
        writeln!(output, "</table>").ok();

        if !self.frontiers.is_empty() {
            writeln!(output, "<h2>2. Throughput vs Latency Frontier</h2>").ok();
            writeln!(output, "<table>").ok();
            writeln!(
                output,
                "<tr><th>curve</th><th>points</th><th>peak (tokens/s)</th><th>latency at peak (ms)</th></tr>"
            )
            .ok();
            for f in &self.frontiers {
                writeln!(
                    output,
                    "<tr><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.1}</td></tr>",
                    escape_html(&f.label),
                    f.points,
                    f.peak_throughput,
                    f.latency_at_peak
                )
                .ok();
            }
            writeln!(output, "</table>").ok();
        }

        for (idx, chart) in self.charts.iter().enumerate() {
            let href = escape_html(&chart_href(&chart.path));
            writeln!(
                output,
                "<h2>{}. <a href=\"{href}\">{}</a></h2>",
                idx + 3,
                escape_html(&chart.title)
            )
            .ok();
            writeln!(output, "<iframe src=\"{href}\"></iframe>").ok();
        }

        write_html_tail(&mut output);
        output
    }
}

/// Time-limited throughput rows sharing a timeout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutGroup {
    pub timeout_seconds: u64,
    pub entries: Vec<InlineEntry>,
}

/// Time-limited throughput campaign report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineReport {
    pub metadata: ReportMetadata,
    pub configuration: Vec<ConfigRow>,
    pub groups: Vec<TimeoutGroup>,
}

#[derive(Tabled)]
struct InlineTableRow {
    #[tabled(rename = "Time Limit")]
    timeout: String,
    #[tabled(rename = "Input/Output Tokens")]
    tokens: String,
    #[tabled(rename = "Output Tokens/s")]
    output_tps: String,
    #[tabled(rename = "Input Tokens/s")]
    input_tps: String,
    #[tabled(rename = "Requests/s")]
    rps: String,
}

impl InlineReport {
    /// Group entries by timeout. `entries` are expected in
    /// (timeout, input, output) order.
    #[must_use]
    pub fn new(title: &str, config: &CampaignConfig, entries: &[InlineEntry]) -> Self {
        let mut groups: Vec<TimeoutGroup> = Vec::new();
        for entry in entries {
            match groups.last_mut() {
                Some(group) if group.timeout_seconds == entry.timeout_seconds => {
                    group.entries.push(entry.clone());
                }
                _ => groups.push(TimeoutGroup {
                    timeout_seconds: entry.timeout_seconds,
                    entries: vec![entry.clone()],
                }),
            }
        }

        Self {
            metadata: ReportMetadata::new(title),
            configuration: config_rows(config),
            groups,
        }
    }

    /// Render report as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn table_rows(&self) -> Vec<InlineTableRow> {
        self.groups
            .iter()
            .flat_map(|group| {
                group.entries.iter().enumerate().map(move |(i, e)| InlineTableRow {
                    timeout: if i == 0 {
                        format!("{} s", group.timeout_seconds)
                    } else {
                        String::new()
                    },
                    tokens: format!("{} / {}", e.input_tokens, e.output_tokens),
                    output_tps: format!("{:.3}", e.output_tokens_per_seconds),
                    input_tps: format!("{:.3}", e.input_tokens_per_seconds),
                    rps: format!("{:.3}", e.request_per_seconds),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        write_markdown_header(&mut output, &self.metadata);
        write_markdown_config(&mut output, &self.configuration);

        writeln!(
            output,
            "## 1. Throughput by Input and Output Tokens under Time Constraint"
        )
        .ok();
        writeln!(output).ok();
        let table = Table::new(self.table_rows())
            .with(Style::markdown())
            .to_string();
        writeln!(output, "{table}").ok();

        output
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        write_text_banner(&mut output, &self.metadata.title);
        writeln!(output, "THROUGHPUT UNDER TIME CONSTRAINT").ok();
        writeln!(output, "{RULE}").ok();
        writeln!(output, "{}", Table::new(self.table_rows())).ok();

        output
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let mut output = String::new();

        write_html_head(&mut output, &self.metadata);
        write_html_config(&mut output, &self.configuration);

        writeln!(
            output,
            "<h2>1. Throughput by Input and Output Tokens under Time Constraint</h2>"
        )
        .ok();
        writeln!(output, "<table>").ok();
        writeln!(
            output,
            "<tr><th>time limit (s)</th><th>input/output tokens</th><th>outputTokens/s</th><th>inputTokens/s</th><th>requests/s</th></tr>"
        )
        .ok();
        for group in &self.groups {
            for (i, e) in group.entries.iter().enumerate() {
                write!(output, "<tr>").ok();
                if i == 0 {
                    write!(
                        output,
                        "<td rowspan=\"{}\">{} s</td>",
                        group.entries.len(),
                        group.timeout_seconds
                    )
                    .ok();
                }
                writeln!(
                    output,
                    "<td>{} / {}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td></tr>",
                    e.input_tokens,
                    e.output_tokens,
                    e.output_tokens_per_seconds,
                    e.input_tokens_per_seconds,
                    e.request_per_seconds
                )
                .ok();
            }
        }
        writeln!(output, "</table>").ok();

        write_html_tail(&mut output);
        output
    }
}

/// A report that can be written as HTML and Markdown files
pub trait ReportDocument {
    fn to_markdown(&self) -> String;
    fn to_html(&self) -> String;
}

impl ReportDocument for PeakReport {
    fn to_markdown(&self) -> String {
        Self::to_markdown(self)
    }

    fn to_html(&self) -> String {
        Self::to_html(self)
    }
}

impl ReportDocument for InlineReport {
    fn to_markdown(&self) -> String {
        Self::to_markdown(self)
    }

    fn to_html(&self) -> String {
        Self::to_html(self)
    }
}

/// Paths of a written report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub html: PathBuf,
    pub markdown: PathBuf,
}

/// File stem for a report generated at `now`
#[must_use]
pub fn report_file_stem(now: DateTime<Local>) -> String {
    format!(
        "{REPORT_FILE_STEM}_{}",
        now.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Write `report` as `<stem>.html` and `<stem>.md` into `dir`
///
/// # Errors
///
/// Returns an error if the directory or files cannot be written.
pub fn write_report<R: ReportDocument>(
    report: &R,
    dir: &Path,
    stem: &str,
) -> std::io::Result<ReportFiles> {
    std::fs::create_dir_all(dir)?;

    let html = dir.join(format!("{stem}.html"));
    std::fs::write(&html, report.to_html())?;

    let markdown = dir.join(format!("{stem}.md"));
    std::fs::write(&markdown, report.to_markdown())?;

    tracing::info!(path = %html.display(), "Report written");
    Ok(ReportFiles { html, markdown })
}

const RULE: &str = "───────────────────────────────────────────────────────────────";
const BANNER: &str = "═══════════════════════════════════════════════════════════════";

fn write_text_banner(output: &mut String, title: &str) {
    writeln!(output, "{BANNER}").ok();
    writeln!(output, "  {title}").ok();
    writeln!(output, "{BANNER}").ok();
    writeln!(output).ok();
}

fn write_markdown_header(output: &mut String, metadata: &ReportMetadata) {
    writeln!(output, "# {}", metadata.title).ok();
    writeln!(output).ok();
    writeln!(
        output,
        "**Generated:** {}",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
    .ok();
    writeln!(output, "**Version:** {}", metadata.version).ok();
    writeln!(output).ok();
}

fn write_markdown_config(output: &mut String, rows: &[ConfigRow]) {
    writeln!(output, "## 0. Configurations").ok();
    writeln!(output).ok();
    let table = Table::new(rows).with(Style::markdown()).to_string();
    writeln!(output, "{table}").ok();
    writeln!(output).ok();
}

fn write_html_head(output: &mut String, metadata: &ReportMetadata) {
    let title = escape_html(&metadata.title);
    writeln!(output, "<!DOCTYPE html>").ok();
    writeln!(output, "<html><head><meta charset=\"utf-8\"><title>{title}</title>").ok();
    writeln!(
        output,
        "<style>body{{font-family:Helvetica,sans-serif;margin:2em}}\
         table{{border-collapse:collapse;margin-bottom:1.5em}}\
         th{{background:#808080;color:#f5f5f5}}\
         td,th{{border:1px solid #000;padding:6px 12px;text-align:center}}\
         iframe{{width:100%;height:600px;border:none}}</style>"
    )
    .ok();
    writeln!(output, "</head><body>").ok();
    writeln!(output, "<h1>{title}</h1>").ok();
    writeln!(
        output,
        "<p>Generated {} &middot; v{}</p>",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(&metadata.version)
    )
    .ok();
}

fn write_html_config(output: &mut String, rows: &[ConfigRow]) {
    writeln!(output, "<h2>0. Configurations</h2>").ok();
    writeln!(output, "<table>").ok();
    for row in rows {
        writeln!(
            output,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&row.key),
            escape_html(&row.value)
        )
        .ok();
    }
    writeln!(output, "</table>").ok();
}

fn write_html_tail(output: &mut String) {
    writeln!(output, "</body></html>").ok();
}

/// Charts sit next to the report, so link them by file name
fn chart_href(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::frontier::Point;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn campaign() -> CampaignConfig {
        serde_json::from_str(r#"{"user": "alice", "save": "local", "model": "m<1>"}"#).unwrap()
    }

    fn peak_report() -> PeakReport {
        let mut builder = PeakReportBuilder::new("Model Performance Report").with_config(&campaign());
        builder.add_throughput(
            500,
            ThroughputRow {
                output_tokens: 8,
                source: "https://cos.example.com/a?x=1&y=2".to_string(),
                throughput: 158.123_4,
            },
        );
        builder.add_throughput(
            1000,
            ThroughputRow {
                output_tokens: 8,
                source: "runs/1000/8".to_string(),
                throughput: 90.0,
            },
        );
        builder.add_throughput(
            500,
            ThroughputRow {
                output_tokens: 16,
                source: "runs/500/16".to_string(),
                throughput: 201.5,
            },
        );
        builder.add_frontier(&FrontierCurve {
            label: "input_tokens: 500".to_string(),
            points: vec![Point::new(100.0, 300.0), Point::new(210.0, 900.0)],
        });
        builder.add_chart(ChartFile {
            title: "throughput_vs_latency".to_string(),
            path: PathBuf::from("/out/throughput_vs_latency.html"),
        });
        builder.build()
    }

    fn inline_entry(timeout: u64, input: u64, output: u64) -> InlineEntry {
        InlineEntry {
            timeout_seconds: timeout,
            input_tokens: input,
            output_tokens: output,
            output_tokens_per_seconds: 12.5,
            input_tokens_per_seconds: 100.0,
            request_per_seconds: 0.25,
        }
    }

    #[test]
    fn test_builder_groups_by_input_tokens() {
        let report = peak_report();

        assert_eq!(report.throughput.len(), 2);
        assert_eq!(report.throughput[0].input_tokens, 500);
        assert_eq!(report.throughput[0].rows.len(), 2);
        assert_eq!(report.throughput[1].rows[0].throughput, 90.0);
        assert_eq!(report.metadata.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_frontier_summary() {
        let report = peak_report();
        let summary = &report.frontiers[0];

        assert_eq!(summary.points, 2);
        assert_eq!(summary.peak_throughput, 210.0);
        assert_eq!(summary.latency_at_peak, 900.0);

        let empty = FrontierSummary::from(&FrontierCurve {
            label: "x".to_string(),
            points: Vec::new(),
        });
        assert_eq!(empty.peak_throughput, 0.0);
    }

    #[test]
    fn test_peak_markdown() {
        let md = peak_report().to_markdown();

        assert!(md.contains("# Model Performance Report"));
        assert!(md.contains("## 0. Configurations"));
        assert!(md.contains("158.123"));
        assert!(md.contains("[link](runs/500/16)"));
        assert!(md.contains("input_tokens: 500"));
        assert!(md.contains("1. [throughput_vs_latency](throughput_vs_latency.html)"));
    }

    #[test]
    fn test_peak_text() {
        let text = peak_report().to_text();

        assert!(text.contains("CONFIGURATION"));
        assert!(text.contains("alice"));
        assert!(text.contains("201.500"));
    }

    #[test]
    fn test_peak_html_escapes_and_spans() {
        let html = peak_report().to_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("m&lt;1&gt;"));
        assert!(html.contains("a?x=1&amp;y=2"));
        assert!(html.contains("<td rowspan=\"2\">500</td>"));
        assert!(html.contains("<iframe src=\"throughput_vs_latency.html\">"));
        assert!(html.ends_with("</body></html>\n"));
    }

    #[test]
    fn test_peak_json() {
        let json = peak_report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["throughput"][0]["input_tokens"], 500);
        assert_eq!(value["charts"][0]["title"], "throughput_vs_latency");
    }

    #[test]
    fn test_inline_report_groups() {
        let entries = vec![
            inline_entry(5, 500, 64),
            inline_entry(5, 1000, 64),
            inline_entry(10, 500, 64),
        ];

        let report = InlineReport::new("Model Performance Report", &campaign(), &entries);

        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].timeout_seconds, 5);
        assert_eq!(report.groups[0].entries.len(), 2);

        let md = report.to_markdown();
        assert!(md.contains("5 s"));
        assert!(md.contains("1000 / 64"));
        assert!(md.contains("0.250"));

        let html = report.to_html();
        assert!(html.contains("<td rowspan=\"2\">5 s</td>"));
        assert!(html.contains("<td rowspan=\"1\">10 s</td>"));

        assert!(report.to_text().contains("TIME CONSTRAINT"));
    }

    #[test]
    fn test_report_file_stem() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
        assert_eq!(
            report_file_stem(now),
            "model_performance_report_2024-05-01_13-04-05"
        );
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();

        let files = write_report(&peak_report(), dir.path(), "report").unwrap();

        assert_eq!(files.html, dir.path().join("report.html"));
        assert!(std::fs::read_to_string(&files.markdown)
            .unwrap()
            .contains("Model Performance Report"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }
}
