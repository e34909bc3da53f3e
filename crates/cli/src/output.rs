//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use emtech_lib::{Classification, EmergenceLabel, ForecastResult, PredictorSpec, RunReport};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Output format for listing commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Output format for forecast reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// Standalone HTML document
    Html,
}

/// Render rows as a table, or a placeholder when there are none
pub fn render_table<T: Tabled>(items: &[T]) -> String {
    if items.is_empty() {
        return "No items found".yellow().to_string();
    }
    Table::new(items).with(Style::rounded()).to_string()
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write `content` to `path`, or stdout when no path is given
pub fn emit(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    use anyhow::Context;
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Color an emergence label
pub fn color_label(label: EmergenceLabel) -> String {
    match label {
        EmergenceLabel::Emergent => label.as_str().green().to_string(),
        EmergenceLabel::Stationary => label.as_str().blue().to_string(),
        EmergenceLabel::Declining => label.as_str().red().to_string(),
    }
}

/// Color a cell status
pub fn color_status(result: &ForecastResult) -> String {
    match result.failure_reason() {
        None => "completed".green().to_string(),
        Some(reason) => reason.as_str().red().to_string(),
    }
}

pub fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

pub fn format_series(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fitted values over the training range; `-` where the model has none
pub fn format_curve(curve: &[Option<f64>]) -> String {
    curve
        .iter()
        .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Tabled)]
struct PredictorRow {
    #[tabled(rename = "Code")]
    code: usize,
    #[tabled(rename = "Predictor")]
    name: String,
}

#[derive(Serialize)]
struct PredictorEntry {
    code: usize,
    name: &'static str,
}

pub fn render_predictors(format: OutputFormat) -> anyhow::Result<String> {
    let all = PredictorSpec::all();
    match format {
        OutputFormat::Json => {
            let entries: Vec<PredictorEntry> = std::iter::once(PredictorEntry {
                code: 0,
                name: emtech_lib::predictor::ALL_PREDICTORS,
            })
            .chain(all.iter().map(|s| PredictorEntry {
                code: s.code(),
                name: s.name(),
            }))
            .collect();
            render_json(&entries)
        }
        OutputFormat::Table => {
            let rows: Vec<PredictorRow> = std::iter::once(PredictorRow {
                code: 0,
                name: emtech_lib::predictor::ALL_PREDICTORS.to_string(),
            })
            .chain(all.iter().map(|s| PredictorRow {
                code: s.code(),
                name: s.name().to_string(),
            }))
            .collect();
            Ok(render_table(&rows))
        }
    }
}

#[derive(Tabled)]
struct ClassificationRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Recent Slope")]
    recent_slope: String,
    #[tabled(rename = "Baseline Slope")]
    baseline_slope: String,
}

pub fn render_classifications(
    classifications: &[Classification],
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => render_json(classifications),
        OutputFormat::Table => {
            let rows: Vec<ClassificationRow> = classifications
                .iter()
                .map(|c| ClassificationRow {
                    term: c.term.clone(),
                    label: color_label(c.label),
                    score: format!("{:.3}", c.score),
                    recent_slope: format!("{:.3}", c.recent_slope),
                    baseline_slope: format!("{:.3}", c.baseline_slope),
                })
                .collect();
            Ok(render_table(&rows))
        }
    }
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Predictor")]
    predictor: String,
    #[tabled(rename = "Forecast")]
    forecast: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "MAE")]
    mae: String,
    #[tabled(rename = "RMSE")]
    rmse: String,
    #[tabled(rename = "sMAPE")]
    smape: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct CurveRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Predictor")]
    predictor: String,
    #[tabled(rename = "Fitted Curve")]
    curve: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Predictor")]
    predictor: String,
    #[tabled(rename = "Mean MAE")]
    mae: String,
    #[tabled(rename = "Mean RMSE")]
    rmse: String,
    #[tabled(rename = "Mean sMAPE")]
    smape: String,
    #[tabled(rename = "Completed")]
    completed: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

/// Tables for every section of a report
pub fn render_report_tables(report: &RunReport) -> String {
    let mut out = String::new();
    for section in &report.sections {
        out.push_str(&format!("{}\n", section.title.bold()));
        out.push_str(&format!("{}\n", "=".repeat(section.title.len())));

        let rows: Vec<ForecastRow> = section
            .groups
            .iter()
            .flat_map(|g| g.results.iter())
            .map(|r| ForecastRow {
                term: r.term.clone(),
                predictor: r.predictor.clone(),
                forecast: format_series(&r.forecast_values()),
                actual: r.actuals.as_deref().map_or_else(|| "-".to_string(), format_series),
                mae: format_metric(r.errors.map(|e| e.mae)),
                rmse: format_metric(r.errors.map(|e| e.rmse)),
                smape: format_metric(r.errors.map(|e| e.smape)),
                status: color_status(r),
            })
            .collect();
        out.push_str(&render_table(&rows));
        out.push('\n');

        let curves: Vec<CurveRow> = section
            .groups
            .iter()
            .flat_map(|g| g.results.iter())
            .filter_map(|r| {
                r.fitted_curve.as_deref().map(|curve| CurveRow {
                    term: r.term.clone(),
                    predictor: r.predictor.clone(),
                    curve: format_curve(curve),
                })
            })
            .collect();
        if !curves.is_empty() {
            out.push_str(&format!("\n{}\n", "Fitted Curves".bold()));
            out.push_str(&render_table(&curves));
            out.push('\n');
        }

        if report.train_test && !section.groups.is_empty() {
            let summary: Vec<SummaryRow> = section
                .groups
                .iter()
                .map(|g| SummaryRow {
                    predictor: g.predictor.clone(),
                    mae: format_metric(g.summary.mean_mae),
                    rmse: format_metric(g.summary.mean_rmse),
                    smape: format_metric(g.summary.mean_smape),
                    completed: g.summary.completed,
                    failed: g.summary.failed,
                })
                .collect();
            out.push_str(&format!("\n{}\n", "Summary".bold()));
            out.push_str(&render_table(&summary));
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}
