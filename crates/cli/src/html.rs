//! Standalone HTML rendering of a forecast report

use crate::output::{format_curve, format_metric, format_series};
use emtech_lib::RunReport;
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:right}\
th{background:#eee}td.text{text-align:left}\
.failed{color:#b00}";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_html(report: &RunReport) -> String {
    let title = report
        .sections
        .first()
        .map(|s| s.title.as_str())
        .unwrap_or("Forecasts");

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
        escape(title),
        STYLE
    );

    for section in &report.sections {
        let _ = writeln!(html, "<h1>{}</h1>", escape(&section.title));
        if section.groups.iter().all(|g| g.results.is_empty()) {
            html.push_str("<p>No terms selected.</p>\n");
            continue;
        }

        for group in &section.groups {
            let curves = group.results.iter().any(|r| r.fitted_curve.is_some());
            let _ = writeln!(html, "<h2>{}</h2>", escape(&group.predictor));
            html.push_str("<table>\n<tr><th>Term</th><th>Forecast</th>");
            if report.train_test {
                html.push_str("<th>Actual</th><th>MAE</th><th>RMSE</th><th>sMAPE</th>");
            }
            if curves {
                html.push_str("<th>Fitted Curve</th>");
            }
            html.push_str("<th>Status</th></tr>\n");

            for result in &group.results {
                let _ = write!(
                    html,
                    "<tr><td class=\"text\">{}</td><td>{}</td>",
                    escape(&result.term),
                    format_series(&result.forecast_values())
                );
                if report.train_test {
                    let _ = write!(
                        html,
                        "<td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
                        result.actuals.as_deref().map_or_else(String::new, format_series),
                        format_metric(result.errors.map(|e| e.mae)),
                        format_metric(result.errors.map(|e| e.rmse)),
                        format_metric(result.errors.map(|e| e.smape)),
                    );
                }
                if curves {
                    let _ = write!(
                        html,
                        "<td>{}</td>",
                        result.fitted_curve.as_deref().map_or_else(String::new, format_curve)
                    );
                }
                match result.failure_reason() {
                    None => html.push_str("<td class=\"text\">completed</td></tr>\n"),
                    Some(reason) => {
                        let _ = writeln!(
                            html,
                            "<td class=\"text failed\">{}</td></tr>",
                            reason.as_str()
                        );
                    }
                }
            }

            if report.train_test {
                let _ = writeln!(
                    html,
                    "<tr><th>Mean</th><th></th><th></th><th>{}</th><th>{}</th><th>{}</th>{}<th>{}/{}</th></tr>",
                    format_metric(group.summary.mean_mae),
                    format_metric(group.summary.mean_rmse),
                    format_metric(group.summary.mean_smape),
                    if curves { "<th></th>" } else { "" },
                    group.summary.completed,
                    group.summary.completed + group.summary.failed,
                );
            }
            html.push_str("</table>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_empty_report_has_default_title() {
        let report = RunReport {
            run_id: "run-test".to_string(),
            generated_at: chrono::Utc::now(),
            train_test: false,
            normalized: false,
            horizon: 5,
            classifications: Vec::new(),
            sections: Vec::new(),
        };
        let html = render_html(&report);
        assert!(html.contains("<title>Forecasts</title>"));
        assert!(html.ends_with("</html>\n"));
    }
}
