use booker_core::{CheckSummary, Metric, MetricKind, Summary, ValueKind};
use colored::{Color, Colorize};
use std::fmt::Write;

const TREND_KEYS: [&str; 6] = ["avg", "min", "med", "max", "p(90)", "p(95)"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    pub indent: String,
    pub colors: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            colors: true,
        }
    }
}

/// Human readable summary: one line per check, then one dotted line per metric.
pub fn render_text(summary: &Summary, options: &TextOptions) -> String {
    let painter = Painter(options.colors);
    let indent = &options.indent;
    let mut out = String::new();

    let checks = &summary.root_group.checks;
    if !checks.is_empty() {
        out.push('\n');
        for check in checks {
            render_check(&mut out, indent, check, painter);
        }
    }

    out.push('\n');
    let width = summary.metrics.keys().map(String::len).max().unwrap_or(0) + 3;
    for (name, metric) in &summary.metrics {
        let dots = ".".repeat(width - name.len());
        let _ = writeln!(
            out,
            "{indent}{name}{}: {}",
            painter.paint(&dots, Color::BrightBlack),
            render_values(name, metric, painter)
        );
    }
    out.push('\n');

    out
}

fn render_check(out: &mut String, indent: &str, check: &CheckSummary, painter: Painter) {
    if check.fails == 0 {
        let line = format!("✓ {}", check.name);
        let _ = writeln!(out, "{indent}{}", painter.paint(&line, Color::Green));
    } else {
        let line = format!("✗ {}", check.name);
        let _ = writeln!(out, "{indent}{}", painter.paint(&line, Color::Red));
        let _ = writeln!(
            out,
            "{indent} ↳  {:.0}% ✓ {} / ✗ {}",
            check.pass_rate() * 100.,
            check.passes,
            check.fails
        );
    }
}

fn render_values(name: &str, metric: &Metric, painter: Painter) -> String {
    let value = |key: &str| metric.values.get(key).copied().unwrap_or(0.);

    match metric.kind {
        MetricKind::Counter => format!("{} {}/s", value("count"), round(value("rate"))),
        MetricKind::Gauge => format!(
            "{} min={} max={}",
            value("value"),
            value("min"),
            value("max")
        ),
        MetricKind::Rate => {
            let passes = value("passes");
            let fails = value("fails");
            // For http_req_failed a "pass" is a failed request.
            let good = if name == "http_req_failed" {
                passes == 0.
            } else {
                fails == 0.
            };
            let rate = format!("{:.2}%", value("rate") * 100.);
            format!(
                "{} ✓ {} ✗ {}",
                painter.paint(&rate, if good { Color::Green } else { Color::Red }),
                passes,
                fails
            )
        }
        MetricKind::Trend => TREND_KEYS
            .iter()
            .map(|key| {
                let v = value(key);
                let v = match metric.contains {
                    ValueKind::Time => format_millis(v),
                    ValueKind::Default => round(v).to_string(),
                };
                format!("{key}={}", painter.paint(&v, Color::Cyan))
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Format a millisecond value with the most readable unit.
pub(crate) fn format_millis(ms: f64) -> String {
    if ms < 1. {
        format!("{:.2}µs", ms * 1e3)
    } else if ms < 1e3 {
        format!("{ms:.2}ms")
    } else {
        format!("{:.2}s", ms / 1e3)
    }
}

fn round(v: f64) -> f64 {
    (v * 1e3).round() / 1e3
}

#[derive(Clone, Copy)]
struct Painter(bool);

impl Painter {
    fn paint(&self, s: &str, color: Color) -> String {
        if self.0 {
            s.color(color).to_string()
        } else {
            s.to_string()
        }
    }
}
