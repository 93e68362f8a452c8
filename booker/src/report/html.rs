use super::text::format_millis;
use booker_core::{Metric, MetricKind, Summary, ValueKind};
use handlebars::{Handlebars, RenderError};
use serde::Serialize;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Load test report</title>
<style>
body{font-family:sans-serif;margin:2em;color:#222}
table{border-collapse:collapse;margin-bottom:2em}
th,td{border:1px solid #ccc;padding:4px 10px;text-align:left}
th{background:#f0f0f0}.pass{color:#1a7f37}.fail{color:#cf222e}
</style>
</head>
<body>
<h1>Load test report</h1>
<p>Test run duration: {{duration}}</p>
<h2>Checks</h2>
<p>Passed: <span class="pass">{{passes}}</span> Failed: <span class="fail">{{fails}}</span></p>
<table>
<tr><th>Check</th><th>Passes</th><th>Failures</th></tr>
{{#each checks}}
<tr class="{{class}}"><td>{{name}}</td><td>{{passes}}</td><td>{{fails}}</td></tr>
{{/each}}
</table>
<h2>Metrics</h2>
<table>
<tr><th>Metric</th><th>Type</th><th>Values</th></tr>
{{#each metrics}}
<tr><td>{{name}}</td><td>{{kind}}</td><td>{{values}}</td></tr>
{{/each}}
</table>
</body>
</html>
"#;

#[derive(Serialize)]
struct Page<'a> {
    duration: String,
    passes: u64,
    fails: u64,
    checks: Vec<CheckRow<'a>>,
    metrics: Vec<MetricRow<'a>>,
}

#[derive(Serialize)]
struct CheckRow<'a> {
    name: &'a str,
    passes: u64,
    fails: u64,
    class: &'static str,
}

#[derive(Serialize)]
struct MetricRow<'a> {
    name: &'a str,
    kind: &'static str,
    values: String,
}

/// `summary.html`: a standalone page with a table of checks and a table of metrics.
pub fn render_html(summary: &Summary) -> Result<String, RenderError> {
    let checks = &summary.root_group.checks;
    let page = Page {
        duration: format_millis(summary.state.test_run_duration_ms),
        passes: checks.iter().map(|c| c.passes).sum(),
        fails: checks.iter().map(|c| c.fails).sum(),
        checks: checks
            .iter()
            .map(|c| CheckRow {
                name: &c.name,
                passes: c.passes,
                fails: c.fails,
                class: if c.fails == 0 { "pass" } else { "fail" },
            })
            .collect(),
        metrics: summary
            .metrics
            .iter()
            .map(|(name, metric)| MetricRow {
                name,
                kind: kind_name(metric.kind),
                values: metric_values(metric),
            })
            .collect(),
    };

    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.render_template(TEMPLATE, &page)
}

fn metric_values(metric: &Metric) -> String {
    metric
        .values
        .iter()
        .map(|(key, value)| match (metric.kind, metric.contains) {
            (MetricKind::Trend, ValueKind::Time) => format!("{key}={}", format_millis(*value)),
            _ => format!("{key}={}", (value * 1e3).round() / 1e3),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn kind_name(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Counter => "counter",
        MetricKind::Gauge => "gauge",
        MetricKind::Rate => "rate",
        MetricKind::Trend => "trend",
    }
}
