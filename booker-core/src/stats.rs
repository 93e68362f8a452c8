use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Statistics for a single scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub name: String,
    pub iterations: u64,
    pub vus_max: usize,
    pub elapsed: Duration,
    /// VUs that were still busy when their grace period ran out.
    pub aborted_vus: usize,
}

/// End of test summary.
///
/// The layout follows the JSON summary format used by k6 so existing tooling can read
/// `summary.json` unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub root_group: Group,
    pub metrics: BTreeMap<String, Metric>,
    pub state: RunState,
}

impl Summary {
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn value(&self, metric: &str, key: &str) -> Option<f64> {
        self.metric(metric)?.values.get(key).copied()
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.root_group.checks.iter().find(|c| c.name == name)
    }

    pub fn test_run_duration(&self) -> Duration {
        Duration::from_secs_f64(self.state.test_run_duration_ms.max(0.) / 1e3)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub is_std_out_tty: bool,
    pub is_std_err_tty: bool,
    pub test_run_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub path: String,
    pub id: String,
    pub groups: Vec<Group>,
    pub checks: Vec<CheckSummary>,
}

impl Group {
    pub fn root(checks: Vec<CheckSummary>) -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            id: stable_id(""),
            groups: vec![],
            checks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub path: String,
    pub id: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn new(name: &str, passes: u64, fails: u64) -> Self {
        let path = format!("::{name}");
        Self {
            name: name.to_string(),
            id: stable_id(&path),
            path,
            passes,
            fails,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let total = self.passes + self.fails;
        if total == 0 {
            0.
        } else {
            self.passes as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub contains: ValueKind,
    pub values: BTreeMap<String, f64>,
}

impl Metric {
    pub fn new(kind: MetricKind, contains: ValueKind, values: BTreeMap<String, f64>) -> Self {
        Self {
            kind,
            contains,
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Default,
    Time,
}

/// Hex md5 of a group or check path, the id k6 gives the same path.
fn stable_id(path: &str) -> String {
    format!("{:x}", md5::compute(path))
}
