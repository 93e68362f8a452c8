//! Run-wide metric registry.
//!
//! Every VU of every scenario in a run records into the same [`Registry`]. Hot-path recording is
//! lock-free apart from checks, whose names are kept in first-seen order.
use booker_core::{
    CheckSummary, Group, Metric, MetricKind, RunState, Summary, Trend, ValueKind,
};
use metrics_util::AtomicBucket;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub struct Registry {
    started: Instant,
    next_vu: AtomicU64,
    http_reqs: AtomicU64,
    http_req_failed: AtomicU64,
    http_req_duration: AtomicBucket<Duration>,
    iterations: AtomicU64,
    iteration_duration: AtomicBucket<Duration>,
    vus: AtomicUsize,
    vus_min: AtomicUsize,
    vus_max: AtomicUsize,
    checks: Mutex<Vec<CheckCount>>,
}

#[derive(Debug, Clone)]
struct CheckCount {
    name: String,
    passes: u64,
    fails: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            next_vu: AtomicU64::new(1),
            http_reqs: AtomicU64::new(0),
            http_req_failed: AtomicU64::new(0),
            http_req_duration: AtomicBucket::new(),
            iterations: AtomicU64::new(0),
            iteration_duration: AtomicBucket::new(),
            vus: AtomicUsize::new(0),
            vus_min: AtomicUsize::new(usize::MAX),
            vus_max: AtomicUsize::new(0),
            checks: Mutex::new(vec![]),
        }
    }

    /// Hands out VU ids, unique across all scenarios of the run.
    pub(crate) fn next_vu_id(&self) -> u64 {
        self.next_vu.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_request(&self, elapsed: Duration, failed: bool) {
        self.http_reqs.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.http_req_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.http_req_duration.push(elapsed);
    }

    pub fn record_iteration(&self, elapsed: Duration) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.iteration_duration.push(elapsed);
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let mut checks = self.checks.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = match checks.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                checks.push(CheckCount {
                    name: name.to_string(),
                    passes: 0,
                    fails: 0,
                });
                checks.len() - 1
            }
        };

        if passed {
            checks[idx].passes += 1;
        } else {
            checks[idx].fails += 1;
        }
    }

    pub(crate) fn vu_started(&self) {
        let vus = self.vus.fetch_add(1, Ordering::Relaxed) + 1;
        self.vus_max.fetch_max(vus, Ordering::Relaxed);
        self.vus_min.fetch_min(vus, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::gauge!("booker_vus").set(vus as f64);
    }

    pub(crate) fn vu_stopped(&self) {
        let vus = self.vus.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        self.vus_min.fetch_min(vus, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        metrics::gauge!("booker_vus").set(vus as f64);
    }

    pub fn vus(&self) -> usize {
        self.vus.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Snapshot of everything recorded so far.
    pub fn summary(&self) -> Summary {
        let elapsed = self.elapsed();
        let secs = elapsed.as_secs_f64().max(f64::EPSILON);
        let mut metrics = BTreeMap::new();

        let http_reqs = self.http_reqs.load(Ordering::Relaxed);
        if http_reqs > 0 {
            metrics.insert("http_reqs".to_string(), counter(http_reqs, secs));

            let failed = self.http_req_failed.load(Ordering::Relaxed);
            metrics.insert(
                "http_req_failed".to_string(),
                rate(failed, http_reqs - failed),
            );
            metrics.insert(
                "http_req_duration".to_string(),
                trend(&self.http_req_duration),
            );
        }

        metrics.insert(
            "iterations".to_string(),
            counter(self.iterations(), secs),
        );
        if !self.iteration_duration.is_empty() {
            metrics.insert(
                "iteration_duration".to_string(),
                trend(&self.iteration_duration),
            );
        }

        let vus_max = self.vus_max.load(Ordering::Relaxed);
        let vus_min = match self.vus_min.load(Ordering::Relaxed) {
            usize::MAX => 0,
            min => min,
        };
        metrics.insert(
            "vus".to_string(),
            gauge(self.vus() as f64, vus_min as f64, vus_max as f64),
        );
        metrics.insert(
            "vus_max".to_string(),
            gauge(vus_max as f64, vus_max as f64, vus_max as f64),
        );

        let checks: Vec<CheckSummary> = self
            .checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| CheckSummary::new(&c.name, c.passes, c.fails))
            .collect();

        if !checks.is_empty() {
            let passes = checks.iter().map(|c| c.passes).sum();
            let fails = checks.iter().map(|c| c.fails).sum();
            metrics.insert("checks".to_string(), rate(passes, fails));
        }

        Summary {
            root_group: Group::root(checks),
            metrics,
            state: RunState {
                is_std_out_tty: std::io::stdout().is_terminal(),
                is_std_err_tty: std::io::stderr().is_terminal(),
                test_run_duration_ms: elapsed.as_secs_f64() * 1e3,
            },
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(count: u64, secs: f64) -> Metric {
    Metric::new(
        MetricKind::Counter,
        ValueKind::Default,
        values([("count", count as f64), ("rate", count as f64 / secs)]),
    )
}

/// `passes` counts the samples that were true, whatever "true" means for the metric.
fn rate(passes: u64, fails: u64) -> Metric {
    let total = passes + fails;
    let rate = if total == 0 {
        0.
    } else {
        passes as f64 / total as f64
    };

    Metric::new(
        MetricKind::Rate,
        ValueKind::Default,
        values([
            ("rate", rate),
            ("passes", passes as f64),
            ("fails", fails as f64),
        ]),
    )
}

fn gauge(value: f64, min: f64, max: f64) -> Metric {
    Metric::new(
        MetricKind::Gauge,
        ValueKind::Default,
        values([("value", value), ("min", min), ("max", max)]),
    )
}

fn trend(bucket: &AtomicBucket<Duration>) -> Metric {
    let mut trend = Trend::new();
    trend.extend(&bucket.data());
    Metric::new(MetricKind::Trend, ValueKind::Time, trend.values())
}

fn values<const N: usize>(pairs: [(&str, f64); N]) -> BTreeMap<String, f64> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
