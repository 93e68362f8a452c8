use pdatastructs::tdigest::{TDigest, K1};
use std::collections::BTreeMap;
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Running min/max/avg plus approximate quantiles for a stream of durations.
#[derive(Debug, Clone)]
pub struct Trend {
    count: u64,
    sum: Duration,
    min: Duration,
    max: Duration,
    digest: TDigest<K1>,
}

impl Trend {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            digest: default_tdigest(),
        }
    }

    pub fn insert(&mut self, value: Duration) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.digest.insert(value.as_secs_f64());
    }

    pub fn extend(&mut self, values: &[Duration]) {
        for value in values {
            self.insert(*value);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn avg(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.sum / count,
            Err(_) => Duration::from_secs_f64(self.sum.as_secs_f64() / self.count as f64),
        }
    }

    pub fn min(&self) -> Duration {
        if self.is_empty() {
            Duration::ZERO
        } else {
            self.min
        }
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn quantile(&self, quantile: f64) -> Duration {
        if self.is_empty() {
            return Duration::ZERO;
        }

        // NOTE: TDigest can return NaN for tiny inputs.
        let secs = self.digest.quantile(quantile);
        let secs = if secs.is_finite() {
            secs.clamp(self.min.as_secs_f64(), self.max.as_secs_f64())
        } else {
            self.avg().as_secs_f64()
        };

        Duration::from_secs_f64(secs)
    }

    /// Summary values in milliseconds, keyed the way reports print them.
    pub fn values(&self) -> BTreeMap<String, f64> {
        [
            ("avg", self.avg()),
            ("min", self.min()),
            ("med", self.quantile(0.5)),
            ("max", self.max()),
            ("p(90)", self.quantile(0.9)),
            ("p(95)", self.quantile(0.95)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.as_secs_f64() * 1e3))
        .collect()
    }
}

impl Default for Trend {
    fn default() -> Self {
        Self::new()
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
