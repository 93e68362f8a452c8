use super::vu_pool::VuPool;
use booker_core::{RunStatistics, Stage, TICK_INTERVAL};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Piecewise-linear VU target over time.
#[derive(Debug, Clone)]
pub(crate) struct RampSchedule {
    start_vus: usize,
    stages: Vec<Stage>,
}

impl RampSchedule {
    pub fn new(start_vus: usize, stages: &[Stage]) -> Self {
        Self {
            start_vus,
            stages: stages.to_vec(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Target VU count `elapsed` into the run, or `None` once every stage is over.
    pub fn target_at(&self, elapsed: Duration) -> Option<usize> {
        let mut from = self.start_vus;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                let target = from as f64 + delta * progress;
                return Some(target.round().max(0.) as usize);
            }
            from = stage.target;
            stage_start = stage_end;
        }

        None
    }

    /// Target of the last stage, held for one tick once every stage is over.
    pub fn final_target(&self) -> Option<usize> {
        self.stages.last().map(|s| s.target)
    }
}

pub(crate) async fn run<T, F>(
    name: &str,
    mut pool: VuPool<T>,
    schedule: RampSchedule,
    graceful_ramp_down: Duration,
) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let start = Instant::now();
    let mut ticks = tokio::time::interval(TICK_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(
        "Ramping over {} every {}",
        humantime::format_duration(schedule.total_duration()),
        humantime::format_duration(TICK_INTERVAL)
    );

    while let Some(target) = schedule.target_at(start.elapsed()) {
        if target != pool.concurrency() {
            trace!("VU target {} -> {target}", pool.concurrency());
            pool.set_concurrency(target);
        }
        ticks.tick().await;
    }

    // The last tick lands just short of the end, so a final ramp up would otherwise stop one
    // step below its target.
    if let Some(target) = schedule.final_target() {
        if target > pool.concurrency() {
            trace!("VU target {} -> {target}", pool.concurrency());
            pool.set_concurrency(target);
            ticks.tick().await;
        }
    }

    let vus_max = pool.vus_max();
    let iterations_before_stop = pool.iterations();
    debug!("Stages complete after {iterations_before_stop} iterations; stopping VUs");

    let iterations = pool.iteration_counter();
    let aborted_vus = pool.shutdown(graceful_ramp_down).await;
    if aborted_vus > 0 {
        warn!("{aborted_vus} VUs did not finish within the graceful ramp-down and were aborted");
    }

    RunStatistics {
        name: name.to_string(),
        iterations: iterations.load(std::sync::atomic::Ordering::Relaxed),
        vus_max,
        elapsed: start.elapsed(),
        aborted_vus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn interpolates_within_stage() {
        let schedule = RampSchedule::new(0, &[Stage::new(secs(10), 100)]);
        assert_eq!(schedule.target_at(Duration::ZERO), Some(0));
        assert_eq!(schedule.target_at(secs(5)), Some(50));
        assert_eq!(schedule.target_at(Duration::from_millis(9_900)), Some(99));
        assert_eq!(schedule.target_at(secs(10)), None);
    }

    #[test]
    fn default_stages() {
        let schedule = RampSchedule::new(0, &booker_core::DEFAULT_STAGES);
        assert_eq!(schedule.total_duration(), secs(70));
        assert_eq!(schedule.target_at(secs(1)), Some(10));
        assert_eq!(schedule.target_at(secs(10)), Some(100));
        assert_eq!(schedule.target_at(secs(39)), Some(100));
        assert_eq!(schedule.target_at(secs(55)), Some(50));
        assert_eq!(schedule.target_at(secs(69)), Some(3));
        assert_eq!(schedule.target_at(secs(70)), None);
    }

    #[test]
    fn starts_from_start_vus() {
        let schedule = RampSchedule::new(10, &[Stage::new(secs(10), 20)]);
        assert_eq!(schedule.target_at(Duration::ZERO), Some(10));
        assert_eq!(schedule.target_at(secs(5)), Some(15));
    }

    #[test]
    fn zero_length_stages_jump() {
        let schedule = RampSchedule::new(
            0,
            &[Stage::new(Duration::ZERO, 40), Stage::new(secs(10), 40)],
        );
        assert_eq!(schedule.target_at(Duration::ZERO), Some(40));
        assert_eq!(schedule.target_at(secs(3)), Some(40));

        let empty = RampSchedule::new(5, &[]);
        assert_eq!(empty.target_at(Duration::ZERO), None);
        assert_eq!(empty.final_target(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn final_ramp_up_reaches_target() {
        let registry = Arc::new(Registry::new());
        let pool = VuPool::new(
            || async { tokio::time::sleep(Duration::from_millis(5)).await },
            registry.clone(),
            None,
        );
        let schedule = RampSchedule::new(0, &[Stage::new(Duration::from_millis(450), 10)]);
        assert_eq!(schedule.final_target(), Some(10));

        let stats = run("ramp-up", pool, schedule, secs(1)).await;

        assert_eq!(stats.vus_max, 10);
        assert_eq!(stats.aborted_vus, 0);
        assert_eq!(registry.vus(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn runs_stages() {
        let registry = Arc::new(Registry::new());
        let counter = Arc::new(AtomicU64::new(0));
        let scenario = {
            let counter = counter.clone();
            move || {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        let pool = VuPool::new(scenario, registry.clone(), None);
        let schedule = RampSchedule::new(
            0,
            &[
                Stage::new(Duration::from_millis(300), 4),
                Stage::new(Duration::from_millis(300), 4),
                Stage::new(Duration::from_millis(300), 0),
            ],
        );

        let stats = run("ramp", pool, schedule, secs(1)).await;

        assert_eq!(stats.name, "ramp");
        assert_eq!(stats.vus_max, 4);
        assert_eq!(stats.aborted_vus, 0);
        assert!(stats.elapsed >= Duration::from_millis(900));
        assert!(stats.iterations > 0);
        assert_eq!(stats.iterations, counter.load(Ordering::Relaxed));
        assert_eq!(registry.vus(), 0);
    }
}
