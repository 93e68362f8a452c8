//! Scenario logic and constants
use crate::executor::run_executor;
use crate::registry::Registry;
use booker_core::{ExecutorConfig, RunStatistics, ScenarioConfig, Stage};
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Load test scenario structure
///
/// Wraps a scenario function (called once per VU iteration) together with its executor
/// configuration. Awaiting a `Scenario` runs it to completion.
///
/// # Example
/// ```no_run
/// use booker::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     Scenario::new("fetch", || async { /* one iteration */ })
///         .stages(&[Stage::new(Duration::from_secs(10), 20)])
///         .await;
/// }
/// ```
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = RunStatistics> + Send>>>,
    config: ScenarioConfig,
    registry: Arc<Registry>,
}

impl<T> Scenario<T> {
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = RunStatistics;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let func = self.func.clone();
            let config = self.config.clone();
            let registry = self.registry.clone();
            self.runner_fut = Some(Box::pin(async move {
                run_scenario(func, config, registry).await
            }));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn stages(self, stages: &[Stage]) -> Self;
    fn start_vus(self, vus: usize) -> Self;
    fn graceful_ramp_down(self, grace: Duration) -> Self;
    fn shared_iterations(self, vus: usize, iterations: u64) -> Self;
    fn max_duration(self, duration: Duration) -> Self;
    fn max_rps(self, rps: NonZeroU32) -> Self;
    fn with_config(self, config: ScenarioConfig) -> Self;
    fn with_registry(self, registry: Arc<Registry>) -> Self;
}

impl<T, F> ConfigurableScenario<RunStatistics> for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send + 'static,
{
    /// Ramp VUs through the given stages (the `ramping-vus` executor).
    ///
    /// # Example
    /// ```no_run
    /// use booker::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     Scenario::new("fetch", || async {})
    ///         .stages(&[
    ///             Stage::new(Duration::from_secs(10), 100),
    ///             Stage::new(Duration::from_secs(30), 100),
    ///             Stage::new(Duration::from_secs(30), 0),
    ///         ])
    ///         .await;
    /// }
    /// ```
    fn stages(mut self, stages: &[Stage]) -> Self {
        match &mut self.config.executor {
            ExecutorConfig::RampingVus { stages: s, .. } => *s = stages.to_vec(),
            executor => *executor = ExecutorConfig::ramping(stages),
        }
        self
    }

    /// VUs running when the first stage starts. Only applies to `ramping-vus`.
    fn start_vus(mut self, vus: usize) -> Self {
        if let ExecutorConfig::RampingVus { start_vus, .. } = &mut self.config.executor {
            *start_vus = vus;
        }
        self
    }

    /// How long VUs may finish their iteration after the last stage. Only applies to
    /// `ramping-vus`.
    fn graceful_ramp_down(mut self, grace: Duration) -> Self {
        if let ExecutorConfig::RampingVus {
            graceful_ramp_down, ..
        } = &mut self.config.executor
        {
            *graceful_ramp_down = grace;
        }
        self
    }

    /// Split a fixed number of iterations across a fixed number of VUs.
    ///
    /// # Example
    /// ```no_run
    /// use booker::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     Scenario::new("delete", || async {})
    ///         .shared_iterations(10, 10)
    ///         .await;
    /// }
    /// ```
    fn shared_iterations(mut self, vus: usize, iterations: u64) -> Self {
        self.config.executor = ExecutorConfig::shared_iterations(vus, iterations);
        self
    }

    /// Upper bound for `shared-iterations`.
    fn max_duration(mut self, duration: Duration) -> Self {
        if let ExecutorConfig::SharedIterations { max_duration, .. } =
            &mut self.config.executor
        {
            *max_duration = duration;
        }
        self
    }

    /// Cap the request rate across every VU of the scenario.
    fn max_rps(mut self, rps: NonZeroU32) -> Self {
        self.config.max_rps = Some(rps);
        self
    }

    fn with_config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }

    /// Record into a shared registry, e.g. to summarize several scenarios together.
    fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F>(
    scenario: T,
    config: ScenarioConfig,
    registry: Arc<Registry>,
) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    info!("Running {} with config {:?}", config.name, &config);

    let stats = run_executor(scenario, &config, registry).await;

    info!(
        "Scenario complete: {} iterations in {} (max {} VUs)",
        stats.iterations,
        humantime::format_duration(Duration::from_millis(stats.elapsed.as_millis() as u64)),
        stats.vus_max
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn builder_switches_executors() {
        let scenario = Scenario::new("a", || async {}).shared_iterations(3, 9);
        assert_eq!(
            scenario.config().executor,
            ExecutorConfig::shared_iterations(3, 9)
        );

        let stages = [Stage::new(Duration::from_secs(1), 2)];
        let scenario = scenario.stages(&stages).start_vus(1);
        match &scenario.config().executor {
            ExecutorConfig::RampingVus {
                start_vus, stages, ..
            } => {
                assert_eq!(*start_vus, 1);
                assert_eq!(stages.len(), 1);
            }
            _ => panic!("Expected ramping-vus"),
        }
    }

    #[test]
    fn defaults_to_default_stages() {
        let scenario = Scenario::new("a", || async {});
        assert_eq!(scenario.config().name, "a");
        assert_eq!(scenario.config().executor, ExecutorConfig::default());
        assert_eq!(scenario.config().max_rps, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn awaiting_runs_the_scenario() {
        let counter = Arc::new(AtomicU64::new(0));
        let registry = Arc::new(Registry::new());
        let func = {
            let counter = counter.clone();
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        let stats = Scenario::new("count", func)
            .shared_iterations(2, 12)
            .with_registry(registry.clone())
            .await;

        assert_eq!(stats.name, "count");
        assert_eq!(stats.iterations, 12);
        assert_eq!(counter.load(Ordering::Relaxed), 12);
        assert_eq!(registry.summary().value("iterations", "count"), Some(12.));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn max_rps_limits_requests() {
        use crate::transaction::transaction_hook;
        use booker_core::TransactionLabels;

        let labels = TransactionLabels {
            name: "noop",
            success: "noop_success",
            error: "noop_error",
            latency: "noop_latency",
        };
        let registry = Arc::new(Registry::new());
        let func = move || async move {
            let _ = transaction_hook::<_, (), ()>(labels, async { Ok(()) }).await;
        };

        let start = std::time::Instant::now();
        let stats = Scenario::new("limited", func)
            .shared_iterations(4, 10)
            .max_rps(NonZeroU32::new(20).unwrap())
            .with_registry(registry.clone())
            .await;

        assert_eq!(stats.iterations, 10);
        // 10 requests at 20/s with a burst of one need at least 9 intervals of 50ms.
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(registry.summary().value("http_reqs", "count"), Some(10.));
    }
}
