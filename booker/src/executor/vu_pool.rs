use crate::registry::Registry;
use crate::transaction::{TransactionData, TRANSACTION_HOOK};
use governor::DefaultDirectRateLimiter;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// A set of VUs, each a tokio task running the scenario in a loop.
///
/// Lowering the concurrency never cancels a VU mid-iteration: it is flagged to stop and finishes
/// its current iteration in the background.
pub(crate) struct VuPool<T> {
    scenario: T,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    registry: Arc<Registry>,
    budget: Option<Arc<IterationBudget>>,
    active: Vec<Vu>,
    retiring: Vec<Vu>,
    iterations: Arc<AtomicU64>,
    vus_max: usize,
}

struct Vu {
    id: u64,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl<T, F> VuPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    pub fn new(
        scenario: T,
        registry: Arc<Registry>,
        limiter: Option<Arc<DefaultDirectRateLimiter>>,
    ) -> Self {
        Self {
            scenario,
            limiter,
            registry,
            budget: None,
            active: vec![],
            retiring: vec![],
            iterations: Arc::new(AtomicU64::new(0)),
            vus_max: 0,
        }
    }

    /// VUs stop once `iterations` iterations have been started across the whole pool.
    pub fn with_budget(mut self, iterations: u64) -> Self {
        self.budget = Some(Arc::new(IterationBudget::new(iterations)));
        self
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.reap();

        if self.active.len() > concurrency {
            for vu in self.active.drain(concurrency..) {
                trace!("Stopping VU {}", vu.id);
                vu.stop.store(true, Ordering::Relaxed);
                self.retiring.push(vu);
            }
        } else {
            while self.active.len() < concurrency {
                let vu = self.spawn();
                trace!("Started VU {}", vu.id);
                self.active.push(vu);
            }
            self.vus_max = self.vus_max.max(concurrency);
        }
    }

    fn spawn(&self) -> Vu {
        let id = self.registry.next_vu_id();
        let stop = Arc::new(AtomicBool::new(false));
        let scenario = self.scenario.clone();
        let registry = self.registry.clone();
        let budget = self.budget.clone();
        let iterations = self.iterations.clone();
        let task_stop = stop.clone();

        let data = TransactionData {
            vu: id,
            limiter: self.limiter.clone(),
            registry: self.registry.clone(),
        };

        let handle = tokio::spawn(TRANSACTION_HOOK.scope(data, async move {
            let _guard = VuGuard::new(registry.clone());

            while !task_stop.load(Ordering::Relaxed) {
                if let Some(budget) = &budget {
                    if !budget.take() {
                        break;
                    }
                }

                let start = Instant::now();
                scenario().await;
                registry.record_iteration(start.elapsed());
                iterations.fetch_add(1, Ordering::Relaxed);

                // NOTE: A scenario which never awaits anything pending would otherwise starve
                // the executor's timer.
                tokio::task::yield_now().await;
            }
        }));

        Vu { id, stop, handle }
    }

    /// Drop VUs which have finished on their own.
    fn reap(&mut self) {
        self.retiring.retain(|vu| !vu.handle.is_finished());
    }

    pub fn concurrency(&self) -> usize {
        self.active.len()
    }

    pub fn vus_max(&self) -> usize {
        self.vus_max
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Completed iterations, still readable after the pool is consumed by `finish`/`shutdown`.
    pub fn iteration_counter(&self) -> Arc<AtomicU64> {
        self.iterations.clone()
    }

    /// Wait for every VU to exit on its own; VUs still running at `deadline` are aborted.
    /// Returns the number of aborted VUs.
    pub async fn finish(mut self, deadline: tokio::time::Instant) -> usize {
        let mut aborted = 0;
        for mut vu in self.active.drain(..).chain(self.retiring.drain(..)) {
            match tokio::time::timeout_at(deadline, &mut vu.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_panic() => error!("VU {} panicked: {err}", vu.id),
                Ok(Err(_)) => {}
                Err(_) => {
                    debug!("Aborting VU {}", vu.id);
                    vu.handle.abort();
                    aborted += 1;
                }
            }
        }
        aborted
    }

    /// Ask every VU to stop after its current iteration, aborting those still running after
    /// `grace`.
    pub async fn shutdown(self, grace: std::time::Duration) -> usize {
        for vu in self.active.iter().chain(self.retiring.iter()) {
            vu.stop.store(true, Ordering::Relaxed);
        }
        self.finish(tokio::time::Instant::now() + grace).await
    }
}

/// Keeps the registry's live VU gauge accurate however the VU task ends, including abort.
struct VuGuard(Arc<Registry>);

impl VuGuard {
    fn new(registry: Arc<Registry>) -> Self {
        registry.vu_started();
        Self(registry)
    }
}

impl Drop for VuGuard {
    fn drop(&mut self) {
        self.0.vu_stopped();
    }
}

pub(crate) struct IterationBudget {
    remaining: AtomicU64,
}

impl IterationBudget {
    pub fn new(iterations: u64) -> Self {
        Self {
            remaining: AtomicU64::new(iterations),
        }
    }

    /// Claim one iteration; `false` once the budget is spent.
    pub fn take(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleepy_scenario(
        counter: Arc<AtomicU64>,
        delay: Duration,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Clone + Send + Sync
    {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                counter.fetch_add(1, Ordering::Relaxed);
            })
        }
    }

    #[test]
    fn budget_is_exact() {
        let budget = IterationBudget::new(3);
        assert!(budget.take());
        assert!(budget.take());
        assert!(budget.take());
        assert!(!budget.take());
        assert!(!budget.take());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn scales_up_and_down() {
        let registry = Arc::new(Registry::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut pool = VuPool::new(
            sleepy_scenario(counter.clone(), Duration::from_millis(5)),
            registry.clone(),
            None,
        );

        pool.set_concurrency(4);
        assert_eq!(pool.concurrency(), 4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.vus(), 4);

        pool.set_concurrency(1);
        assert_eq!(pool.concurrency(), 1);
        assert_eq!(pool.vus_max(), 4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.vus(), 1);

        let aborted = pool.shutdown(Duration::from_secs(1)).await;
        assert_eq!(aborted, 0);
        assert!(counter.load(Ordering::Relaxed) > 0);
        assert_eq!(registry.vus(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn stopped_vus_finish_their_iteration() {
        let registry = Arc::new(Registry::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut pool = VuPool::new(
            sleepy_scenario(counter.clone(), Duration::from_millis(200)),
            registry.clone(),
            None,
        );

        pool.set_concurrency(2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let aborted = pool.shutdown(Duration::from_secs(2)).await;

        assert_eq!(aborted, 0);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert_eq!(registry.iterations(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn slow_vus_are_aborted_after_grace() {
        let registry = Arc::new(Registry::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut pool = VuPool::new(
            sleepy_scenario(counter.clone(), Duration::from_secs(10)),
            registry.clone(),
            None,
        );

        pool.set_concurrency(3);
        // Let every VU get into its first iteration.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.vus(), 3);
        let aborted = pool.shutdown(Duration::from_millis(50)).await;

        assert_eq!(aborted, 3);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(5_000)]
    async fn budget_limits_iterations() {
        let registry = Arc::new(Registry::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut pool = VuPool::new(
            sleepy_scenario(counter.clone(), Duration::from_millis(1)),
            registry.clone(),
            None,
        )
        .with_budget(25);

        pool.set_concurrency(4);
        let aborted = pool
            .finish(tokio::time::Instant::now() + Duration::from_secs(3))
            .await;

        assert_eq!(aborted, 0);
        assert_eq!(counter.load(Ordering::Relaxed), 25);
    }
}
