use super::vu_pool::VuPool;
use booker_core::RunStatistics;
use std::future::Future;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Run `iterations` iterations split across `vus` VUs; whichever VU is free picks up the next one.
pub(crate) async fn run<T, F>(
    name: &str,
    pool: VuPool<T>,
    vus: usize,
    iterations: u64,
    max_duration: Duration,
) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let start = Instant::now();
    let mut pool = pool.with_budget(iterations);

    // No point starting VUs which could never claim an iteration.
    let vus = vus.min(usize::try_from(iterations).unwrap_or(usize::MAX));
    pool.set_concurrency(vus);
    debug!("Running {iterations} iterations on {vus} VUs");

    let vus_max = pool.vus_max();
    let counter = pool.iteration_counter();
    let aborted_vus = pool
        .finish(tokio::time::Instant::now() + max_duration)
        .await;
    if aborted_vus > 0 {
        warn!(
            "{aborted_vus} VUs were still running after {}; aborted",
            humantime::format_duration(max_duration)
        );
    }

    RunStatistics {
        name: name.to_string(),
        iterations: counter.load(std::sync::atomic::Ordering::Relaxed),
        vus_max,
        elapsed: start.elapsed(),
        aborted_vus,
    }
}
