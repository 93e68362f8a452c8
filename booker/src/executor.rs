//! VU executors.
//!
//! An executor decides how many VUs run a scenario and for how long. Each VU is a tokio task
//! which calls the scenario function in a loop, with the run's [`Registry`] and rate limiter
//! available to every transaction through a task-local.
mod ramping;
mod shared_iterations;
mod vu_pool;

use crate::registry::Registry;
use booker_core::{ExecutorConfig, RunStatistics, ScenarioConfig};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use vu_pool::VuPool;

pub(crate) async fn run_executor<T, F>(
    scenario: T,
    config: &ScenarioConfig,
    registry: Arc<Registry>,
) -> RunStatistics
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let limiter = config.max_rps.map(|rps| Arc::new(rate_limiter(rps)));
    let pool = VuPool::new(scenario, registry, limiter);

    match &config.executor {
        ExecutorConfig::RampingVus {
            start_vus,
            stages,
            graceful_ramp_down,
        } => {
            let schedule = ramping::RampSchedule::new(*start_vus, stages);
            ramping::run(&config.name, pool, schedule, *graceful_ramp_down).await
        }
        ExecutorConfig::SharedIterations {
            vus,
            iterations,
            max_duration,
        } => shared_iterations::run(&config.name, pool, *vus, *iterations, *max_duration).await,
    }
}

fn rate_limiter(max_rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(max_rps).allow_burst(NonZeroU32::MIN))
}
