use crate::registry::Registry;
use booker_core::TransactionLabels;
use governor::DefaultDirectRateLimiter;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Lets a successful transaction value mark itself as a failed request (e.g. a 5xx response).
pub trait TransactionOutcome {
    fn is_failure(&self) -> bool;
}

impl TransactionOutcome for () {
    fn is_failure(&self) -> bool {
        false
    }
}

/// Transaction hook used by the `#[transaction]` macro. Not intended to be used manually.
pub async fn transaction_hook<T, R, E>(labels: TransactionLabels, func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
    R: TransactionOutcome,
{
    if let Ok(hook) = TRANSACTION_HOOK.try_with(|v| v.clone()) {
        if let Some(limiter) = &hook.limiter {
            limiter.until_ready().await;
        }

        let start = Instant::now();
        let res = func.await;
        let elapsed = start.elapsed();

        let failed = match &res {
            Ok(value) => value.is_failure(),
            Err(_) => true,
        };
        hook.registry.record_request(elapsed, failed);

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!(labels.latency).record(elapsed.as_secs_f64());
            if failed {
                metrics::counter!(labels.error).increment(1);
            } else {
                metrics::counter!(labels.success).increment(1);
            }
        }

        tracing::trace!(transaction = labels.name, vu = hook.vu, ?elapsed, failed);

        res
    } else {
        tracing::warn!(transaction = labels.name, "No hook available.");
        func.await
    }
}

/// Per-VU state threaded through every transaction and check.
#[derive(Clone)]
pub(crate) struct TransactionData {
    pub vu: u64,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub registry: Arc<Registry>,
}

tokio::task_local! {
    pub(crate) static TRANSACTION_HOOK: TransactionData;
}

/// Id of the VU running the current task, starting at 1. `None` outside a scenario.
pub fn current_vu() -> Option<u64> {
    TRANSACTION_HOOK.try_with(|hook| hook.vu).ok()
}

/// Run `fut` outside any VU (e.g. setup or teardown) while still recording its requests and
/// checks in `registry`. Such work reports itself as VU `0`.
pub async fn within<F: Future>(registry: Arc<Registry>, fut: F) -> F::Output {
    within_vu(0, registry, fut).await
}

pub(crate) async fn within_vu<F: Future>(vu: u64, registry: Arc<Registry>, fut: F) -> F::Output {
    let data = TransactionData {
        vu,
        limiter: None,
        registry,
    };
    TRANSACTION_HOOK.scope(data, fut).await
}
