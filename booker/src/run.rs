//! Runs every scenario of a [`RunPlan`] against the booking API.
use crate::booking::{BookingContext, HttpTransport, Teardown, Transport, TransportError};
use crate::plan::{PlanError, RunPlan};
use crate::registry::Registry;
use crate::scenario::{ConfigurableScenario, Scenario};
use crate::transaction::within;
use booker_core::{RunStatistics, Summary};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// What a finished run hands back for reporting.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: Summary,
    pub scenarios: Vec<RunStatistics>,
    pub teardown: Teardown,
}

/// A load test run: every scenario of the plan, started together and sharing one registry and
/// one set of pending bookings.
///
/// # Example
///
/// ```no_run
/// use booker::plan::RunPlan;
/// use booker::run::LoadTest;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let outcome = LoadTest::new(RunPlan::default())?.run().await;
///     println!("{} iterations", outcome.scenarios[0].iterations);
///     Ok(())
/// }
/// ```
pub struct LoadTest<T> {
    plan: RunPlan,
    transport: T,
}

impl LoadTest<HttpTransport> {
    pub fn new(plan: RunPlan) -> Result<Self, RunError> {
        plan.validate()?;
        let transport = HttpTransport::new(plan.base_url()?, plan.timeout)?;
        Ok(Self { plan, transport })
    }
}

impl<T> LoadTest<T>
where
    T: Transport + Sync + 'static,
{
    /// Run against `transport` instead of the service named by the plan's base URL.
    pub fn with_transport(plan: RunPlan, transport: T) -> Self {
        Self { plan, transport }
    }

    #[instrument(name = "booker", skip_all, fields(base_url = %self.plan.base_url))]
    pub async fn run(self) -> RunOutcome {
        let LoadTest { plan, transport } = self;
        let registry = Arc::new(Registry::new());
        let context = BookingContext::new(transport, plan.credentials.clone(), plan.pool_scope);

        let configs = plan.scenario_configs();
        info!(
            "Starting {} scenarios on up to {} VUs with {:?} pending bookings",
            configs.len(),
            configs
                .iter()
                .map(|(config, _)| config.executor.max_vus())
                .sum::<usize>(),
            plan.pool_scope
        );

        let scenarios = configs.into_iter().map(|(config, exec)| {
            let context = context.clone();
            let func = move || {
                let context = context.clone();
                async move { context.run(exec).await }
            };

            Scenario::new(&config.name, func)
                .with_config(config)
                .with_registry(registry.clone())
        });
        let scenarios = join_all(scenarios).await;

        for stats in &scenarios {
            if stats.aborted_vus > 0 {
                warn!(
                    "Scenario {} aborted {} VUs still running at the end",
                    stats.name, stats.aborted_vus
                );
            }
        }

        let teardown = within(registry.clone(), context.teardown(plan.cleanup)).await;
        if teardown.deleted < teardown.leftover && plan.cleanup {
            warn!(
                "{} of {} pending bookings could not be deleted",
                teardown.leftover - teardown.deleted,
                teardown.leftover
            );
        }

        let summary = registry.summary();
        info!(
            "Run complete in {}",
            humantime::format_duration(std::time::Duration::from_millis(
                summary.test_run_duration().as_millis() as u64
            ))
        );

        RunOutcome {
            summary,
            scenarios,
            teardown,
        }
    }
}
