use booker::booking::{Exec, PoolScope};
use booker::core::ExecutorConfig;
use booker::plan::{PlannedScenario, RunPlan};
use mock_service::MockBooker;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_env_filter("booker=debug,mock_service=info")
            .with_test_writer()
            .init();
    });
}

/// Start a mock booking service on an ephemeral port and a plan pointed at it.
#[allow(unused)]
pub async fn mock(state: MockBooker) -> anyhow::Result<RunPlan> {
    init();
    let addr = mock_service::spawn(state).await?;

    Ok(RunPlan {
        base_url: format!("http://{addr}"),
        timeout: Duration::from_secs(5),
        scenarios: Default::default(),
        ..Default::default()
    })
}

#[allow(unused)]
pub fn with_scenario(
    mut plan: RunPlan,
    name: &str,
    exec: Exec,
    executor: ExecutorConfig,
) -> RunPlan {
    plan.scenarios
        .insert(name.to_string(), PlannedScenario::new(exec, executor));
    plan
}

#[allow(unused)]
pub fn per_vu(mut plan: RunPlan) -> RunPlan {
    plan.pool_scope = PoolScope::PerVu;
    plan
}
