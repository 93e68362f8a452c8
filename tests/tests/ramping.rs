mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use booker::booking::Exec;
    use booker::core::{ExecutorConfig, Stage};
    use booker::run::LoadTest;
    use mock_service::MockBooker;
    use std::num::NonZeroU32;
    use std::time::{Duration, Instant};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn ramps_up_and_down() -> anyhow::Result<()> {
        let service = MockBooker::builder().delay(Duration::from_millis(5)).build();
        let plan = with_scenario(
            mock(service).await?,
            "getBookings",
            Exec::FetchAll,
            ExecutorConfig::ramping(&[
                Stage::new(Duration::from_millis(500), 5),
                Stage::new(Duration::from_millis(500), 5),
                Stage::new(Duration::from_millis(500), 0),
            ]),
        );

        let start = Instant::now();
        let outcome = LoadTest::new(plan)?.run().await;
        let summary = &outcome.summary;

        assert!(start.elapsed() >= Duration::from_millis(1_500));
        assert_eq!(outcome.scenarios[0].vus_max, 5);
        assert_eq!(outcome.scenarios[0].aborted_vus, 0);
        assert_eq!(summary.value("vus_max", "value"), Some(5.));
        assert_eq!(summary.value("vus", "value"), Some(0.));

        let ok = summary.check("status is 200").unwrap();
        assert!(ok.passes > 0);
        assert_eq!(ok.fails, 0);
        assert_eq!(summary.value("http_req_failed", "rate"), Some(0.));
        assert!(summary.value("iterations", "count").unwrap() > 0.);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn max_rps_caps_the_request_rate() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let mut plan = with_scenario(
            mock(service.clone()).await?,
            "getBookings",
            Exec::FetchAll,
            ExecutorConfig::ramping(&[Stage::new(Duration::from_secs(1), 10)]),
        );
        for scenario in plan.scenarios.values_mut() {
            scenario.max_rps = NonZeroU32::new(20);
        }

        let start = Instant::now();
        let outcome = LoadTest::new(plan)?.run().await;
        let elapsed = start.elapsed().as_secs_f64();

        // VUs blocked on the limiter when the stage ends still finish during ramp-down.
        let reqs = outcome.summary.value("http_reqs", "count").unwrap();
        assert!(reqs > 0.);
        assert!(
            reqs <= 20. * elapsed + 1.,
            "{reqs} requests in {elapsed:.2}s"
        );
        Ok(())
    }

    #[cfg(feature = "integration")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    #[ntest::timeout(120_000)]
    async fn default_stages() -> anyhow::Result<()> {
        let service = MockBooker::builder().delay(Duration::from_millis(20)).build();
        let mut plan = mock(service).await?;
        plan = with_scenario(
            plan,
            "default",
            Exec::FetchAll,
            ExecutorConfig::default(),
        );

        let outcome = LoadTest::new(plan)?.run().await;

        assert_eq!(outcome.scenarios[0].vus_max, 100);
        assert_eq!(outcome.summary.check("status is 200").unwrap().fails, 0);
        Ok(())
    }
}
