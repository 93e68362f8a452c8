mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use booker::booking::{Exec, Teardown, PENDING_BOOKING_CHECK};
    use booker::core::ExecutorConfig;
    use booker::run::LoadTest;
    use mock_service::MockBooker;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn lifecycle_leaves_nothing_behind() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let plan = per_vu(with_scenario(
            mock(service.clone()).await?,
            "lifecycle",
            Exec::Lifecycle,
            ExecutorConfig::shared_iterations(4, 20),
        ));

        let outcome = LoadTest::new(plan)?.run().await;
        let summary = &outcome.summary;

        assert_eq!(outcome.scenarios[0].iterations, 20);
        let ok = summary.check("status is 200").unwrap();
        assert_eq!((ok.passes, ok.fails), (40, 0));
        let deleted = summary.check("status is 201").unwrap();
        assert_eq!((deleted.passes, deleted.fails), (20, 0));
        assert_eq!(summary.check(PENDING_BOOKING_CHECK).unwrap().fails, 0);

        // create, auth, update and delete per iteration
        assert_eq!(summary.value("http_reqs", "count"), Some(80.));
        assert_eq!(summary.value("http_req_failed", "passes"), Some(0.));

        assert_eq!(outcome.teardown, Teardown::default());
        assert_eq!(service.booking_count(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn cleanup_deletes_created_bookings() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let mut plan = with_scenario(
            mock(service.clone()).await?,
            "create",
            Exec::Create,
            ExecutorConfig::shared_iterations(5, 25),
        );
        plan.cleanup = true;

        let outcome = LoadTest::new(plan)?.run().await;

        let created = outcome.summary.check("status is 200").unwrap();
        assert_eq!((created.passes, created.fails), (25, 0));
        assert_eq!(
            outcome.teardown,
            Teardown {
                leftover: 25,
                deleted: 25
            }
        );
        assert_eq!(service.booking_count(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn leftovers_stay_without_cleanup() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let plan = with_scenario(
            mock(service.clone()).await?,
            "create",
            Exec::Create,
            ExecutorConfig::shared_iterations(2, 6),
        );

        let outcome = LoadTest::new(plan)?.run().await;

        assert_eq!(outcome.teardown.leftover, 6);
        assert_eq!(outcome.teardown.deleted, 0);
        assert_eq!(service.booking_count(), 6);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn delete_without_bookings_sends_nothing() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let plan = with_scenario(
            mock(service.clone()).await?,
            "delete",
            Exec::Delete,
            ExecutorConfig::shared_iterations(2, 4),
        );

        let outcome = LoadTest::new(plan)?.run().await;
        let summary = &outcome.summary;

        let pending = summary.check(PENDING_BOOKING_CHECK).unwrap();
        assert_eq!((pending.passes, pending.fails), (0, 4));
        assert!(summary.check("status is 201").is_none());
        assert!(summary.metric("http_reqs").is_none());
        assert_eq!(summary.value("iterations", "count"), Some(4.));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn rejected_credentials_skip_updates() -> anyhow::Result<()> {
        let service = MockBooker::builder()
            .credentials("admin", "something-else")
            .build();
        let mut plan = with_scenario(
            mock(service.clone()).await?,
            "lifecycle",
            Exec::Lifecycle,
            ExecutorConfig::shared_iterations(1, 1),
        );
        plan.cleanup = true;

        let outcome = LoadTest::new(plan)?.run().await;
        let summary = &outcome.summary;

        // Only the create was checked; the iteration stopped at the login.
        let ok = summary.check("status is 200").unwrap();
        assert_eq!((ok.passes, ok.fails), (1, 0));
        assert!(summary.check("status is 201").is_none());

        assert_eq!(
            outcome.teardown,
            Teardown {
                leftover: 1,
                deleted: 1
            }
        );
        assert_eq!(service.booking_count(), 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn crud_scenarios_share_bookings() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let mut plan = mock(service.clone()).await?;
        plan = with_scenario(
            plan,
            "createBooking",
            Exec::Create,
            ExecutorConfig::shared_iterations(4, 20),
        );
        plan = with_scenario(
            plan,
            "getBookings",
            Exec::FetchAll,
            ExecutorConfig::shared_iterations(4, 20),
        );
        plan.cleanup = true;

        let outcome = LoadTest::new(plan)?.run().await;

        let names: Vec<&str> = outcome.scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["createBooking", "getBookings"]);
        let ok = outcome.summary.check("status is 200").unwrap();
        assert_eq!((ok.passes, ok.fails), (40, 0));
        assert_eq!(outcome.teardown.deleted, 20);
        assert_eq!(service.booking_count(), 0);
        Ok(())
    }
}
