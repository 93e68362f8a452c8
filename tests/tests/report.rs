mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use booker::booking::Exec;
    use booker::core::{ExecutorConfig, Summary};
    use booker::report::{handle_summary, render_text, ReportConfig, TextOptions, HTML_REPORT, JSON_REPORT};
    use booker::run::LoadTest;
    use mock_service::MockBooker;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(20_000)]
    async fn writes_reports_for_a_run() -> anyhow::Result<()> {
        let service = MockBooker::default();
        let plan = with_scenario(
            mock(service).await?,
            "lifecycle",
            Exec::Lifecycle,
            ExecutorConfig::shared_iterations(1, 3),
        );
        let outcome = LoadTest::new(plan)?.run().await;

        let dir = tempfile::tempdir()?;
        let config = ReportConfig {
            dir: dir.path().to_path_buf(),
            stdout: false,
            ..Default::default()
        };
        handle_summary(&outcome.summary, &config)?;

        let json = std::fs::read_to_string(dir.path().join(JSON_REPORT))?;
        let raw: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(raw["metrics"]["http_reqs"]["values"]["count"], 12.);
        assert_eq!(raw["root_group"]["checks"][0]["name"], "status is 200");
        assert!(raw["state"]["testRunDurationMs"].as_f64().unwrap() > 0.);
        let summary: Summary = serde_json::from_str(&json)?;
        assert_eq!(summary.root_group.checks, outcome.summary.root_group.checks);

        let html = std::fs::read_to_string(dir.path().join(HTML_REPORT))?;
        assert!(html.contains("status is 201"));

        let text = render_text(
            &outcome.summary,
            &TextOptions {
                colors: false,
                ..Default::default()
            },
        );
        assert!(text.contains(" ✓ status is 200"));
        assert!(text.contains(" ✓ status is 201"));
        assert!(text.contains(" http_req_duration."));
        Ok(())
    }
}
