use anyhow::Context;
use booker::cli::Cli;
use booker::report::handle_summary;
use booker::run::LoadTest;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("booker=info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (plan, report) = Cli::parse()
        .into_run()
        .context("Invalid run configuration")?;

    info!("Load testing {}", plan.base_url);
    let outcome = LoadTest::new(plan)?.run().await;

    handle_summary(&outcome.summary, &report).context("Failed to write reports")?;
    Ok(())
}
