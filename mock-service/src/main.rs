use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockBooker;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about = "In-memory restful-booker API for local load tests")]
struct MockCli {
    #[arg(short, long, default_value = "127.0.0.1:3001")]
    addr: SocketAddr,

    /// Answer 503 above this many requests per second.
    #[arg(long)]
    max_tps: Option<NonZeroU32>,

    /// Added latency per request in milliseconds.
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=info")
        .init();

    let args = MockCli::parse();

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
    }

    let mut builder = MockBooker::builder().delay(Duration::from_millis(args.delay_ms));
    if let Some(tps) = args.max_tps {
        builder = builder.max_tps(tps);
    }
    let state = builder.build();

    tokio::spawn(mock_service::tps_measure_task(state.clone()));
    mock_service::run(args.addr, state).await?;
    Ok(())
}
