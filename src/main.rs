use std::sync::Arc;

use anyhow::Result;
use solar_forecast_coordinator::coordinator::EstimateSource;
use solar_forecast_coordinator::{
    config::Config, telemetry, CumulativeCoordinator, ForecastCoordinator, PollScheduler,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cfg = Config::load()?;
    if cfg.sites.is_empty() {
        anyhow::bail!("no sites configured; add at least one [[sites]] entry");
    }

    let mut scheduler = PollScheduler::new(cfg.poll.clone());
    let mut sources: Vec<Arc<dyn EstimateSource>> = Vec::new();

    for site in &cfg.sites {
        let coordinator = Arc::new(ForecastCoordinator::from_site(site).await?);
        info!(site = coordinator.name(), "coordinator ready");
        sources.push(coordinator.clone());
        scheduler.add_coordinator(coordinator);
    }

    if sources.iter().any(|s| s.include_in_cumulative()) {
        scheduler.set_cumulative(Arc::new(CumulativeCoordinator::new("cumulative", sources)));
    }

    scheduler.start();

    telemetry::shutdown_signal().await;
    warn!("shutdown complete");
    Ok(())
}
