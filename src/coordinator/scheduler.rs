//! Timer-driven poll loops.
//!
//! One task per coordinator: forecast coordinators refresh on the configured
//! interval (default 30 minutes), the cumulative coordinator re-aggregates on
//! a faster cadence (default 1 minute) so it converges shortly after any
//! sibling refreshes. A failed tick is logged and surfaced in the task
//! status; it never crashes the process.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::config::PollConfig;
use crate::coordinator::cumulative::CumulativeCoordinator;
use crate::coordinator::refresh::ForecastCoordinator;

/// Bookkeeping for one periodic task
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
}

/// Spawns and tracks the poll loops for a set of coordinators
pub struct PollScheduler {
    config: PollConfig,
    refresh_tasks: Vec<(Arc<ForecastCoordinator>, Arc<RwLock<TaskStatus>>)>,
    cumulative_task: Option<(Arc<CumulativeCoordinator>, Arc<RwLock<TaskStatus>>)>,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            refresh_tasks: Vec::new(),
            cumulative_task: None,
        }
    }

    pub fn add_coordinator(&mut self, coordinator: Arc<ForecastCoordinator>) {
        self.refresh_tasks
            .push((coordinator, Arc::new(RwLock::new(TaskStatus::default()))));
    }

    pub fn set_cumulative(&mut self, coordinator: Arc<CumulativeCoordinator>) {
        self.cumulative_task =
            Some((coordinator, Arc::new(RwLock::new(TaskStatus::default()))));
    }

    /// Spawn all poll loops. Each loop ticks immediately once, so every
    /// coordinator attempts a first refresh right after startup.
    pub fn start(&self) {
        for (coordinator, status) in &self.refresh_tasks {
            let coordinator = coordinator.clone();
            let status = status.clone();
            let interval_secs = self.config.refresh_interval_secs;
            tokio::spawn(async move {
                let mut ticker = interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    refresh_tick(&coordinator, &status).await;
                }
            });
        }

        if let Some((coordinator, status)) = &self.cumulative_task {
            let coordinator = coordinator.clone();
            let status = status.clone();
            let interval_secs = self.config.cumulative_interval_secs;
            tokio::spawn(async move {
                let mut ticker = interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    cumulative_tick(&coordinator, &status).await;
                }
            });
        }

        info!(
            coordinators = self.refresh_tasks.len(),
            cumulative = self.cumulative_task.is_some(),
            "poll loops started"
        );
    }

    pub async fn refresh_statuses(&self) -> Vec<(String, TaskStatus)> {
        let mut out = Vec::with_capacity(self.refresh_tasks.len());
        for (coordinator, status) in &self.refresh_tasks {
            out.push((coordinator.name().to_string(), status.read().await.clone()));
        }
        out
    }

    pub async fn cumulative_status(&self) -> Option<TaskStatus> {
        match &self.cumulative_task {
            Some((_, status)) => Some(status.read().await.clone()),
            None => None,
        }
    }
}

async fn refresh_tick(coordinator: &ForecastCoordinator, status: &RwLock<TaskStatus>) {
    let now = Utc::now();
    {
        let mut status = status.write().await;
        status.last_run = Some(now);
        status.run_count += 1;
    }

    match coordinator.refresh().await {
        Ok(estimate) => {
            let mut status = status.write().await;
            status.last_success = Some(now);
            status.success_count += 1;
            status.last_error = None;
            info!(
                coordinator = coordinator.name(),
                peak_watts = estimate.peak_power(),
                "forecast refresh completed"
            );
        }
        Err(e) => {
            let mut status = status.write().await;
            status.error_count += 1;
            status.last_error = Some(e.to_string());
            warn!(coordinator = coordinator.name(), error = %e, "forecast refresh tick failed");
        }
    }
}

async fn cumulative_tick(coordinator: &CumulativeCoordinator, status: &RwLock<TaskStatus>) {
    let now = Utc::now();
    let total = coordinator.aggregate();

    let mut status = status.write().await;
    status.last_run = Some(now);
    status.run_count += 1;
    status.last_success = Some(now);
    status.success_count += 1;
    status.last_error = None;

    info!(
        coordinator = coordinator.name(),
        summed_points = total.watts().len(),
        "cumulative aggregation completed"
    );
}
