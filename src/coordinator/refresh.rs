//! Per-site refresh coordinator with staleness-aware retention.
//!
//! Each tick calls the remote forecaster. Success replaces the retained
//! estimate wholesale and stamps the success time. Failure either surfaces a
//! [`RefreshError`] (no retained data, retention disabled, or the retained
//! data is too old to serve) or falls back to the retained estimate with a
//! warning. The retained estimate is never mutated on the failure path.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::warn;

use crate::config::SiteConfig;
use crate::domain::Estimate;
use crate::error::RefreshError;
use crate::forecast::{ForecastRequest, OpenMeteoForecaster, SolarForecaster};

/// What to do with the retained estimate when the forecaster is unreachable
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub retain_when_unavailable: bool,
    /// Oldest retained estimate still worth serving; `None` means unbounded
    pub max_forecast_age: Option<chrono::Duration>,
}

impl RetentionPolicy {
    pub fn from_site(config: &SiteConfig) -> Self {
        Self {
            retain_when_unavailable: config.retain_latest_forecast_when_unavailable,
            max_forecast_age: config.max_forecast_age(),
        }
    }
}

#[derive(Default)]
struct RetentionState {
    last_successful_update: Option<DateTime<Utc>>,
    data: Option<Arc<Estimate>>,
}

/// One coordinator per configured site
pub struct ForecastCoordinator {
    name: String,
    forecaster: Arc<dyn SolarForecaster>,
    policy: RetentionPolicy,
    include_in_cumulative: bool,
    state: RwLock<RetentionState>,
}

impl ForecastCoordinator {
    pub fn new(
        name: impl Into<String>,
        forecaster: Arc<dyn SolarForecaster>,
        policy: RetentionPolicy,
        include_in_cumulative: bool,
    ) -> Self {
        Self {
            name: name.into(),
            forecaster,
            policy,
            include_in_cumulative,
            state: RwLock::new(RetentionState::default()),
        }
    }

    /// Build a coordinator for a site, wiring the HTTP forecaster.
    ///
    /// Configuration and horizon validation failures abort here; no partial
    /// coordinator is created.
    pub async fn from_site(config: &SiteConfig) -> Result<Self> {
        let request = ForecastRequest::build(config).await?;
        let forecaster = OpenMeteoForecaster::new(request)?;
        Ok(Self::new(
            config.name.clone().unwrap_or_else(|| "site".to_string()),
            Arc::new(forecaster),
            RetentionPolicy::from_site(config),
            config.include_in_cumulative,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn include_in_cumulative(&self) -> bool {
        self.include_in_cumulative
    }

    /// Latest complete estimate snapshot, if any refresh has succeeded
    pub fn latest(&self) -> Option<Arc<Estimate>> {
        self.state.read().data.clone()
    }

    pub fn last_successful_update(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_successful_update
    }

    /// One refresh tick. The host scheduler serializes ticks per coordinator,
    /// so the read-then-write of the retention state is atomic per tick.
    pub async fn refresh(&self) -> Result<Arc<Estimate>, RefreshError> {
        self.refresh_at(Utc::now()).await
    }

    async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Arc<Estimate>, RefreshError> {
        match self.forecaster.estimate().await {
            Ok(estimate) => {
                let estimate = Arc::new(estimate);
                let mut state = self.state.write();
                state.data = Some(estimate.clone());
                state.last_successful_update = Some(now);
                Ok(estimate)
            }
            Err(err) => self.recover(now, err),
        }
    }

    fn recover(
        &self,
        now: DateTime<Utc>,
        err: anyhow::Error,
    ) -> Result<Arc<Estimate>, RefreshError> {
        let state = self.state.read();

        let retained = match (&state.data, self.policy.retain_when_unavailable) {
            (Some(data), true) => data.clone(),
            _ => return Err(RefreshError::Upstream(err)),
        };

        if let Some(max_age) = self.policy.max_forecast_age {
            // Cannot evaluate staleness without a success baseline.
            let Some(last) = state.last_successful_update else {
                return Err(RefreshError::NoBaseline(err));
            };

            let age = now - last;
            if age > max_age {
                return Err(RefreshError::StaleRetention {
                    age_minutes: age.num_minutes(),
                    max_minutes: max_age.num_minutes(),
                    cause: err,
                });
            }
        }

        warn!(
            coordinator = %self.name,
            error = %err,
            "unable to refresh forecast data, using retained forecast"
        );
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::client::MockSolarForecaster;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn sample_estimate(watts: f64) -> Estimate {
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Estimate::new(
            BTreeMap::from([(noon, watts)]),
            BTreeMap::new(),
            BTreeMap::new(),
        )
    }

    fn failing_forecaster() -> Arc<dyn SolarForecaster> {
        let mut mock = MockSolarForecaster::new();
        mock.expect_estimate()
            .returning(|| Err(anyhow::anyhow!("connection refused")));
        Arc::new(mock)
    }

    fn coordinator_with(
        forecaster: Arc<dyn SolarForecaster>,
        retain: bool,
        max_age_minutes: Option<i64>,
    ) -> ForecastCoordinator {
        ForecastCoordinator::new(
            "test",
            forecaster,
            RetentionPolicy {
                retain_when_unavailable: retain,
                max_forecast_age: max_age_minutes.map(chrono::Duration::minutes),
            },
            false,
        )
    }

    fn seed_retained(
        coordinator: &ForecastCoordinator,
        estimate: Estimate,
        last_success: Option<DateTime<Utc>>,
    ) {
        let mut state = coordinator.state.write();
        state.data = Some(Arc::new(estimate));
        state.last_successful_update = last_success;
    }

    #[tokio::test]
    async fn test_success_replaces_retained_estimate() {
        let mut mock = MockSolarForecaster::new();
        mock.expect_estimate()
            .returning(|| Ok(sample_estimate(4200.0)));
        let coordinator = coordinator_with(Arc::new(mock), true, None);

        assert!(coordinator.latest().is_none());
        let estimate = coordinator.refresh().await.unwrap();
        assert_eq!(estimate.peak_power(), Some(4200.0));
        assert_eq!(coordinator.latest(), Some(estimate));
        assert!(coordinator.last_successful_update().is_some());
    }

    #[tokio::test]
    async fn test_failure_without_data_propagates() {
        let coordinator = coordinator_with(failing_forecaster(), true, None);
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_failure_with_retention_disabled_propagates() {
        let coordinator = coordinator_with(failing_forecaster(), false, None);
        seed_retained(&coordinator, sample_estimate(1000.0), Some(Utc::now()));

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_failure_returns_retained_estimate_unchanged() {
        let coordinator = coordinator_with(failing_forecaster(), true, None);
        seed_retained(&coordinator, sample_estimate(1000.0), Some(Utc::now()));

        let estimate = coordinator.refresh().await.unwrap();
        assert_eq!(estimate.peak_power(), Some(1000.0));
        // Retention state untouched by the failure path.
        assert_eq!(coordinator.latest(), Some(estimate));
    }

    #[tokio::test]
    async fn test_retained_estimate_within_age_window_is_served() {
        let now = Utc::now();
        let coordinator = coordinator_with(failing_forecaster(), true, Some(60));
        seed_retained(
            &coordinator,
            sample_estimate(1000.0),
            Some(now - chrono::Duration::minutes(30)),
        );

        let estimate = coordinator.refresh_at(now).await.unwrap();
        assert_eq!(estimate.peak_power(), Some(1000.0));
    }

    #[tokio::test]
    async fn test_retained_estimate_past_age_window_raises() {
        let now = Utc::now();
        let coordinator = coordinator_with(failing_forecaster(), true, Some(60));
        seed_retained(
            &coordinator,
            sample_estimate(1000.0),
            Some(now - chrono::Duration::minutes(90)),
        );

        let err = coordinator.refresh_at(now).await.unwrap_err();
        assert!(matches!(
            err,
            RefreshError::StaleRetention {
                age_minutes: 90,
                max_minutes: 60,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_age_window_without_baseline_raises() {
        let coordinator = coordinator_with(failing_forecaster(), true, Some(60));
        seed_retained(&coordinator, sample_estimate(1000.0), None);

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::NoBaseline(_)));
    }
}
