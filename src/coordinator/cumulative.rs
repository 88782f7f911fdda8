//! Cumulative aggregation across sibling coordinators.
//!
//! The aggregator is constructed with explicit handles to its siblings; it
//! never discovers them through shared global state, and by construction it
//! never holds a handle to itself. Each sibling exposes its latest estimate
//! as a complete snapshot, so aggregation never observes a torn read.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::coordinator::refresh::ForecastCoordinator;
use crate::domain::Estimate;

/// Narrow read-only view of a sibling coordinator
pub trait EstimateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Latest complete estimate, if the sibling has produced one
    fn latest(&self) -> Option<Arc<Estimate>>;

    /// Whether the sibling opts into cumulation
    fn include_in_cumulative(&self) -> bool;
}

impl EstimateSource for ForecastCoordinator {
    fn name(&self) -> &str {
        ForecastCoordinator::name(self)
    }

    fn latest(&self) -> Option<Arc<Estimate>> {
        ForecastCoordinator::latest(self)
    }

    fn include_in_cumulative(&self) -> bool {
        ForecastCoordinator::include_in_cumulative(self)
    }
}

/// Virtual coordinator that sums its siblings' outputs instead of calling
/// the forecaster itself
pub struct CumulativeCoordinator {
    name: String,
    sources: Vec<Arc<dyn EstimateSource>>,
    latest: RwLock<Option<Arc<Estimate>>>,
}

impl CumulativeCoordinator {
    pub fn new(name: impl Into<String>, sources: Vec<Arc<dyn EstimateSource>>) -> Self {
        Self {
            name: name.into(),
            sources,
            latest: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latest(&self) -> Option<Arc<Estimate>> {
        self.latest.read().clone()
    }

    /// Sum the latest estimates of every opted-in sibling that has produced
    /// data. Zero qualifying siblings yield an all-empty estimate.
    pub fn aggregate(&self) -> Arc<Estimate> {
        let snapshots: Vec<Arc<Estimate>> = self
            .sources
            .iter()
            .filter(|source| source.include_in_cumulative())
            .filter_map(|source| source.latest())
            .collect();

        debug!(
            coordinator = %self.name,
            siblings = self.sources.len(),
            summed = snapshots.len(),
            "aggregating sibling estimates"
        );

        let total = Arc::new(Estimate::sum(snapshots.iter().map(Arc::as_ref)));
        *self.latest.write() = Some(total.clone());
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    struct StaticSource {
        name: &'static str,
        estimate: Option<Arc<Estimate>>,
        include: bool,
    }

    impl EstimateSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn latest(&self) -> Option<Arc<Estimate>> {
            self.estimate.clone()
        }

        fn include_in_cumulative(&self) -> bool {
            self.include
        }
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn source(
        name: &'static str,
        watts: &[(u32, f64)],
        include: bool,
    ) -> Arc<dyn EstimateSource> {
        let points = watts.iter().map(|(hour, w)| (ts(*hour), *w)).collect();
        let estimate = Estimate::new(points, BTreeMap::new(), BTreeMap::new());
        Arc::new(StaticSource {
            name,
            estimate: Some(Arc::new(estimate)),
            include,
        })
    }

    #[test]
    fn test_aggregate_sums_opted_in_siblings() {
        let aggregator = CumulativeCoordinator::new(
            "total",
            vec![
                source("east", &[(1, 100.0), (2, 200.0)], true),
                source("west", &[(1, 50.0), (3, 30.0)], true),
            ],
        );

        let total = aggregator.aggregate();
        assert_eq!(total.power_at(ts(1)), Some(150.0));
        assert_eq!(total.power_at(ts(2)), Some(200.0));
        assert_eq!(total.power_at(ts(3)), Some(30.0));
        assert_eq!(aggregator.latest(), Some(total));
    }

    #[test]
    fn test_opted_out_siblings_are_excluded() {
        let aggregator = CumulativeCoordinator::new(
            "total",
            vec![
                source("east", &[(1, 100.0)], true),
                source("west", &[(1, 999.0)], false),
            ],
        );

        let total = aggregator.aggregate();
        assert_eq!(total.power_at(ts(1)), Some(100.0));
    }

    #[test]
    fn test_siblings_without_data_are_skipped() {
        let aggregator = CumulativeCoordinator::new(
            "total",
            vec![
                source("east", &[(1, 100.0)], true),
                Arc::new(StaticSource {
                    name: "pending",
                    estimate: None,
                    include: true,
                }),
            ],
        );

        let total = aggregator.aggregate();
        assert_eq!(total.power_at(ts(1)), Some(100.0));
        assert_eq!(total.watts().len(), 1);
    }

    #[test]
    fn test_no_qualifying_siblings_yield_empty_estimate() {
        let aggregator = CumulativeCoordinator::new("total", vec![]);
        let total = aggregator.aggregate();
        assert!(total.is_empty());
        assert_eq!(aggregator.latest(), Some(total));
    }
}
