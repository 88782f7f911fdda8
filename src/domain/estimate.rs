//! Forecast estimate produced by the remote forecaster.
//!
//! An [`Estimate`] is immutable once produced: a coordinator replaces its
//! retained estimate wholesale on every successful refresh and never mutates
//! it in place, which is what lets sibling coordinators read snapshots
//! without locks.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Time-indexed solar production estimate.
///
/// The mappings are private; an estimate is assembled once via
/// [`Estimate::new`] and read through the accessors, never mutated after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    watts: BTreeMap<DateTime<Utc>, f64>,
    wh_days: BTreeMap<NaiveDate, f64>,
    wh_period: BTreeMap<DateTime<Utc>, f64>,
}

impl Estimate {
    pub fn new(
        watts: BTreeMap<DateTime<Utc>, f64>,
        wh_days: BTreeMap<NaiveDate, f64>,
        wh_period: BTreeMap<DateTime<Utc>, f64>,
    ) -> Self {
        Self {
            watts,
            wh_days,
            wh_period,
        }
    }

    /// An estimate with all three mappings empty
    pub fn empty() -> Self {
        Self::default()
    }

    /// Instantaneous power per timestamp (W)
    pub fn watts(&self) -> &BTreeMap<DateTime<Utc>, f64> {
        &self.watts
    }

    /// Energy total per day (Wh)
    pub fn wh_days(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.wh_days
    }

    /// Energy per forecast period, keyed by period start (Wh)
    pub fn wh_period(&self) -> &BTreeMap<DateTime<Utc>, f64> {
        &self.wh_period
    }

    pub fn is_empty(&self) -> bool {
        self.watts.is_empty() && self.wh_days.is_empty() && self.wh_period.is_empty()
    }

    /// Instantaneous power at an exact forecast timestamp, if present
    pub fn power_at(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        self.watts.get(&timestamp).copied()
    }

    /// Energy total for a day, if present
    pub fn energy_for_day(&self, day: NaiveDate) -> Option<f64> {
        self.wh_days.get(&day).copied()
    }

    /// Peak forecasted power over the whole estimate (W)
    pub fn peak_power(&self) -> Option<f64> {
        self.watts.values().copied().max_by(|a, b| a.total_cmp(b))
    }

    /// Key-wise sum of a set of estimates.
    ///
    /// For each key present in any input mapping, the output value is the sum
    /// of that key's value across all inputs that contain it; a missing key
    /// contributes 0. An empty input set yields [`Estimate::empty`].
    pub fn sum<'a, I>(estimates: I) -> Estimate
    where
        I: IntoIterator<Item = &'a Estimate>,
    {
        let mut out = Estimate::empty();
        for estimate in estimates {
            for (ts, watts) in &estimate.watts {
                *out.watts.entry(*ts).or_insert(0.0) += watts;
            }
            for (day, wh) in &estimate.wh_days {
                *out.wh_days.entry(*day).or_insert(0.0) += wh;
            }
            for (ts, wh) in &estimate.wh_period {
                *out.wh_period.entry(*ts).or_insert(0.0) += wh;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn estimate_with_watts(points: &[(u32, f64)]) -> Estimate {
        let watts = points.iter().map(|(hour, w)| (ts(*hour), *w)).collect();
        Estimate::new(watts, BTreeMap::new(), BTreeMap::new())
    }

    #[test]
    fn test_sum_merges_keys() {
        let a = estimate_with_watts(&[(1, 100.0), (2, 200.0)]);
        let b = estimate_with_watts(&[(1, 50.0), (3, 30.0)]);

        let total = Estimate::sum([&a, &b]);

        assert_eq!(total.power_at(ts(1)), Some(150.0));
        assert_eq!(total.power_at(ts(2)), Some(200.0));
        assert_eq!(total.power_at(ts(3)), Some(30.0));
        assert_eq!(total.watts().len(), 3);
    }

    #[test]
    fn test_sum_of_nothing_is_empty() {
        let total = Estimate::sum([]);
        assert!(total.is_empty());
    }

    #[test]
    fn test_sum_covers_all_three_mappings() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let a = Estimate::new(
            BTreeMap::new(),
            BTreeMap::from([(day, 12_000.0)]),
            BTreeMap::from([(ts(10), 500.0)]),
        );
        let b = Estimate::new(
            BTreeMap::new(),
            BTreeMap::from([(day, 8_000.0)]),
            BTreeMap::from([(ts(11), 700.0)]),
        );

        let total = Estimate::sum([&a, &b]);
        assert_eq!(total.energy_for_day(day), Some(20_000.0));
        assert_eq!(total.wh_period().get(&ts(10)), Some(&500.0));
        assert_eq!(total.wh_period().get(&ts(11)), Some(&700.0));
    }

    #[test]
    fn test_peak_power() {
        let e = estimate_with_watts(&[(8, 1200.0), (12, 4800.0), (16, 900.0)]);
        assert_eq!(e.peak_power(), Some(4800.0));
        assert_eq!(Estimate::empty().peak_power(), None);
    }
}
