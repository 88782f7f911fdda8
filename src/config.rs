//! Configuration surface for forecast coordinators.
//!
//! Every geometry/power field may be a scalar, a list, or a comma-separated
//! string for multi-array sites; see [`crate::forecast::broadcast`]. Range
//! validation happens here, synchronously, before any coordinator is built.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::forecast::broadcast::{resolve_array_count, MultiValue};

/// Default horizon file location under the host's configuration directory
pub const DEFAULT_HORIZON_PATH: &str = "/config/solar_forecast/horizon.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poll: PollConfig,
    pub sites: Vec<SiteConfig>,
}

/// Poll cadences for the scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Per-site forecast refresh interval (seconds)
    pub refresh_interval_secs: u64,
    /// Cumulative aggregation interval (seconds); runs faster than the
    /// per-site refreshes so it converges shortly after any sibling updates
    pub cumulative_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 1800, // 30 minutes
            cumulative_interval_secs: 60,
        }
    }
}

impl PollConfig {
    /// Both intervals must be at least one second; the timer loops cannot
    /// run with a zero period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, secs) in [
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("cumulative_interval_secs", self.cumulative_interval_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    value: 0.0,
                    min: 1.0,
                });
            }
        }
        Ok(())
    }
}

/// One site (one coordinator): a single panel array or several
/// differently-oriented array groups sharing a location
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    pub latitude: MultiValue<f64>,
    pub longitude: MultiValue<f64>,

    /// Panel tilt from horizontal, degrees (0-90)
    pub declination: MultiValue<f64>,

    /// Panel facing direction, degrees (0=north, 180=south, 0-360)
    pub azimuth: MultiValue<f64>,

    /// DC module power (W), at least 1
    pub modules_power: MultiValue<u32>,

    /// AC inverter power (W); 0 means unconstrained by inverter clipping
    #[serde(default)]
    pub inverter_power: u32,

    /// Efficiency factor (0-1), default 1.0
    #[serde(default)]
    pub efficiency_factor: Option<MultiValue<f64>>,

    /// Sunrise attenuation (0-1)
    #[serde(default)]
    pub damping_morning: f64,

    /// Sunset attenuation (0-1)
    #[serde(default)]
    pub damping_evening: f64,

    #[serde(default)]
    pub use_horizon: Option<MultiValue<bool>>,

    #[serde(default)]
    pub partial_shading: Option<MultiValue<bool>>,

    #[serde(default)]
    pub horizon_filepath: Option<MultiValue<String>>,

    #[serde(default = "default_weather_model")]
    pub weather_model: String,

    #[serde(default = "default_true")]
    pub retain_latest_forecast_when_unavailable: bool,

    /// Maximum age of a retained forecast in minutes; 0 means unbounded
    #[serde(default)]
    pub max_forecast_age_minutes: u32,

    /// Opt this site into the cumulative aggregate
    #[serde(default)]
    pub include_in_cumulative: bool,
}

fn default_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_weather_model() -> String {
    "best_match".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SOLAR_FORECAST__").split("__"));
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.poll.validate()?;
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }
}

impl SiteConfig {
    /// Number of logical arrays, derived from every array-capable field.
    ///
    /// All lists must have length 1 or the shared maximum.
    pub fn array_count(&self) -> Result<usize, ConfigError> {
        resolve_array_count([
            self.latitude.list_len(),
            self.longitude.list_len(),
            self.declination.list_len(),
            self.azimuth.list_len(),
            self.modules_power.list_len(),
            self.efficiency_factor.as_ref().and_then(|v| v.list_len()),
            self.use_horizon.as_ref().and_then(|v| v.list_len()),
            self.partial_shading.as_ref().and_then(|v| v.list_len()),
            self.horizon_filepath.as_ref().and_then(|v| v.list_len()),
        ])
    }

    /// Validate list-length consistency and every scalar range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.array_count()?;

        check_range("latitude", self.latitude.items(), -90.0, 90.0)?;
        check_range("longitude", self.longitude.items(), -180.0, 180.0)?;
        check_range("declination", self.declination.items(), 0.0, 90.0)?;
        check_range("azimuth", self.azimuth.items(), 0.0, 360.0)?;

        for power in self.modules_power.items() {
            if *power < 1 {
                return Err(ConfigError::BelowMinimum {
                    field: "modules_power",
                    value: f64::from(*power),
                    min: 1.0,
                });
            }
        }

        if let Some(efficiency) = &self.efficiency_factor {
            check_range("efficiency_factor", efficiency.items(), 0.0, 1.0)?;
        }
        check_range("damping_morning", &[self.damping_morning], 0.0, 1.0)?;
        check_range("damping_evening", &[self.damping_evening], 0.0, 1.0)?;

        if let Some(paths) = &self.horizon_filepath {
            for path in paths.items() {
                if path.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        field: "horizon_filepath",
                        message: "value cannot be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Retained-forecast staleness window; `None` when unbounded
    pub fn max_forecast_age(&self) -> Option<chrono::Duration> {
        if self.max_forecast_age_minutes > 0 {
            Some(chrono::Duration::minutes(i64::from(
                self.max_forecast_age_minutes,
            )))
        } else {
            None
        }
    }
}

fn check_range(
    field: &'static str,
    values: &[f64],
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    for value in values {
        if *value < min {
            return Err(ConfigError::BelowMinimum {
                field,
                value: *value,
                min,
            });
        }
        if *value > max {
            return Err(ConfigError::AboveMaximum {
                field,
                value: *value,
                max,
            });
        }
    }
    Ok(())
}
