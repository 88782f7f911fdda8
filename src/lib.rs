//! Staleness-aware refresh coordination for remote solar power forecasts.
//!
//! This crate prepares forecaster inputs from a possibly-multi-array site
//! configuration, polls the remote forecasting service, retains the last
//! good estimate when the service is unreachable (within a configurable
//! staleness window), and can cumulate several sibling coordinators into one
//! combined estimate.
//!
//! The irradiance modeling itself, retry/backoff, and configuration
//! persistence are collaborator concerns; the seams are
//! [`forecast::SolarForecaster`] and [`coordinator::EstimateSource`].

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod telemetry;

pub use config::{Config, PollConfig, SiteConfig};
pub use coordinator::{CumulativeCoordinator, ForecastCoordinator, PollScheduler};
pub use domain::{Estimate, HorizonMap};
pub use error::{ConfigError, HorizonFileError, RefreshError, SetupError};
