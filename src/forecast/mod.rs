pub mod broadcast;
pub mod client;
pub mod request;

pub use broadcast::MultiValue;
pub use client::{OpenMeteoForecaster, SolarForecaster};
pub use request::ForecastRequest;
