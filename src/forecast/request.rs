//! Builds the input bundle for the remote forecaster from a site
//! configuration.
//!
//! Unit conventions differ between the configuration surface and the
//! forecaster: users enter azimuth as 0=north/180=south and power in watts;
//! the forecaster expects azimuth as an offset from south and power in
//! kilowatts. Those transforms happen here, once, after broadcasting.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::config::{SiteConfig, DEFAULT_HORIZON_PATH};
use crate::domain::HorizonMap;
use crate::error::SetupError;
use crate::forecast::broadcast::broadcast_or;

/// Parameter bundle for one forecaster call, uniform per-array lists inside
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Transport detail, not part of the request payload
    #[serde(skip)]
    pub base_url: String,

    #[serde(serialize_with = "scalar_or_list")]
    pub latitude: Vec<f64>,

    #[serde(serialize_with = "scalar_or_list")]
    pub longitude: Vec<f64>,

    /// Offset from south, degrees (user-facing azimuth minus 180)
    #[serde(serialize_with = "scalar_or_list")]
    pub azimuth: Vec<f64>,

    #[serde(serialize_with = "scalar_or_list")]
    pub declination: Vec<f64>,

    /// DC module power (kW)
    #[serde(serialize_with = "scalar_or_list")]
    pub dc_kwp: Vec<f64>,

    /// AC inverter limit (kW); `None` means unconstrained by inverter clipping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ac_kwp: Option<f64>,

    #[serde(serialize_with = "scalar_or_list")]
    pub efficiency_factor: Vec<f64>,

    pub damping_morning: f64,
    pub damping_evening: f64,

    #[serde(serialize_with = "scalar_or_list")]
    pub use_horizon: Vec<bool>,

    #[serde(serialize_with = "scalar_or_list")]
    pub partial_shading: Vec<bool>,

    #[serde(serialize_with = "scalar_or_list")]
    pub horizon_map: Vec<HorizonMap>,

    pub weather_model: String,
}

impl ForecastRequest {
    /// Validate the configuration, broadcast every array-capable field to a
    /// uniform per-array list, apply the unit transforms, and resolve horizon
    /// maps (validating each distinct horizon file at most once).
    ///
    /// Any error here aborts coordinator setup; no partial coordinator is
    /// ever created from a half-built request.
    pub async fn build(config: &SiteConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let array_count = config.array_count()?;

        let azimuth = config
            .azimuth
            .broadcast(array_count)?
            .into_iter()
            .map(|value| value - 180.0)
            .collect();

        let dc_kwp = config
            .modules_power
            .broadcast(array_count)?
            .into_iter()
            .map(|watts| f64::from(watts) / 1000.0)
            .collect();

        let ac_kwp = match config.inverter_power {
            0 => None,
            watts => Some(f64::from(watts) / 1000.0),
        };

        // An empty key is never forwarded as an empty credential.
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(String::from);

        let use_horizon = broadcast_or(config.use_horizon.as_ref(), array_count, false)?;
        let horizon_paths = broadcast_or(
            config.horizon_filepath.as_ref(),
            array_count,
            DEFAULT_HORIZON_PATH.to_string(),
        )?;
        let horizon_map = resolve_horizon_maps(&use_horizon, &horizon_paths).await?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            latitude: config.latitude.broadcast(array_count)?,
            longitude: config.longitude.broadcast(array_count)?,
            azimuth,
            declination: config.declination.broadcast(array_count)?,
            dc_kwp,
            ac_kwp,
            efficiency_factor: broadcast_or(config.efficiency_factor.as_ref(), array_count, 1.0)?,
            damping_morning: config.damping_morning,
            damping_evening: config.damping_evening,
            use_horizon,
            partial_shading: broadcast_or(config.partial_shading.as_ref(), array_count, false)?,
            horizon_map,
            weather_model: config.weather_model.clone(),
        })
    }

    pub fn array_count(&self) -> usize {
        self.latitude.len()
    }
}

/// One horizon map per array: the no-shading default where horizon
/// correction is disabled, otherwise the validated file contents, with one
/// validation per distinct path.
async fn resolve_horizon_maps(
    use_horizon: &[bool],
    paths: &[String],
) -> Result<Vec<HorizonMap>, SetupError> {
    let mut validated: HashMap<&str, HorizonMap> = HashMap::new();
    let mut maps = Vec::with_capacity(use_horizon.len());

    for (enabled, path) in use_horizon.iter().zip(paths) {
        if !*enabled {
            maps.push(HorizonMap::no_shading());
            continue;
        }

        if let Some(map) = validated.get(path.as_str()) {
            maps.push(map.clone());
            continue;
        }

        let map = HorizonMap::load(path).await?;
        validated.insert(path, map.clone());
        maps.push(map);
    }

    Ok(maps)
}

/// Collapse length-1 lists to bare scalars for the forecaster's
/// single-array wire shape.
fn scalar_or_list<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match values {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}
