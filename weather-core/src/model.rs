use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::units::{DistanceUnit, PressureUnit, SpeedUnit, TemperatureUnit};

/// Units the provider used for the raw values of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUnits {
    pub temperature: TemperatureUnit,
    pub speed: SpeedUnit,
    pub pressure: PressureUnit,
    pub distance: DistanceUnit,
}

impl ProviderUnits {
    pub const IMPERIAL: ProviderUnits = ProviderUnits {
        temperature: TemperatureUnit::Fahrenheit,
        speed: SpeedUnit::Mph,
        pressure: PressureUnit::InHg,
        distance: DistanceUnit::Miles,
    };

    pub const METRIC: ProviderUnits = ProviderUnits {
        temperature: TemperatureUnit::Celsius,
        speed: SpeedUnit::Kph,
        pressure: PressureUnit::Hpa,
        distance: DistanceUnit::Km,
    };
}

/// One forecast day, in provider-native units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// 0 is today, 1 tomorrow.
    pub day_offset: u32,
    pub weekday: Option<Weekday>,
    pub condition_code: i32,
    pub low: f64,
    pub high: f64,
    pub text: String,
}

/// The normalized result of one successful fetch.
///
/// Snapshots are never modified; a new fetch produces a new snapshot. All
/// numeric fields hold the raw provider values in `units`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub condition_code: i32,
    pub condition_text: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: f64,
    pub pressure: f64,
    pub visibility: Option<f64>,
    pub wind_speed: f64,
    pub wind_direction_deg: f64,
    pub units: ProviderUnits,
    pub sunrise: Option<NaiveTime>,
    pub sunset: Option<NaiveTime>,
    pub forecast: Vec<ForecastDay>,
}

impl WeatherSnapshot {
    /// Current temperature in Fahrenheit, needed for pressure compensation.
    pub fn temperature_f(&self) -> f64 {
        crate::units::convert_temperature(
            self.temperature,
            self.units.temperature,
            TemperatureUnit::Fahrenheit,
        )
    }
}
