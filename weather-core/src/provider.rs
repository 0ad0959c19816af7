use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::{
    location::Location,
    model::{ProviderUnits, WeatherSnapshot},
    settings::ProviderSettings,
    units::{TemperatureUnit, UnitPreferences},
};

pub mod forecastjson;

pub use forecastjson::ForecastJsonProvider;

/// Why a forecast fetch failed. All kinds are retried on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or non-2xx status.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed JSON or a response without current conditions.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider returned an empty response")]
    Empty,
}

/// Why a free-text location lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("No location found for '{0}'")]
    NotFound(String),

    #[error("'{query}' matches {} locations", .candidates.len())]
    Ambiguous { query: String, candidates: Vec<Location> },

    #[error("Geocoding request failed: {0}")]
    Network(String),

    #[error("Failed to parse geocoding response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Fetch current conditions and `forecast_days` days of forecast.
    async fn fetch(
        &self,
        location: &Location,
        units: &UnitPreferences,
        forecast_days: u8,
    ) -> Result<WeatherSnapshot, FetchError>;

    /// Resolve a free-text place name to a provider location.
    async fn resolve_location(&self, name: &str) -> Result<Location, GeocodeError>;
}

/// Unit system requested from the provider. It only knows Fahrenheit and
/// Celsius; everything finer is converted locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportUnits {
    Imperial,
    Metric,
}

impl TransportUnits {
    pub fn for_preferences(units: &UnitPreferences) -> Self {
        match units.temperature {
            TemperatureUnit::Fahrenheit | TemperatureUnit::Rankine => TransportUnits::Imperial,
            _ => TransportUnits::Metric,
        }
    }

    pub fn query_value(&self) -> &'static str {
        match self {
            TransportUnits::Imperial => "f",
            TransportUnits::Metric => "c",
        }
    }

    /// Units to assume when the response does not name them.
    pub fn provider_units(&self) -> ProviderUnits {
        match self {
            TransportUnits::Imperial => ProviderUnits::IMPERIAL,
            TransportUnits::Metric => ProviderUnits::METRIC,
        }
    }
}

/// Construct the weather client described by the provider settings.
pub fn client_from_settings(
    settings: &ProviderSettings,
) -> Result<Box<dyn WeatherClient>, FetchError> {
    Ok(Box::new(ForecastJsonProvider::new(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{DistanceUnit, PressureUnit, SpeedUnit};

    fn prefs(temperature: TemperatureUnit) -> UnitPreferences {
        UnitPreferences {
            temperature,
            speed: SpeedUnit::Kph,
            pressure: PressureUnit::Hpa,
            distance: DistanceUnit::Km,
            wind_direction_arrows: false,
        }
    }

    #[test]
    fn transport_units_follow_temperature_preference() {
        let imperial = [TemperatureUnit::Fahrenheit, TemperatureUnit::Rankine];
        for unit in TemperatureUnit::all() {
            let expected = if imperial.contains(unit) { "f" } else { "c" };
            assert_eq!(TransportUnits::for_preferences(&prefs(*unit)).query_value(), expected);
        }
    }

    #[test]
    fn client_from_default_settings_builds() {
        assert!(client_from_settings(&ProviderSettings::default()).is_ok());
    }

    #[test]
    fn geocode_error_messages() {
        let err = GeocodeError::Ambiguous {
            query: "Springfield".into(),
            candidates: vec![Location::new("1", "Springfield"), Location::new("2", "Springfield")],
        };
        assert_eq!(err.to_string(), "'Springfield' matches 2 locations");
        assert!(GeocodeError::NotFound("Atlantis".into()).to_string().contains("Atlantis"));
    }
}
