use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    condition::CODE_NOT_AVAILABLE,
    location::Location,
    model::{ForecastDay, ProviderUnits, WeatherSnapshot},
    settings::ProviderSettings,
    units::{DistanceUnit, PressureUnit, SpeedUnit, TemperatureUnit, UnitPreferences},
};

use super::{FetchError, GeocodeError, TransportUnits, WeatherClient};

/// Client for the forecast JSON API: one GET for current conditions plus
/// forecast, and a geocoding endpoint for free-text place names.
#[derive(Debug, Clone)]
pub struct ForecastJsonProvider {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl ForecastJsonProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            http,
        })
    }

    fn forecast_url(&self) -> String {
        format!("{}/forecastjson", self.base_url)
    }

    fn geocode_url(&self) -> String {
        format!("{}/geocode", self.base_url)
    }

    /// Query parameters for a forecast request, in a fixed order.
    fn forecast_query(
        &self,
        location: &Location,
        transport: TransportUnits,
        forecast_days: u8,
    ) -> Vec<(&'static str, String)> {
        let place = location.id.clone().unwrap_or_else(|| location.name.clone());
        let mut query = vec![
            ("p", place),
            ("u", transport.query_value().to_string()),
            ("d", forecast_days.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("appid", key.clone()));
        }
        query
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Value(f64),
    Text(String),
}

impl Number {
    fn value(&self) -> Option<f64> {
        match self {
            Number::Value(v) => Some(*v),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn number(field: &Option<Number>) -> Option<f64> {
    field.as_ref().and_then(Number::value)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ident {
    Text(String),
    Number(i64),
}

impl Ident {
    fn into_string(self) -> String {
        match self {
            Ident::Text(s) => s,
            Ident::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FjLocation {
    city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FjUnits {
    temperature: Option<String>,
    speed: Option<String>,
    pressure: Option<String>,
    distance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FjCondition {
    code: Option<Number>,
    text: Option<String>,
    temperature: Option<Number>,
}

#[derive(Debug, Default, Deserialize)]
struct FjWind {
    chill: Option<Number>,
    direction: Option<Number>,
    speed: Option<Number>,
}

#[derive(Debug, Default, Deserialize)]
struct FjAtmosphere {
    humidity: Option<Number>,
    visibility: Option<Number>,
    pressure: Option<Number>,
}

#[derive(Debug, Default, Deserialize)]
struct FjAstronomy {
    sunrise: Option<String>,
    sunset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FjForecastDay {
    day: Option<String>,
    code: Option<Number>,
    text: Option<String>,
    low_temperature: Option<Number>,
    high_temperature: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct FjResponse {
    #[serde(default)]
    location: FjLocation,
    #[serde(default)]
    units: FjUnits,
    condition: Option<FjCondition>,
    #[serde(default)]
    wind: FjWind,
    #[serde(default)]
    atmosphere: FjAtmosphere,
    #[serde(default)]
    astronomy: FjAstronomy,
    #[serde(default)]
    forecast: Vec<FjForecastDay>,
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    location_id: Ident,
    name: String,
    admin1: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    places: Vec<GeoPlace>,
}

/// Turn a decoded response into a snapshot. Only the current condition is
/// required; every other member falls back to a neutral value.
fn snapshot_from_response(
    parsed: FjResponse,
    location: &Location,
    transport: TransportUnits,
    forecast_days: u8,
) -> Result<WeatherSnapshot, FetchError> {
    let condition = parsed
        .condition
        .ok_or_else(|| FetchError::Parse("response has no current condition".to_string()))?;

    let temperature = number(&condition.temperature).ok_or_else(|| {
        FetchError::Parse("current condition has no temperature".to_string())
    })?;

    let units = provider_units(&parsed.units, transport.provider_units());

    let location_name = if location.name.trim().is_empty() {
        parsed.location.city.unwrap_or_else(|| "Unknown".to_string())
    } else {
        location.name.clone()
    };

    let forecast = parsed
        .forecast
        .into_iter()
        .take(usize::from(forecast_days))
        .enumerate()
        .map(|(offset, day)| ForecastDay {
            day_offset: offset as u32,
            weekday: day.day.as_deref().and_then(|d| d.trim().parse::<Weekday>().ok()),
            condition_code: code(&day.code),
            low: number(&day.low_temperature).unwrap_or(temperature),
            high: number(&day.high_temperature).unwrap_or(temperature),
            text: day.text.unwrap_or_default(),
        })
        .collect();

    Ok(WeatherSnapshot {
        location_name,
        condition_code: code(&condition.code),
        condition_text: condition.text.unwrap_or_default(),
        temperature,
        feels_like: number(&parsed.wind.chill).unwrap_or(temperature),
        humidity_pct: number(&parsed.atmosphere.humidity).unwrap_or(0.0),
        pressure: number(&parsed.atmosphere.pressure).unwrap_or(0.0),
        visibility: number(&parsed.atmosphere.visibility),
        wind_speed: number(&parsed.wind.speed).unwrap_or(0.0),
        wind_direction_deg: number(&parsed.wind.direction).unwrap_or(0.0),
        units,
        sunrise: parsed.astronomy.sunrise.as_deref().and_then(parse_clock),
        sunset: parsed.astronomy.sunset.as_deref().and_then(parse_clock),
        forecast,
    })
}

fn code(field: &Option<Number>) -> i32 {
    number(field).map(|c| c as i32).unwrap_or(CODE_NOT_AVAILABLE)
}

fn provider_units(units: &FjUnits, fallback: ProviderUnits) -> ProviderUnits {
    ProviderUnits {
        temperature: units
            .temperature
            .as_deref()
            .and_then(TemperatureUnit::from_provider)
            .unwrap_or(fallback.temperature),
        speed: units.speed.as_deref().and_then(SpeedUnit::from_provider).unwrap_or(fallback.speed),
        pressure: units
            .pressure
            .as_deref()
            .and_then(PressureUnit::from_provider)
            .unwrap_or(fallback.pressure),
        distance: units
            .distance
            .as_deref()
            .and_then(DistanceUnit::from_provider)
            .unwrap_or(fallback.distance),
    }
}

/// Parse a wall-clock time such as "6:30 am" or "18:45".
fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim().to_uppercase();
    ["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&text, format).ok())
}

/// Pick the single place a query means, if there is one.
fn choose_place(query: &str, places: Vec<GeoPlace>) -> Result<Location, GeocodeError> {
    let mut candidates: Vec<Location> = places
        .into_iter()
        .map(|place| Location {
            id: Some(place.location_id.into_string()),
            name: place.name,
            region: place.admin1,
            country: place.country,
        })
        .collect();

    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    if candidates.is_empty() {
        return Err(GeocodeError::NotFound(query.to_string()));
    }

    let wanted = query.trim().to_lowercase();
    let exact: Vec<&Location> =
        candidates.iter().filter(|c| c.name.to_lowercase() == wanted).collect();

    match exact.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(GeocodeError::Ambiguous { query: query.to_string(), candidates }),
    }
}

#[async_trait]
impl WeatherClient for ForecastJsonProvider {
    #[instrument(skip(self, location, units), fields(location = %location))]
    async fn fetch(
        &self,
        location: &Location,
        units: &UnitPreferences,
        forecast_days: u8,
    ) -> Result<WeatherSnapshot, FetchError> {
        let transport = TransportUnits::for_preferences(units);
        let query = self.forecast_query(location, transport, forecast_days);

        debug!(url = %self.forecast_url(), "Fetching forecast");

        let res = self
            .http
            .get(self.forecast_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, "Forecast request failed");
            return Err(FetchError::Network(format!(
                "forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        let parsed: FjResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        snapshot_from_response(parsed, location, transport, forecast_days)
    }

    #[instrument(skip(self))]
    async fn resolve_location(&self, name: &str) -> Result<Location, GeocodeError> {
        if name.trim().is_empty() {
            return Err(GeocodeError::NotFound(name.to_string()));
        }

        let mut query = vec![("q", name.trim().to_string())];
        if let Some(key) = &self.api_key {
            query.push(("appid", key.clone()));
        }

        let res = self
            .http
            .get(self.geocode_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(GeocodeError::Network(format!(
                "geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: GeoResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

        choose_place(name, parsed.places)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
