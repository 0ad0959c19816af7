//! Unit conversions for temperature, wind speed, pressure and distance.
//!
//! Every quantity is routed through one base unit (Celsius, mph, pascals,
//! metres) so each unit only needs a formula to and from its base. Values are
//! never rounded here; rounding happens when a value is formatted for display.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A unit name that did not match any known unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} unit '{value}'. Supported units: {supported}.")]
pub struct UnknownUnit {
    kind: &'static str,
    value: String,
    supported: String,
}

macro_rules! named_units {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn all() -> &'static [$ty] {
                &[$($ty::$variant),+]
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownUnit;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let lower = value.trim().to_lowercase();
                $ty::all()
                    .iter()
                    .copied()
                    .find(|unit| unit.as_str() == lower)
                    .ok_or_else(|| UnknownUnit {
                        kind: $kind,
                        value: value.to_string(),
                        supported: $ty::all()
                            .iter()
                            .map(|unit| unit.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
    Rankine,
    Reaumur,
    Roemer,
    Delisle,
    Newton,
}

named_units!(TemperatureUnit, "temperature", {
    Celsius => "celsius",
    Fahrenheit => "fahrenheit",
    Kelvin => "kelvin",
    Rankine => "rankine",
    Reaumur => "reaumur",
    Roemer => "roemer",
    Delisle => "delisle",
    Newton => "newton",
});

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
            TemperatureUnit::Rankine => "°Ra",
            TemperatureUnit::Reaumur => "°Ré",
            TemperatureUnit::Roemer => "°Rø",
            TemperatureUnit::Delisle => "°De",
            TemperatureUnit::Newton => "°N",
        }
    }

    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) / 1.8,
            TemperatureUnit::Kelvin => value - 273.15,
            TemperatureUnit::Rankine => value / 1.8 - 273.15,
            TemperatureUnit::Reaumur => value / 0.8,
            TemperatureUnit::Roemer => (value - 7.5) * 40.0 / 21.0,
            TemperatureUnit::Delisle => 100.0 - value / 1.5,
            TemperatureUnit::Newton => value / 0.33,
        }
    }

    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 1.8 + 32.0,
            TemperatureUnit::Kelvin => celsius + 273.15,
            TemperatureUnit::Rankine => (celsius + 273.15) * 1.8,
            TemperatureUnit::Reaumur => celsius * 0.8,
            TemperatureUnit::Roemer => celsius * 21.0 / 40.0 + 7.5,
            TemperatureUnit::Delisle => (100.0 - celsius) * 1.5,
            TemperatureUnit::Newton => celsius * 0.33,
        }
    }

    /// Parse the unit code a provider reports ("F", "C").
    pub fn from_provider(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "F" => Some(TemperatureUnit::Fahrenheit),
            "C" => Some(TemperatureUnit::Celsius),
            "K" => Some(TemperatureUnit::Kelvin),
            _ => None,
        }
    }
}

pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    to.from_celsius(from.to_celsius(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Kph,
    Mph,
    Mps,
    Knots,
    Fps,
    Beaufort,
}

named_units!(SpeedUnit, "speed", {
    Kph => "kph",
    Mph => "mph",
    Mps => "mps",
    Knots => "knots",
    Fps => "fps",
    Beaufort => "beaufort",
});

/// Lower bound in mph of each Beaufort force.
const BEAUFORT_FLOOR_MPH: [f64; 13] =
    [0.0, 1.0, 4.0, 8.0, 13.0, 18.0, 25.0, 31.0, 39.0, 47.0, 55.0, 64.0, 73.0];

impl SpeedUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            SpeedUnit::Kph => "km/h",
            SpeedUnit::Mph => "mph",
            SpeedUnit::Mps => "m/s",
            SpeedUnit::Knots => "kn",
            SpeedUnit::Fps => "ft/s",
            SpeedUnit::Beaufort => "Bft",
        }
    }

    pub fn to_mph(self, value: f64) -> f64 {
        match self {
            SpeedUnit::Beaufort => {
                let force = value.round().clamp(0.0, 12.0) as usize;
                BEAUFORT_FLOOR_MPH[force]
            }
            unit => value / unit.per_mph(),
        }
    }

    /// Convert from mph. For Beaufort this is the force number.
    pub fn from_mph(self, mph: f64) -> f64 {
        match self {
            SpeedUnit::Beaufort => f64::from(beaufort(mph).force),
            unit => mph * unit.per_mph(),
        }
    }

    fn per_mph(self) -> f64 {
        match self {
            SpeedUnit::Kph => 1.609344,
            SpeedUnit::Mph => 1.0,
            SpeedUnit::Mps => 0.44704,
            SpeedUnit::Knots => 0.868976,
            SpeedUnit::Fps => 1.466667,
            SpeedUnit::Beaufort => 1.0,
        }
    }

    pub fn decimals(&self) -> usize {
        match self {
            SpeedUnit::Mps => 1,
            _ => 0,
        }
    }

    /// Parse the speed unit a provider reports ("mph", "km/h").
    pub fn from_provider(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "mph" => Some(SpeedUnit::Mph),
            "km/h" | "kph" | "kmh" => Some(SpeedUnit::Kph),
            "m/s" | "mps" => Some(SpeedUnit::Mps),
            "kn" | "kt" | "knots" => Some(SpeedUnit::Knots),
            "ft/s" | "fps" => Some(SpeedUnit::Fps),
            _ => None,
        }
    }
}

pub fn convert_speed(value: f64, from: SpeedUnit, to: SpeedUnit) -> f64 {
    to.from_mph(from.to_mph(value))
}

/// A wind force on the Beaufort scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beaufort {
    pub force: u8,
    pub label: &'static str,
}

const BEAUFORT_LABELS: [&str; 13] = [
    "Calm",
    "Light air",
    "Light breeze",
    "Gentle breeze",
    "Moderate breeze",
    "Fresh breeze",
    "Strong breeze",
    "Near gale",
    "Gale",
    "Strong gale",
    "Storm",
    "Violent storm",
    "Hurricane",
];

/// Upper bound (inclusive) in mph of forces 1 to 10. Force 11 covers
/// everything below 73 mph and force 12 everything from 73 mph up.
const BEAUFORT_CEILING_MPH: [f64; 10] = [3.0, 7.0, 12.0, 17.0, 24.0, 30.0, 38.0, 46.0, 54.0, 63.0];

/// Map a wind speed in mph onto the Beaufort scale.
pub fn beaufort(mph: f64) -> Beaufort {
    let force = if mph < 1.0 {
        0
    } else if let Some(idx) = BEAUFORT_CEILING_MPH.iter().position(|&ceiling| mph <= ceiling) {
        idx + 1
    } else if mph < 73.0 {
        11
    } else {
        12
    };

    Beaufort { force: force as u8, label: BEAUFORT_LABELS[force] }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    #[default]
    Hpa,
    InHg,
    Bar,
    Pa,
    Kpa,
    Atm,
    At,
    Torr,
    Psi,
}

named_units!(PressureUnit, "pressure", {
    Hpa => "hpa",
    InHg => "inhg",
    Bar => "bar",
    Pa => "pa",
    Kpa => "kpa",
    Atm => "atm",
    At => "at",
    Torr => "torr",
    Psi => "psi",
});

impl PressureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureUnit::Hpa => "hPa",
            PressureUnit::InHg => "inHg",
            PressureUnit::Bar => "bar",
            PressureUnit::Pa => "Pa",
            PressureUnit::Kpa => "kPa",
            PressureUnit::Atm => "atm",
            PressureUnit::At => "at",
            PressureUnit::Torr => "Torr",
            PressureUnit::Psi => "psi",
        }
    }

    fn pascals_per_unit(self) -> f64 {
        match self {
            PressureUnit::Hpa => 100.0,
            PressureUnit::InHg => 3386.39,
            PressureUnit::Bar => 100_000.0,
            PressureUnit::Pa => 1.0,
            PressureUnit::Kpa => 1000.0,
            PressureUnit::Atm => 101_325.0,
            PressureUnit::At => 98_066.5,
            PressureUnit::Torr => 133.322368,
            PressureUnit::Psi => 6894.757,
        }
    }

    pub fn decimals(&self) -> usize {
        match self {
            PressureUnit::Hpa | PressureUnit::Pa | PressureUnit::Torr => 0,
            PressureUnit::Kpa => 1,
            PressureUnit::InHg | PressureUnit::Psi => 2,
            PressureUnit::Bar | PressureUnit::Atm | PressureUnit::At => 3,
        }
    }

    /// Parse the pressure unit a provider reports ("in", "mb").
    pub fn from_provider(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "in" | "inhg" => Some(PressureUnit::InHg),
            "mb" | "hpa" => Some(PressureUnit::Hpa),
            "kpa" => Some(PressureUnit::Kpa),
            "pa" => Some(PressureUnit::Pa),
            _ => None,
        }
    }
}

/// Raw provider pressure to pascals.
///
/// Inches of mercury from the provider are temperature compensated, so the
/// conversion factor depends on the current temperature in Fahrenheit.
pub fn pressure_to_pascals(raw: f64, from: PressureUnit, temperature_f: f64) -> f64 {
    match from {
        PressureUnit::InHg => raw * (3386.39 - (temperature_f - 32.0) * 0.003407143),
        unit => raw * unit.pascals_per_unit(),
    }
}

pub fn convert_pressure(
    raw: f64,
    from: PressureUnit,
    to: PressureUnit,
    temperature_f: f64,
) -> f64 {
    pressure_to_pascals(raw, from, temperature_f) / to.pascals_per_unit()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Km,
    M,
    Miles,
}

named_units!(DistanceUnit, "distance", {
    Km => "km",
    M => "m",
    Miles => "miles",
});

impl DistanceUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            DistanceUnit::Km => "km",
            DistanceUnit::M => "m",
            DistanceUnit::Miles => "mi",
        }
    }

    fn metres_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Km => 1000.0,
            DistanceUnit::M => 1.0,
            DistanceUnit::Miles => 1609.344,
        }
    }

    pub fn decimals(&self) -> usize {
        match self {
            DistanceUnit::M => 0,
            _ => 1,
        }
    }

    /// Parse the distance unit a provider reports ("mi", "km").
    pub fn from_provider(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "mi" | "miles" => Some(DistanceUnit::Miles),
            "km" => Some(DistanceUnit::Km),
            "m" => Some(DistanceUnit::M),
            _ => None,
        }
    }
}

pub fn convert_distance(value: f64, from: DistanceUnit, to: DistanceUnit) -> f64 {
    value * from.metres_per_unit() / to.metres_per_unit()
}

/// The user's choice of display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitPreferences {
    pub temperature: TemperatureUnit,
    pub speed: SpeedUnit,
    pub pressure: PressureUnit,
    pub distance: DistanceUnit,
    /// Arrows instead of compass letters for the wind direction.
    pub wind_direction_arrows: bool,
}

impl Default for UnitPreferences {
    fn default() -> Self {
        Self {
            temperature: TemperatureUnit::default(),
            speed: SpeedUnit::default(),
            pressure: PressureUnit::default(),
            distance: DistanceUnit::default(),
            wind_direction_arrows: true,
        }
    }
}

const COMPASS_LETTERS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
const COMPASS_ARROWS: [&str; 8] = ["↑", "↗", "→", "↘", "↓", "↙", "←", "↖"];

/// Eight-point compass label for a bearing, as letters or as an arrow
/// pointing along the bearing.
pub fn wind_direction(degrees: f64, arrows: bool) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let index = (normalized / 45.0).round() as usize % 8;
    if arrows { COMPASS_ARROWS[index] } else { COMPASS_LETTERS[index] }
}
