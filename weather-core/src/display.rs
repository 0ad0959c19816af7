//! The host's display surfaces.
//!
//! Everything that crosses this boundary is plain data: strings and icon
//! names, already converted and formatted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::FALLBACK_ICON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelPosition {
    #[default]
    Center,
    Right,
    Left,
}

impl fmt::Display for PanelPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanelPosition::Center => "center",
            PanelPosition::Right => "right",
            PanelPosition::Left => "left",
        })
    }
}

/// One forecast day, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastView {
    pub day: String,
    pub icon: String,
    pub summary: String,
    pub temperature: String,
}

/// A fully rendered snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherView {
    pub icon: String,
    /// Text next to the panel icon; `None` hides the label.
    pub panel_text: Option<String>,
    pub summary: String,
    pub location: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub pressure: String,
    pub wind: String,
    pub visibility: Option<String>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub forecast: Vec<ForecastView>,
    /// Set when the view shows data that could not be refreshed.
    pub notice: Option<String>,
}

/// What the panel shows when there is no weather to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub icon: String,
    pub panel_text: String,
    pub message: String,
}

impl Placeholder {
    pub fn no_location() -> Self {
        Self {
            icon: FALLBACK_ICON.to_string(),
            panel_text: "--".to_string(),
            message: "No location configured".to_string(),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            icon: FALLBACK_ICON.to_string(),
            panel_text: "--".to_string(),
            message: format!("No weather information: {reason}"),
        }
    }
}

/// Display surfaces driven by the refresh controller.
pub trait DisplaySink: Send {
    fn set_position(&mut self, position: PanelPosition);

    fn show_loading(&mut self);

    /// Publish a complete view. Called once per render.
    fn show_weather(&mut self, view: &WeatherView);

    fn show_placeholder(&mut self, placeholder: &Placeholder);

    /// Whether the active icon theme has `name`.
    fn has_icon(&self, _name: &str) -> bool {
        true
    }
}
