//! Core library for the `panel-weather` host.
//!
//! This crate defines:
//! - Unit conversions and the condition-code catalog
//! - Settings persistence with per-key change notification
//! - The forecast client and the snapshot model it produces
//! - Rendering of snapshots into plain display strings
//! - The refresh controller that ties them together
//!
//! It is used by `panel-weather`, but any host that implements
//! [`DisplaySink`] can drive a [`RefreshController`].

pub mod condition;
pub mod controller;
pub mod display;
pub mod location;
pub mod model;
pub mod provider;
pub mod render;
pub mod settings;
pub mod units;

pub use controller::{ControllerHandle, RefreshController, RefreshError, RefreshState};
pub use display::{DisplaySink, PanelPosition, Placeholder, WeatherView};
pub use location::Location;
pub use model::WeatherSnapshot;
pub use provider::{FetchError, ForecastJsonProvider, GeocodeError, WeatherClient};
pub use settings::{FileSettings, MemorySettings, SettingKey, Settings, SettingsStore};
pub use units::UnitPreferences;
