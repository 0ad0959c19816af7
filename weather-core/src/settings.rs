use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    display::PanelPosition,
    location::Location,
    units::{DistanceUnit, PressureUnit, SpeedUnit, TemperatureUnit, UnitPreferences},
};

pub mod store;

pub use store::{FileSettings, MemorySettings, SettingsStore};

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 240;
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_FORECAST_DAYS: u8 = 2;
pub const MAX_FORECAST_DAYS: u8 = 10;

/// Names a single setting in change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    TemperatureUnit,
    SpeedUnit,
    PressureUnit,
    DistanceUnit,
    WindDirection,
    Cities,
    ActiveCity,
    SymbolicIcons,
    TextInPanel,
    CommentInPanel,
    TranslateCondition,
    PositionInPanel,
    RefreshInterval,
    ForecastDays,
    Debug,
    Provider,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::TemperatureUnit => "temperature-unit",
            SettingKey::SpeedUnit => "speed-unit",
            SettingKey::PressureUnit => "pressure-unit",
            SettingKey::DistanceUnit => "distance-unit",
            SettingKey::WindDirection => "wind-direction",
            SettingKey::Cities => "city",
            SettingKey::ActiveCity => "actual-city",
            SettingKey::SymbolicIcons => "use-symbolic-icons",
            SettingKey::TextInPanel => "show-text-in-panel",
            SettingKey::CommentInPanel => "show-comment-in-panel",
            SettingKey::TranslateCondition => "translate-condition",
            SettingKey::PositionInPanel => "position-in-panel",
            SettingKey::RefreshInterval => "refresh-interval",
            SettingKey::ForecastDays => "forecast-days",
            SettingKey::Debug => "debug-extension",
            SettingKey::Provider => "provider",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach the weather provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as the `appid` query parameter when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://weather.yahooapis.com".to_string()
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("panel-weather/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Everything the widget keeps in its settings file.
///
/// Example TOML:
/// ```toml
/// temperature_unit = "fahrenheit"
/// active_city = 0
///
/// [[cities]]
/// id = "5128581"
/// name = "New York"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub speed_unit: SpeedUnit,
    pub pressure_unit: PressureUnit,
    pub distance_unit: DistanceUnit,
    pub wind_direction_arrows: bool,
    pub active_city: usize,
    pub use_symbolic_icons: bool,
    pub show_text_in_panel: bool,
    pub show_comment_in_panel: bool,
    pub translate_condition: bool,
    pub position_in_panel: PanelPosition,
    pub refresh_interval_secs: u64,
    pub forecast_days: u8,
    pub debug: bool,

    // Tables go last so the TOML stays readable.
    pub cities: Vec<Location>,
    pub provider: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::default(),
            speed_unit: SpeedUnit::default(),
            pressure_unit: PressureUnit::default(),
            distance_unit: DistanceUnit::default(),
            wind_direction_arrows: true,
            active_city: 0,
            use_symbolic_icons: false,
            show_text_in_panel: true,
            show_comment_in_panel: false,
            translate_condition: true,
            position_in_panel: PanelPosition::default(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            forecast_days: DEFAULT_FORECAST_DAYS,
            debug: false,
            cities: Vec::new(),
            provider: ProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Active city index, clamped to the city list. Out of range means 0.
    pub fn active_index(&self) -> usize {
        if self.active_city < self.cities.len() { self.active_city } else { 0 }
    }

    pub fn active_location(&self) -> Option<&Location> {
        self.cities.get(self.active_index())
    }

    pub fn set_active_index(&mut self, index: usize) {
        self.active_city = index;
        self.active_city = self.active_index();
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(MIN_REFRESH_INTERVAL_SECS))
    }

    pub fn forecast_days(&self) -> u8 {
        self.forecast_days.clamp(1, MAX_FORECAST_DAYS)
    }

    pub fn unit_preferences(&self) -> UnitPreferences {
        UnitPreferences {
            temperature: self.temperature_unit,
            speed: self.speed_unit,
            pressure: self.pressure_unit,
            distance: self.distance_unit,
            wind_direction_arrows: self.wind_direction_arrows,
        }
    }

    /// Copy with every derived invariant re-applied.
    pub fn normalized(mut self) -> Self {
        self.active_city = self.active_index();
        self.forecast_days = self.forecast_days();
        self
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn changed_keys(&self, other: &Settings) -> Vec<SettingKey> {
        let mut keys = Vec::new();
        let mut check = |changed: bool, key: SettingKey| {
            if changed {
                keys.push(key);
            }
        };

        check(self.temperature_unit != other.temperature_unit, SettingKey::TemperatureUnit);
        check(self.speed_unit != other.speed_unit, SettingKey::SpeedUnit);
        check(self.pressure_unit != other.pressure_unit, SettingKey::PressureUnit);
        check(self.distance_unit != other.distance_unit, SettingKey::DistanceUnit);
        check(self.wind_direction_arrows != other.wind_direction_arrows, SettingKey::WindDirection);
        check(self.cities != other.cities, SettingKey::Cities);
        check(self.active_index() != other.active_index(), SettingKey::ActiveCity);
        check(self.use_symbolic_icons != other.use_symbolic_icons, SettingKey::SymbolicIcons);
        check(self.show_text_in_panel != other.show_text_in_panel, SettingKey::TextInPanel);
        check(self.show_comment_in_panel != other.show_comment_in_panel, SettingKey::CommentInPanel);
        check(self.translate_condition != other.translate_condition, SettingKey::TranslateCondition);
        check(self.position_in_panel != other.position_in_panel, SettingKey::PositionInPanel);
        check(self.refresh_interval() != other.refresh_interval(), SettingKey::RefreshInterval);
        check(self.forecast_days() != other.forecast_days(), SettingKey::ForecastDays);
        check(self.debug != other.debug, SettingKey::Debug);
        check(self.provider != other.provider, SettingKey::Provider);

        keys
    }

    /// Load settings from the default location, or defaults if there is no
    /// file yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no settings file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings.normalized())
    }

    /// Save settings to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save settings, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the settings file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("net", "panel-weather", "panel-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("settings.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cities() -> Settings {
        Settings {
            cities: vec![Location::new("5128581", "New York"), Location::new("638242", "Berlin")],
            ..Settings::default()
        }
    }

    #[test]
    fn active_index_out_of_range_defaults_to_zero() {
        let mut settings = two_cities();
        settings.active_city = 7;
        assert_eq!(settings.active_index(), 0);
        assert_eq!(settings.active_location().map(|l| l.name.as_str()), Some("New York"));

        settings.set_active_index(1);
        assert_eq!(settings.active_city, 1);

        settings.set_active_index(2);
        assert_eq!(settings.active_city, 0);
    }

    #[test]
    fn active_index_reclamps_when_list_shrinks() {
        let mut settings = two_cities();
        settings.set_active_index(1);
        settings.cities.pop();
        assert_eq!(settings.active_index(), 0);

        settings.cities.clear();
        assert_eq!(settings.active_index(), 0);
        assert!(settings.active_location().is_none());
    }

    #[test]
    fn refresh_interval_has_a_floor() {
        let mut settings = Settings::default();
        assert_eq!(settings.refresh_interval(), Duration::from_secs(240));

        settings.refresh_interval_secs = 0;
        assert_eq!(settings.refresh_interval(), Duration::from_secs(MIN_REFRESH_INTERVAL_SECS));
    }

    #[test]
    fn changed_keys_reports_each_field() {
        let before = two_cities();
        let mut after = before.clone();
        assert!(before.changed_keys(&after).is_empty());

        after.temperature_unit = TemperatureUnit::Kelvin;
        after.set_active_index(1);
        after.position_in_panel = PanelPosition::Left;

        assert_eq!(
            before.changed_keys(&after),
            vec![SettingKey::TemperatureUnit, SettingKey::ActiveCity, SettingKey::PositionInPanel]
        );
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = two_cities();
        settings.temperature_unit = TemperatureUnit::Fahrenheit;
        settings.speed_unit = SpeedUnit::Beaufort;
        settings.set_active_index(1);
        settings.provider.api_key = Some("KEY".into());

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "temperature_unit = \"kelvin\"\nactive_city = 4\n\n[[cities]]\nname = \"Berlin\"\n",
        )
        .unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.temperature_unit, TemperatureUnit::Kelvin);
        assert_eq!(loaded.active_city, 0);
        assert_eq!(loaded.cities, vec![Location::unresolved("Berlin")]);
        assert_eq!(loaded.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "temperature_unit = [").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }
}
