//! Provider condition codes mapped onto icon categories and display text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Code the provider sends when no condition is available.
pub const CODE_NOT_AVAILABLE: i32 = 3200;

/// Icon name used when nothing better can be shown.
pub const FALLBACK_ICON: &str = "weather-severe-alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconCategory {
    Clear,
    ClearNight,
    FewClouds,
    FewCloudsNight,
    Overcast,
    Fog,
    Showers,
    ShowersScattered,
    FreezingRain,
    Snow,
    SnowRain,
    Storm,
    SevereAlert,
}

impl IconCategory {
    pub fn icon_name(&self) -> &'static str {
        match self {
            IconCategory::Clear => "weather-clear",
            IconCategory::ClearNight => "weather-clear-night",
            IconCategory::FewClouds => "weather-few-clouds",
            IconCategory::FewCloudsNight => "weather-few-clouds-night",
            IconCategory::Overcast => "weather-overcast",
            IconCategory::Fog => "weather-fog",
            IconCategory::Showers => "weather-showers",
            IconCategory::ShowersScattered => "weather-showers-scattered",
            IconCategory::FreezingRain => "weather-freezing-rain",
            IconCategory::Snow => "weather-snow",
            IconCategory::SnowRain => "weather-snow-rain",
            IconCategory::Storm => "weather-storm",
            IconCategory::SevereAlert => FALLBACK_ICON,
        }
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.icon_name();
        f.write_str(name.strip_prefix("weather-").unwrap_or(name))
    }
}

/// Normalized view of one provider condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub category: IconCategory,
    /// Icon names to try in order. The category's own icon is always among them.
    pub icons: &'static [&'static str],
    pub text: &'static str,
    /// Only clear and cloudy codes come in night variants.
    pub night: bool,
}

const fn plain(category: IconCategory, icons: &'static [&'static str], text: &'static str) -> Condition {
    Condition { category, icons, text, night: false }
}

const fn night(category: IconCategory, icons: &'static [&'static str], text: &'static str) -> Condition {
    Condition { category, icons, text, night: true }
}

const NOT_AVAILABLE: Condition =
    plain(IconCategory::SevereAlert, &[FALLBACK_ICON], "Not available");

/// Look up a provider condition code. Unknown codes map to the severe-alert
/// icon and "Not available".
pub fn classify(code: i32) -> Condition {
    use IconCategory::*;

    match code {
        0 => plain(SevereAlert, &["weather-severe-alert"], "Tornado"),
        1 => plain(SevereAlert, &["weather-severe-alert"], "Tropical storm"),
        2 => plain(SevereAlert, &["weather-severe-alert"], "Hurricane"),
        3 => plain(SevereAlert, &["weather-severe-alert"], "Severe thunderstorms"),
        4 => plain(Storm, &["weather-storm"], "Thunderstorms"),
        5 => plain(SnowRain, &["weather-snow-rain", "weather-snow"], "Mixed rain and snow"),
        6 => plain(SnowRain, &["weather-snow-rain", "weather-snow"], "Mixed rain and sleet"),
        7 => plain(Snow, &["weather-snow"], "Mixed snow and sleet"),
        8 => plain(FreezingRain, &["weather-freezing-rain", "weather-showers"], "Freezing drizzle"),
        9 => plain(Fog, &["weather-fog"], "Drizzle"),
        10 => plain(FreezingRain, &["weather-freezing-rain", "weather-showers"], "Freezing rain"),
        11 | 12 => plain(Showers, &["weather-showers"], "Showers"),
        13 => plain(Snow, &["weather-snow"], "Snow flurries"),
        14 => plain(Snow, &["weather-snow"], "Light snow showers"),
        15 => plain(Snow, &["weather-snow"], "Blowing snow"),
        16 => plain(Snow, &["weather-snow"], "Snow"),
        17 => plain(Snow, &["weather-snow"], "Hail"),
        18 => plain(Snow, &["weather-snow"], "Sleet"),
        19 => plain(Fog, &["weather-fog"], "Dust"),
        20 => plain(Fog, &["weather-fog"], "Foggy"),
        21 => plain(Fog, &["weather-fog"], "Haze"),
        22 => plain(Fog, &["weather-fog"], "Smoky"),
        23 => plain(FewClouds, &["weather-few-clouds"], "Blustery"),
        24 => plain(FewClouds, &["weather-few-clouds"], "Windy"),
        25 => plain(FewClouds, &["weather-few-clouds"], "Cold"),
        26 => plain(Overcast, &["weather-overcast"], "Cloudy"),
        27 => night(FewCloudsNight, &["weather-clouds-night", "weather-few-clouds-night"], "Mostly cloudy"),
        28 => plain(Overcast, &["weather-clouds", "weather-overcast"], "Mostly cloudy"),
        29 => night(FewCloudsNight, &["weather-few-clouds-night"], "Partly cloudy"),
        30 => plain(FewClouds, &["weather-few-clouds"], "Partly cloudy"),
        31 => night(ClearNight, &["weather-clear-night"], "Clear"),
        32 => plain(Clear, &["weather-clear"], "Sunny"),
        33 => night(ClearNight, &["weather-clear-night"], "Fair"),
        34 => plain(Clear, &["weather-clear"], "Fair"),
        35 => plain(SnowRain, &["weather-snow-rain", "weather-showers"], "Mixed rain and hail"),
        36 => plain(Clear, &["weather-clear"], "Hot"),
        37 => plain(Storm, &["weather-storm"], "Isolated thunderstorms"),
        38 | 39 => plain(Storm, &["weather-storm"], "Scattered thunderstorms"),
        40 => plain(ShowersScattered, &["weather-showers-scattered", "weather-showers"], "Scattered showers"),
        41 | 43 => plain(Snow, &["weather-snow"], "Heavy snow"),
        42 => plain(Snow, &["weather-snow"], "Scattered snow showers"),
        44 => plain(FewClouds, &["weather-few-clouds"], "Partly cloudy"),
        45 => plain(Storm, &["weather-storm"], "Thundershowers"),
        46 => plain(Snow, &["weather-snow"], "Snow showers"),
        47 => plain(Storm, &["weather-storm"], "Isolated thundershowers"),
        _ => NOT_AVAILABLE,
    }
}

/// First candidate the icon theme can show, or the severe-alert icon.
pub fn pick_icon<F>(candidates: &[&'static str], has_icon: F) -> &'static str
where
    F: Fn(&str) -> bool,
{
    candidates
        .iter()
        .copied()
        .find(|name| has_icon(name))
        .unwrap_or(FALLBACK_ICON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_documented_code_has_icons_and_text() {
        for code in (0..=47).chain([CODE_NOT_AVAILABLE]) {
            let condition = classify(code);
            assert!(!condition.icons.is_empty(), "code {code} has no icons");
            assert!(!condition.text.is_empty(), "code {code} has no text");
        }
    }

    #[test]
    fn candidates_include_the_category_icon() {
        for code in (0..=47).chain([CODE_NOT_AVAILABLE]) {
            let condition = classify(code);
            assert!(condition.icons.contains(&condition.category.icon_name()), "code {code}");
        }
    }

    #[test]
    fn unknown_codes_fall_back_to_severe_alert() {
        for code in [-1, 48, 100, 3199, 3201] {
            let condition = classify(code);
            assert_eq!(condition.category, IconCategory::SevereAlert);
            assert_eq!(condition.text, "Not available");
        }
        assert_eq!(classify(CODE_NOT_AVAILABLE).text, "Not available");
    }

    #[test]
    fn night_variants_only_for_clear_and_cloudy() {
        let night_codes: Vec<i32> = (0..=47).filter(|&code| classify(code).night).collect();
        assert_eq!(night_codes, vec![27, 29, 31, 33]);
        assert_eq!(classify(31).category, IconCategory::ClearNight);
        assert_eq!(classify(32).category, IconCategory::Clear);
    }

    #[test]
    fn pick_icon_prefers_the_first_available_candidate() {
        let candidates = classify(28).icons;
        assert_eq!(pick_icon(candidates, |_| true), "weather-clouds");
        assert_eq!(pick_icon(candidates, |name| name == "weather-overcast"), "weather-overcast");
        assert_eq!(pick_icon(candidates, |_| false), FALLBACK_ICON);
    }

    #[test]
    fn category_display_drops_prefix() {
        assert_eq!(IconCategory::FewCloudsNight.to_string(), "few-clouds-night");
        assert_eq!(IconCategory::Clear.to_string(), "clear");
    }
}
