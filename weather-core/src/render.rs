//! Turns a snapshot into display strings.
//!
//! Rendering always starts from the snapshot's raw provider values, so
//! rendering the same snapshot with the same preferences gives the same view.

use chrono::{NaiveTime, Weekday};

use crate::{
    condition::{classify, pick_icon},
    display::{ForecastView, WeatherView},
    model::{ForecastDay, WeatherSnapshot},
    settings::Settings,
    units::{
        SpeedUnit, TemperatureUnit, UnitPreferences, beaufort, convert_distance,
        convert_pressure, convert_speed, convert_temperature, wind_direction,
    },
};

/// The display-only part of the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPreferences {
    pub units: UnitPreferences,
    pub symbolic_icons: bool,
    pub text_in_panel: bool,
    pub comment_in_panel: bool,
    pub translate_condition: bool,
}

impl From<&Settings> for DisplayPreferences {
    fn from(settings: &Settings) -> Self {
        Self {
            units: settings.unit_preferences(),
            symbolic_icons: settings.use_symbolic_icons,
            text_in_panel: settings.show_text_in_panel,
            comment_in_panel: settings.show_comment_in_panel,
            translate_condition: settings.translate_condition,
        }
    }
}

pub fn render(
    snapshot: &WeatherSnapshot,
    prefs: &DisplayPreferences,
    has_icon: &dyn Fn(&str) -> bool,
) -> WeatherView {
    let units = &prefs.units;
    let source = &snapshot.units;

    let summary = condition_text(snapshot.condition_code, &snapshot.condition_text, prefs);
    let temperature = format_temperature(snapshot.temperature, source.temperature, units.temperature);

    let panel_text = match (prefs.text_in_panel, prefs.comment_in_panel) {
        (false, _) => None,
        (true, false) => Some(temperature.clone()),
        (true, true) => Some(format!("{summary} {temperature}")),
    };

    let pressure = convert_pressure(
        snapshot.pressure,
        source.pressure,
        units.pressure,
        snapshot.temperature_f(),
    );

    let direction = wind_direction(snapshot.wind_direction_deg, units.wind_direction_arrows);
    let wind = match units.speed {
        SpeedUnit::Beaufort => {
            let force = beaufort(source.speed.to_mph(snapshot.wind_speed));
            format!("{direction} {} {} ({})", force.force, SpeedUnit::Beaufort.symbol(), force.label)
        }
        unit => {
            let speed = convert_speed(snapshot.wind_speed, source.speed, unit);
            format!("{direction} {} {}", format_number(speed, unit.decimals()), unit.symbol())
        }
    };

    let visibility = snapshot.visibility.map(|raw| {
        let value = convert_distance(raw, source.distance, units.distance);
        format!("{} {}", format_number(value, units.distance.decimals()), units.distance.symbol())
    });

    let forecast = snapshot
        .forecast
        .iter()
        .map(|day| render_forecast_day(day, source.temperature, prefs, has_icon))
        .collect();

    WeatherView {
        icon: icon_name(snapshot.condition_code, prefs.symbolic_icons, has_icon),
        panel_text,
        summary,
        location: snapshot.location_name.clone(),
        temperature,
        feels_like: format_temperature(snapshot.feels_like, source.temperature, units.temperature),
        humidity: format!("{} %", format_number(snapshot.humidity_pct, 0)),
        pressure: format!(
            "{} {}",
            format_number(pressure, units.pressure.decimals()),
            units.pressure.symbol()
        ),
        wind,
        visibility,
        sunrise: snapshot.sunrise.map(format_time),
        sunset: snapshot.sunset.map(format_time),
        forecast,
        notice: None,
    }
}

fn render_forecast_day(
    day: &ForecastDay,
    source: TemperatureUnit,
    prefs: &DisplayPreferences,
    has_icon: &dyn Fn(&str) -> bool,
) -> ForecastView {
    let target = prefs.units.temperature;
    let low = convert_temperature(day.low, source, target);
    let high = convert_temperature(day.high, source, target);

    ForecastView {
        day: day_label(day.day_offset, day.weekday),
        icon: icon_name(day.condition_code, prefs.symbolic_icons, has_icon),
        summary: condition_text(day.condition_code, &day.text, prefs),
        temperature: format!(
            "{}\u{2013}{} {}",
            format_number(low, 0),
            format_number(high, 0),
            target.symbol()
        ),
    }
}

fn icon_name(code: i32, symbolic: bool, has_icon: &dyn Fn(&str) -> bool) -> String {
    let suffix = if symbolic { "-symbolic" } else { "" };
    let name = pick_icon(classify(code).icons, |name| has_icon(&format!("{name}{suffix}")));
    format!("{name}{suffix}")
}

fn condition_text(code: i32, provider_text: &str, prefs: &DisplayPreferences) -> String {
    if prefs.translate_condition || provider_text.trim().is_empty() {
        classify(code).text.to_string()
    } else {
        provider_text.to_string()
    }
}

fn format_temperature(raw: f64, from: TemperatureUnit, to: TemperatureUnit) -> String {
    let value = convert_temperature(raw, from, to);
    format!("{} {}", format_number(value, 0), to.symbol())
}

/// Round to `decimals` places without ever printing "-0".
pub fn format_number(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.decimals$}")
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn day_label(offset: u32, weekday: Option<Weekday>) -> String {
    let relative = match offset {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        n => format!("In {n} days"),
    };

    match weekday {
        Some(day) => format!("{relative} ({})", weekday_name(day)),
        None => relative,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::ProviderUnits,
        units::{DistanceUnit, PressureUnit},
    };

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: "New York".into(),
            condition_code: 32,
            condition_text: "Sunny and bright".into(),
            temperature: 75.0,
            feels_like: 73.0,
            humidity_pct: 50.0,
            pressure: 30.0,
            visibility: Some(10.0),
            wind_speed: 10.0,
            wind_direction_deg: 180.0,
            units: ProviderUnits::IMPERIAL,
            sunrise: NaiveTime::from_hms_opt(6, 30, 0),
            sunset: NaiveTime::from_hms_opt(19, 45, 0),
            forecast: vec![
                ForecastDay {
                    day_offset: 0,
                    weekday: Some(Weekday::Mon),
                    condition_code: 30,
                    low: 60.0,
                    high: 78.0,
                    text: "Partly Cloudy".into(),
                },
                ForecastDay {
                    day_offset: 1,
                    weekday: None,
                    condition_code: 11,
                    low: 55.0,
                    high: 70.0,
                    text: "Showers".into(),
                },
            ],
        }
    }

    fn fahrenheit() -> DisplayPreferences {
        DisplayPreferences {
            units: UnitPreferences {
                temperature: TemperatureUnit::Fahrenheit,
                speed: SpeedUnit::Mph,
                pressure: PressureUnit::InHg,
                distance: DistanceUnit::Miles,
                wind_direction_arrows: true,
            },
            symbolic_icons: false,
            text_in_panel: true,
            comment_in_panel: false,
            translate_condition: true,
        }
    }

    fn any_icon(_: &str) -> bool {
        true
    }

    #[test]
    fn renders_current_conditions() {
        let view = render(&snapshot(), &fahrenheit(), &any_icon);

        assert_eq!(view.icon, "weather-clear");
        assert_eq!(view.panel_text.as_deref(), Some("75 °F"));
        assert_eq!(view.summary, "Sunny");
        assert_eq!(view.location, "New York");
        assert_eq!(view.temperature, "75 °F");
        assert_eq!(view.feels_like, "73 °F");
        assert_eq!(view.humidity, "50 %");
        assert_eq!(view.wind, "↓ 10 mph");
        assert_eq!(view.visibility.as_deref(), Some("10.0 mi"));
        assert_eq!(view.sunrise.as_deref(), Some("06:30"));
        assert_eq!(view.sunset.as_deref(), Some("19:45"));
        assert!(view.notice.is_none());
    }

    #[test]
    fn renders_forecast_days() {
        let view = render(&snapshot(), &fahrenheit(), &any_icon);

        assert_eq!(view.forecast.len(), 2);
        assert_eq!(view.forecast[0].day, "Today (Monday)");
        assert_eq!(view.forecast[0].temperature, "60\u{2013}78 °F");
        assert_eq!(view.forecast[0].icon, "weather-few-clouds");
        assert_eq!(view.forecast[1].day, "Tomorrow");
        assert_eq!(view.forecast[1].summary, "Showers");
    }

    #[test]
    fn celsius_is_converted_from_raw_values() {
        let mut prefs = fahrenheit();
        prefs.units.temperature = TemperatureUnit::Celsius;

        let view = render(&snapshot(), &prefs, &any_icon);
        assert_eq!(view.temperature, "24 °C");
        assert_eq!(view.forecast[0].temperature, "16\u{2013}26 °C");
    }

    #[test]
    fn rendering_twice_gives_identical_views() {
        let snapshot = snapshot();
        let prefs = fahrenheit();
        assert_eq!(render(&snapshot, &prefs, &any_icon), render(&snapshot, &prefs, &any_icon));
    }

    #[test]
    fn letters_and_beaufort_wind() {
        let mut prefs = fahrenheit();
        prefs.units.wind_direction_arrows = false;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).wind, "S 10 mph");

        prefs.units.speed = SpeedUnit::Beaufort;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).wind, "S 3 Bft (Gentle breeze)");

        prefs.units.speed = SpeedUnit::Kph;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).wind, "S 16 km/h");
    }

    #[test]
    fn pressure_uses_temperature_compensation() {
        let mut prefs = fahrenheit();
        prefs.units.pressure = PressureUnit::Hpa;

        // 30 inHg at 75 °F: 30 * (3386.39 - 43 * 0.003407143) Pa
        let view = render(&snapshot(), &prefs, &any_icon);
        assert_eq!(view.pressure, "1016 hPa");
    }

    #[test]
    fn panel_text_follows_toggles() {
        let mut prefs = fahrenheit();
        prefs.comment_in_panel = true;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).panel_text.as_deref(), Some("Sunny 75 °F"));

        prefs.text_in_panel = false;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).panel_text, None);
    }

    #[test]
    fn provider_text_when_not_translating() {
        let mut prefs = fahrenheit();
        prefs.translate_condition = false;
        assert_eq!(render(&snapshot(), &prefs, &any_icon).summary, "Sunny and bright");

        let mut blank = snapshot();
        blank.condition_text.clear();
        assert_eq!(render(&blank, &prefs, &any_icon).summary, "Sunny");
    }

    #[test]
    fn symbolic_icons_are_checked_against_the_theme() {
        let mut prefs = fahrenheit();
        prefs.symbolic_icons = true;

        let view = render(&snapshot(), &prefs, &any_icon);
        assert_eq!(view.icon, "weather-clear-symbolic");

        let view = render(&snapshot(), &prefs, &|name: &str| !name.starts_with("weather-clear"));
        assert_eq!(view.icon, "weather-severe-alert-symbolic");
    }

    #[test]
    fn format_number_never_prints_negative_zero() {
        assert_eq!(format_number(-0.4, 0), "0");
        assert_eq!(format_number(-0.6, 0), "-1");
        assert_eq!(format_number(2.346, 2), "2.35");
    }
}
