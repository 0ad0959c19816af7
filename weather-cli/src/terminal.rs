use panel_weather_core::{DisplaySink, PanelPosition, Placeholder, WeatherView};
use tracing::debug;

/// Prints what a panel would show. A terminal has no panel, so the position
/// is only logged.
#[derive(Debug, Default)]
pub struct TerminalSink {
    last_view: Option<WeatherView>,
}

impl DisplaySink for TerminalSink {
    fn set_position(&mut self, position: PanelPosition) {
        debug!(%position, "Panel position changed");
    }

    fn show_loading(&mut self) {
        println!("Loading weather...");
    }

    fn show_weather(&mut self, view: &WeatherView) {
        if self.last_view.as_ref() == Some(view) {
            return;
        }
        print!("{}", format_view(view));
        self.last_view = Some(view.clone());
    }

    fn show_placeholder(&mut self, placeholder: &Placeholder) {
        self.last_view = None;
        println!("[{}] {}  {}", placeholder.icon, placeholder.panel_text, placeholder.message);
    }
}

fn format_view(view: &WeatherView) -> String {
    let mut out = String::new();

    let label = view.panel_text.as_deref().unwrap_or("");
    out.push_str(&format!("[{}] {label}\n", view.icon));
    out.push_str(&format!("  {}: {}\n", view.location, view.summary));

    let rows = [
        ("Temperature", Some(&view.temperature)),
        ("Feels like", Some(&view.feels_like)),
        ("Humidity", Some(&view.humidity)),
        ("Pressure", Some(&view.pressure)),
        ("Wind", Some(&view.wind)),
        ("Visibility", view.visibility.as_ref()),
        ("Sunrise", view.sunrise.as_ref()),
        ("Sunset", view.sunset.as_ref()),
    ];
    for (name, value) in rows {
        if let Some(value) = value {
            out.push_str(&format!("  {name:<12}{value}\n"));
        }
    }

    for day in &view.forecast {
        out.push_str(&format!(
            "  {:<22}[{}] {}, {}\n",
            day.day, day.icon, day.summary, day.temperature
        ));
    }

    if let Some(notice) = &view.notice {
        out.push_str(&format!("  ! {notice}\n"));
    }

    out
}
