use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::warn;

use panel_weather_core::{
    FileSettings, GeocodeError, Location, RefreshController, RefreshState, SettingsStore,
    WeatherClient,
    provider::client_from_settings,
    units::{DistanceUnit, PressureUnit, SpeedUnit, TemperatureUnit},
};

use crate::terminal::TerminalSink;

/// How often `run` re-reads the settings file for outside edits.
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "panel-weather", version, about = "Weather panel in a terminal")]
pub struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep the weather up to date and print every change.
    Run {
        /// Exit after the first refresh.
        #[arg(long)]
        once: bool,
    },

    /// Manage the list of cities.
    Cities {
        #[command(subcommand)]
        action: CitiesCommand,
    },

    /// Show or change measurement units.
    Units {
        #[arg(long)]
        temperature: Option<TemperatureUnit>,

        #[arg(long)]
        speed: Option<SpeedUnit>,

        #[arg(long)]
        pressure: Option<PressureUnit>,

        #[arg(long)]
        distance: Option<DistanceUnit>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// List configured cities; the active one is marked.
    List,

    /// Add a city, either as "<id>>name" or as a place name to look up.
    Add {
        location: String,

        /// Make the new city the active one.
        #[arg(long)]
        select: bool,
    },

    /// Remove the city at the given position (as shown by `list`).
    Remove { position: usize },

    /// Make the city at the given position active.
    Select { position: usize },
}

impl Cli {
    pub fn open_settings(&self) -> Result<Arc<FileSettings>> {
        let store = match &self.config {
            Some(path) => FileSettings::open(path)?,
            None => FileSettings::open_default()?,
        };
        Ok(Arc::new(store))
    }

    pub async fn run(self, store: Arc<FileSettings>) -> Result<()> {
        match self.command {
            Command::Run { once } => run(store, once).await,
            Command::Cities { action } => cities(store.as_ref(), action).await,
            Command::Units { temperature, speed, pressure, distance } => {
                let keys = store.update(&mut |s| {
                    if let Some(unit) = temperature {
                        s.temperature_unit = unit;
                    }
                    if let Some(unit) = speed {
                        s.speed_unit = unit;
                    }
                    if let Some(unit) = pressure {
                        s.pressure_unit = unit;
                    }
                    if let Some(unit) = distance {
                        s.distance_unit = unit;
                    }
                })?;

                let s = store.get();
                println!("temperature: {}", s.temperature_unit);
                println!("speed:       {}", s.speed_unit);
                println!("pressure:    {}", s.pressure_unit);
                println!("distance:    {}", s.distance_unit);
                if !keys.is_empty() {
                    println!("Saved to {}", store.path().display());
                }
                Ok(())
            }
        }
    }
}

async fn run(store: Arc<FileSettings>, once: bool) -> Result<()> {
    let client: Arc<dyn WeatherClient> = Arc::from(client_from_settings(&store.get().provider)?);
    let mut controller =
        RefreshController::new(client, store.clone(), Box::new(TerminalSink::default()));

    controller.start();

    if once {
        while controller.state() == RefreshState::Loading && controller.step().await {}
        return Ok(());
    }

    let handle = controller.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.shutdown();
        }
    });

    let watched = store.clone();
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SETTINGS_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            if let Err(err) = watched.reload() {
                warn!(error = %err, "Failed to re-read settings");
            }
        }
    });

    while controller.step().await {}
    Ok(())
}

async fn cities(store: &FileSettings, action: CitiesCommand) -> Result<()> {
    match action {
        CitiesCommand::List => {
            let settings = store.get();
            if settings.cities.is_empty() {
                println!("No cities configured");
            }
            for (i, city) in settings.cities.iter().enumerate() {
                let marker = if i == settings.active_index() { '*' } else { ' ' };
                println!("{marker} {}. {} ({city})", i + 1, city.qualified_name());
            }
        }
        CitiesCommand::Add { location, select } => {
            let mut location: Location =
                location.parse().with_context(|| format!("Invalid location '{location}'"))?;

            if !location.is_resolved() {
                let client = client_from_settings(&store.get().provider)?;
                location = match client.resolve_location(&location.name).await {
                    Ok(found) => found,
                    Err(GeocodeError::Ambiguous { query, candidates }) => {
                        println!("'{query}' matches several places:");
                        for candidate in &candidates {
                            println!("  {candidate}  {}", candidate.qualified_name());
                        }
                        bail!("Add one of them as \"<id>><name>\"");
                    }
                    Err(err) => return Err(err.into()),
                };
            }

            let mut cities = store.cities();
            cities.push(location.clone());
            let added = cities.len() - 1;
            store.set_cities(cities)?;
            if select {
                store.set_active_city_index(added)?;
            }
            println!("Added {}", location.qualified_name());
        }
        CitiesCommand::Remove { position } => {
            let mut cities = store.cities();
            let index = to_index(position, cities.len())?;
            let removed = cities.remove(index);

            // Keep the same city active when an earlier one goes away.
            let active = store.active_city_index();
            let active = if index < active { active - 1 } else { active };
            store.update(&mut |s| {
                s.cities = cities.clone();
                s.set_active_index(active);
            })?;
            println!("Removed {}", removed.qualified_name());
        }
        CitiesCommand::Select { position } => {
            let index = to_index(position, store.cities().len())?;
            store.set_active_city_index(index)?;
            if let Some(city) = store.active_city() {
                println!("Active city: {}", city.qualified_name());
            }
        }
    }

    Ok(())
}

fn to_index(position: usize, len: usize) -> Result<usize> {
    if position == 0 || position > len {
        bail!("No city at position {position} (have {len})");
    }
    Ok(position - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        assert_eq!(to_index(1, 3).unwrap(), 0);
        assert_eq!(to_index(3, 3).unwrap(), 2);
        assert!(to_index(0, 3).is_err());
        assert!(to_index(4, 3).is_err());
    }

    #[test]
    fn units_flags_parse() {
        let cli = Cli::try_parse_from([
            "panel-weather",
            "units",
            "--temperature",
            "fahrenheit",
            "--speed",
            "beaufort",
        ])
        .unwrap();

        match cli.command {
            Command::Units { temperature, speed, pressure, distance } => {
                assert_eq!(temperature, Some(TemperatureUnit::Fahrenheit));
                assert_eq!(speed, Some(SpeedUnit::Beaufort));
                assert_eq!(pressure, None);
                assert_eq!(distance, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["panel-weather", "run", "--once", "--config", "/tmp/s.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Command::Run { once: true }));
    }

    #[tokio::test]
    async fn add_select_and_remove_cities() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettings::open(dir.path().join("settings.toml")).unwrap();

        let add = |location: &str, select| CitiesCommand::Add { location: location.into(), select };
        cities(&store, add("5128581>New York", false)).await.unwrap();
        cities(&store, add("638242>Berlin", true)).await.unwrap();
        assert_eq!(store.active_city_index(), 1);

        cities(&store, CitiesCommand::Remove { position: 1 }).await.unwrap();
        assert_eq!(store.cities(), vec![Location::new("638242", "Berlin")]);
        assert_eq!(store.active_city_index(), 0);

        assert!(cities(&store, CitiesCommand::Select { position: 2 }).await.is_err());
    }
}
