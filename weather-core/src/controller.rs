//! The refresh cycle.
//!
//! One task owns a [`RefreshController`] and drives it with [`RefreshController::step`]
//! (or [`RefreshController::run`]). Fetches run concurrently in an in-flight set
//! that only this task polls; each carries the generation it was started under
//! and results from older generations are dropped.

use futures::{StreamExt, future::BoxFuture, stream::FuturesUnordered};
use std::{future::pending, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    display::{DisplaySink, PanelPosition, Placeholder},
    location::Location,
    model::WeatherSnapshot,
    provider::{FetchError, WeatherClient},
    render::{DisplayPreferences, render},
    settings::{SettingKey, Settings, SettingsStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Loading,
    Displaying,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No location configured")]
    Configuration,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reload,
    Shutdown,
}

/// Cloneable remote control for a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    /// Ask for an immediate refresh. Returns false once the controller is gone.
    pub fn reload(&self) -> bool {
        self.commands.send(Command::Reload).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.commands.send(Command::Shutdown).is_ok()
    }
}

/// What a fetch asks the provider for. A change here needs a new fetch;
/// anything else in the settings only needs a new render.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchTarget {
    location: Location,
    forecast_days: u8,
}

impl FetchTarget {
    fn from_settings(settings: &Settings) -> Option<Self> {
        settings.active_location().map(|location| Self {
            location: location.clone(),
            forecast_days: settings.forecast_days(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: Instant,
    interval: Duration,
}

struct FetchOutcome {
    generation: u64,
    requested: Location,
    /// Set when the requested location had to be geocoded first.
    resolved: Option<Location>,
    result: Result<WeatherSnapshot, RefreshError>,
}

pub struct RefreshController {
    client: Arc<dyn WeatherClient>,
    settings: Arc<dyn SettingsStore>,
    sink: Box<dyn DisplaySink>,

    state: RefreshState,
    snapshot: Option<Arc<WeatherSnapshot>>,
    notice: Option<String>,
    generation: u64,
    in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome>>,
    timer: Option<Timer>,

    target: Option<FetchTarget>,
    prefs: DisplayPreferences,
    position: PanelPosition,
    interval: Duration,

    changes: broadcast::Receiver<SettingKey>,
    commands: mpsc::UnboundedReceiver<Command>,
    command_tx: mpsc::UnboundedSender<Command>,
}

impl RefreshController {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        settings: Arc<dyn SettingsStore>,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        let changes = settings.subscribe();
        let current = settings.get();
        let (command_tx, commands) = mpsc::unbounded_channel();

        Self {
            client,
            settings,
            sink,
            state: RefreshState::Idle,
            snapshot: None,
            notice: None,
            generation: 0,
            in_flight: FuturesUnordered::new(),
            timer: None,
            target: FetchTarget::from_settings(&current),
            prefs: DisplayPreferences::from(&current),
            position: current.position_in_panel,
            interval: current.refresh_interval(),
            changes,
            commands,
            command_tx,
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle { commands: self.command_tx.clone() }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// The most recent successful snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.snapshot.clone()
    }

    /// Interval of the armed timer; `None` when no refresh is scheduled.
    pub fn timer_interval(&self) -> Option<Duration> {
        self.timer.map(|timer| timer.interval)
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Fetches started and not yet collected, stale ones included.
    pub fn pending_fetches(&self) -> usize {
        self.in_flight.len()
    }

    /// Push the panel position and start the first refresh.
    pub fn start(&mut self) {
        self.sink.set_position(self.position);
        self.refresh();
    }

    /// Drop the scheduled refresh and fetch now.
    pub fn reload(&mut self) {
        debug!("Reload requested");
        self.refresh();
    }

    /// Wait for and handle one event. Returns false after shutdown.
    pub async fn step(&mut self) -> bool {
        let deadline = self.timer.map(|timer| timer.deadline);
        let timer = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            Some(command) = self.commands.recv() => match command {
                Command::Reload => self.reload(),
                Command::Shutdown => {
                    debug!("Controller shutting down");
                    return false;
                }
            },

            change = self.changes.recv() => match change {
                Ok(key) => {
                    debug!(%key, "Settings changed");
                    self.settings_changed();
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Missed settings notifications, re-reading everything");
                    self.settings_changed();
                }
                Err(broadcast::error::RecvError::Closed) => return false,
            },

            Some(outcome) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                self.fetch_finished(outcome);
            }

            _ = timer => self.timer_fired(),
        }

        true
    }

    pub async fn run(mut self) {
        self.start();
        while self.step().await {}
    }

    fn refresh(&mut self) {
        self.timer = None;
        match self.target.clone() {
            Some(target) => self.begin_fetch(target),
            None => self.go_idle(),
        }
    }

    fn go_idle(&mut self) {
        // Outstanding fetches are for a location that is no longer configured.
        self.generation += 1;
        self.snapshot = None;
        self.notice = None;
        self.state = RefreshState::Idle;
        debug!(error = %RefreshError::Configuration, "Nothing to fetch");
        self.sink.show_placeholder(&Placeholder::no_location());
    }

    fn begin_fetch(&mut self, target: FetchTarget) {
        self.generation += 1;
        let generation = self.generation;

        if self.snapshot.is_none() {
            self.sink.show_loading();
        }
        self.state = RefreshState::Loading;

        debug!(generation, location = %target.location, "Starting fetch");

        let client = Arc::clone(&self.client);
        let units = self.prefs.units;
        self.in_flight.push(Box::pin(async move {
            let requested = target.location;
            let mut resolved = None;

            // A failed lookup only costs the id; the forecast is still asked
            // for by name.
            if !requested.is_resolved() {
                match client.resolve_location(&requested.name).await {
                    Ok(location) => resolved = Some(location),
                    Err(err) => {
                        warn!(error = %err, name = %requested.name, "Location lookup failed");
                    }
                }
            }
            let location = resolved.as_ref().unwrap_or(&requested);

            let result = client
                .fetch(location, &units, target.forecast_days)
                .await
                .map_err(RefreshError::from);

            FetchOutcome { generation, requested, resolved, result }
        }));
    }

    fn fetch_finished(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "Discarding stale fetch result"
            );
            return;
        }

        if let Some(resolved) = outcome.resolved {
            self.store_resolved(&outcome.requested, resolved);
        }

        match outcome.result {
            Ok(snapshot) => {
                info!(
                    location = %snapshot.location_name,
                    code = snapshot.condition_code,
                    "Weather updated"
                );
                self.snapshot = Some(Arc::new(snapshot));
                self.notice = None;
                self.state = RefreshState::Displaying;
                self.publish();
            }
            Err(err) => self.fetch_failed(err),
        }

        self.arm_timer();
    }

    fn fetch_failed(&mut self, err: RefreshError) {
        warn!(error = %err, "Weather refresh failed");
        self.state = RefreshState::Error;

        if self.snapshot.is_some() {
            self.notice = Some(format!("Showing last known conditions ({err})"));
            self.publish();
        } else {
            self.sink.show_placeholder(&Placeholder::unavailable(&err.to_string()));
        }
    }

    /// Replace the unresolved entry in the city list. The target is updated
    /// first so the resulting settings notification is not seen as a new
    /// location.
    fn store_resolved(&mut self, requested: &Location, resolved: Location) {
        info!(from = %requested, to = %resolved, "Resolved location");

        if let Some(target) = self.target.as_mut().filter(|t| t.location == *requested) {
            target.location = resolved.clone();
        }

        let result = self.settings.update(&mut |settings| {
            for city in settings.cities.iter_mut().filter(|city| **city == *requested) {
                *city = resolved.clone();
            }
        });

        if let Err(err) = result {
            warn!(error = %err, "Failed to store resolved location");
        }
    }

    fn timer_fired(&mut self) {
        debug!("Refresh timer fired");
        self.refresh();
    }

    fn arm_timer(&mut self) {
        self.timer = Some(Timer {
            deadline: Instant::now() + self.interval,
            interval: self.interval,
        });
    }

    fn settings_changed(&mut self) {
        let settings = self.settings.get();

        if settings.position_in_panel != self.position {
            self.position = settings.position_in_panel;
            self.sink.set_position(self.position);
        }

        let prefs = DisplayPreferences::from(&settings);
        let interval = settings.refresh_interval();
        let target = FetchTarget::from_settings(&settings);

        if target != self.target {
            self.target = target;
            self.prefs = prefs;
            self.interval = interval;
            // Whatever is shown belongs to the old location.
            self.snapshot = None;
            self.notice = None;
            self.refresh();
            return;
        }

        if interval != self.interval {
            self.interval = interval;
            if self.timer.is_some() {
                self.arm_timer();
            }
        }

        if prefs != self.prefs {
            self.prefs = prefs;
            if matches!(self.state, RefreshState::Displaying | RefreshState::Error) {
                self.publish();
            }
        }
    }

    fn publish(&mut self) {
        let Some(snapshot) = self.snapshot.clone() else {
            return;
        };

        let sink = &self.sink;
        let mut view = render(&snapshot, &self.prefs, &|name| sink.has_icon(name));
        view.notice = self.notice.clone();

        self.sink.show_weather(&view);
    }
}
