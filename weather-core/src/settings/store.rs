use anyhow::Result;
use parking_lot::Mutex;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};
use tokio::sync::broadcast;
use tracing::debug;

use super::{SettingKey, Settings};
use crate::{location::Location, units::TemperatureUnit};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Persisted configuration with per-key change notification.
///
/// Every read returns a normalized copy, so derived invariants such as the
/// active city index are re-checked on each access.
pub trait SettingsStore: Send + Sync + Debug {
    fn get(&self) -> Settings;

    /// Replace all settings. Returns the keys that changed; one notification
    /// is sent per changed key.
    fn set(&self, settings: Settings) -> Result<Vec<SettingKey>>;

    fn subscribe(&self) -> broadcast::Receiver<SettingKey>;

    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Vec<SettingKey>> {
        let mut settings = self.get();
        apply(&mut settings);
        self.set(settings)
    }

    fn cities(&self) -> Vec<Location> {
        self.get().cities
    }

    fn set_cities(&self, cities: Vec<Location>) -> Result<Vec<SettingKey>> {
        self.update(&mut |settings| settings.cities = cities.clone())
    }

    fn active_city_index(&self) -> usize {
        self.get().active_index()
    }

    fn set_active_city_index(&self, index: usize) -> Result<Vec<SettingKey>> {
        self.update(&mut |settings| settings.set_active_index(index))
    }

    fn active_city(&self) -> Option<Location> {
        self.get().active_location().cloned()
    }

    fn set_temperature_unit(&self, unit: TemperatureUnit) -> Result<Vec<SettingKey>> {
        self.update(&mut |settings| settings.temperature_unit = unit)
    }
}

/// Current value plus the notification channel, shared by both stores.
#[derive(Debug)]
struct SettingsCell {
    current: Mutex<Settings>,
    changes: broadcast::Sender<SettingKey>,
}

impl SettingsCell {
    fn new(settings: Settings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { current: Mutex::new(settings.normalized()), changes }
    }

    fn get(&self) -> Settings {
        self.current.lock().clone().normalized()
    }

    /// Compute the next value from the current one and store it, all under
    /// the lock. Notifications go out after the lock is released.
    fn modify(
        &self,
        next: impl FnOnce(&Settings) -> Result<Settings>,
    ) -> Result<Vec<SettingKey>> {
        let keys = {
            let mut current = self.current.lock();
            let settings = next(&current)?.normalized();
            let keys = current.changed_keys(&settings);
            *current = settings;
            keys
        };

        for key in &keys {
            debug!(%key, "setting changed");
            // No receivers is fine; nobody is listening yet.
            let _ = self.changes.send(*key);
        }

        Ok(keys)
    }
}

fn applied(current: &Settings, apply: &mut dyn FnMut(&mut Settings)) -> Settings {
    let mut settings = current.clone().normalized();
    apply(&mut settings);
    settings.normalized()
}

/// Settings held in memory only.
#[derive(Debug)]
pub struct MemorySettings {
    cell: SettingsCell,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self { cell: SettingsCell::new(settings) }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Settings {
        self.cell.get()
    }

    fn set(&self, settings: Settings) -> Result<Vec<SettingKey>> {
        self.cell.modify(|_| Ok(settings))
    }

    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Vec<SettingKey>> {
        self.cell.modify(|current| Ok(applied(current, apply)))
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingKey> {
        self.cell.changes.subscribe()
    }
}

/// Settings backed by a TOML file. Writes go to disk before listeners are
/// notified; `reload` picks up edits made to the file by someone else. File
/// reads and writes happen under the settings lock, so a reload never undoes
/// a concurrent update.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    cell: SettingsCell,
}

impl FileSettings {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Settings::load_from(&path)?;
        Ok(Self { path, cell: SettingsCell::new(settings) })
    }

    /// Open the settings file at the platform default location.
    pub fn open_default() -> Result<Self> {
        Self::open(Settings::config_file_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and notify listeners about whatever changed.
    pub fn reload(&self) -> Result<Vec<SettingKey>> {
        self.cell.modify(|_| Settings::load_from(&self.path))
    }

    fn persist(&self, settings: Settings) -> Result<Settings> {
        let settings = settings.normalized();
        settings.save_to(&self.path)?;
        Ok(settings)
    }
}

impl SettingsStore for FileSettings {
    fn get(&self) -> Settings {
        self.cell.get()
    }

    fn set(&self, settings: Settings) -> Result<Vec<SettingKey>> {
        self.cell.modify(|_| self.persist(settings))
    }

    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Vec<SettingKey>> {
        self.cell.modify(|current| self.persist(applied(current, apply)))
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingKey> {
        self.cell.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::PanelPosition;

    fn new_york() -> Location {
        Location::new("5128581", "New York")
    }

    #[test]
    fn set_notifies_each_changed_key() {
        let store = MemorySettings::default();
        let mut changes = store.subscribe();

        let keys = store
            .update(&mut |s| {
                s.cities = vec![new_york()];
                s.position_in_panel = PanelPosition::Right;
            })
            .unwrap();

        assert_eq!(keys, vec![SettingKey::Cities, SettingKey::PositionInPanel]);
        assert_eq!(changes.try_recv().unwrap(), SettingKey::Cities);
        assert_eq!(changes.try_recv().unwrap(), SettingKey::PositionInPanel);
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn unchanged_set_sends_nothing() {
        let store = MemorySettings::default();
        let mut changes = store.subscribe();

        let keys = store.set(store.get()).unwrap();
        assert!(keys.is_empty());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn active_index_is_clamped_on_write() {
        let store = MemorySettings::default();
        store.set_cities(vec![new_york()]).unwrap();
        store.set_active_city_index(5).unwrap();

        assert_eq!(store.active_city_index(), 0);
        assert_eq!(store.get().active_city, 0);
        assert_eq!(store.active_city(), Some(new_york()));
    }

    #[test]
    fn removing_the_active_city_reclamps() {
        let store = MemorySettings::default();
        store.set_cities(vec![new_york(), Location::new("638242", "Berlin")]).unwrap();
        store.set_active_city_index(1).unwrap();

        let mut changes = store.subscribe();
        store.set_cities(vec![new_york()]).unwrap();

        assert_eq!(store.active_city_index(), 0);
        assert_eq!(changes.try_recv().unwrap(), SettingKey::Cities);
        assert_eq!(changes.try_recv().unwrap(), SettingKey::ActiveCity);
    }

    #[test]
    fn file_store_persists_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let store = FileSettings::open(&path).unwrap();
        store.set_temperature_unit(TemperatureUnit::Fahrenheit).unwrap();
        store.set_cities(vec![new_york()]).unwrap();

        let reopened = FileSettings::open(&path).unwrap();
        assert_eq!(reopened.get().temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(reopened.cities(), vec![new_york()]);
    }

    fn bump_concurrently(store: &dyn SettingsStore) {
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        store.update(&mut |s| s.refresh_interval_secs += 1).unwrap();
                    }
                });
            }
        });
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = MemorySettings::new(Settings { refresh_interval_secs: 1000, ..Settings::default() });
        bump_concurrently(&store);
        assert_eq!(store.get().refresh_interval_secs, 1100);
    }

    #[test]
    fn file_updates_and_reloads_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = FileSettings::open(&path).unwrap();
        store.set_cities(vec![Location::unresolved("Paris")]).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..50 {
                    store.reload().unwrap();
                }
            });
            scope.spawn(|| {
                store.set_cities(vec![Location::new("615702", "Paris")]).unwrap();
            });
        });

        assert_eq!(store.cities(), vec![Location::new("615702", "Paris")]);
        assert_eq!(FileSettings::open(&path).unwrap().cities(), store.cities());
        bump_concurrently(&store);
        assert_eq!(store.get().refresh_interval_secs, 340);
    }

    #[test]
    fn file_store_reload_notifies_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let store = FileSettings::open(&path).unwrap();
        let mut changes = store.subscribe();

        let mut edited = store.get();
        edited.use_symbolic_icons = true;
        edited.save_to(&path).unwrap();

        let keys = store.reload().unwrap();
        assert_eq!(keys, vec![SettingKey::SymbolicIcons]);
        assert_eq!(changes.try_recv().unwrap(), SettingKey::SymbolicIcons);
        assert!(store.get().use_symbolic_icons);
    }
}
