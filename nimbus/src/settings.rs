//! TOML-file settings store
//!
//! The whole [`Settings`] value lives in one file. A write applies one
//! change to the in-memory copy, rewrites the file and publishes the new
//! value. Writes are serialized so two changes never race on the file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nimbus_core::{SettingChange, Settings, SettingsStore, StoreError};
use tokio::sync::{watch, Mutex};

pub struct TomlSettingsStore {
    path: PathBuf,
    tx: watch::Sender<Settings>,
    write_lock: Mutex<()>,
}

impl TomlSettingsStore {
    /// Load `path`, falling back to defaults when the file does not exist yet
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let settings = match std::fs::read_to_string(&path) {
            Ok(text) => {
                toml::from_str::<Settings>(&text).map_err(|e| StoreError::Format(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e.into()),
        };

        let (tx, _) = watch::channel(settings);
        Ok(Self {
            path,
            tx,
            write_lock: Mutex::new(()),
        })
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    fn observe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    async fn apply(&self, change: SettingChange) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut next = self.current();
        if !next.apply(change) {
            return Ok(());
        }

        let text = toml::to_string_pretty(&next).map_err(|e| StoreError::Format(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, text).await?;

        tracing::debug!(path = %self.path.display(), "settings written");
        self.tx.send_replace(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::{DegreeUnit, LocationId, WindUnit};

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlSettingsStore::load(dir.path().join("settings.toml")).unwrap();
        assert_eq!(store.current(), Settings::default());
    }

    #[tokio::test]
    async fn test_apply_persists_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let store = TomlSettingsStore::load(&path).unwrap();
        let mut rx = store.observe();

        store
            .apply(SettingChange::DegreeUnit(DegreeUnit::Fahrenheit))
            .await
            .unwrap();
        store
            .apply(SettingChange::SelectedLocation(Some(LocationId(7))))
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().selected_location, Some(LocationId(7)));

        let reloaded = TomlSettingsStore::load(&path).unwrap().current();
        assert_eq!(reloaded.degree_unit, DegreeUnit::Fahrenheit);
        assert_eq!(reloaded.wind_unit, WindUnit::Kph);
        assert_eq!(reloaded.selected_location, Some(LocationId(7)));
    }

    #[tokio::test]
    async fn test_unchanged_value_does_not_publish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = TomlSettingsStore::load(&path).unwrap();
        let rx = store.observe();

        store.apply(SettingChange::Gps(false)).await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "gps_enabled = [").unwrap();
        assert!(matches!(
            TomlSettingsStore::load(&path),
            Err(StoreError::Format(_))
        ));
    }
}
