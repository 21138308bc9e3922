//! Collaborators the runtime talks to
//!
//! The reducer never sees these; the effect handler calls them from spawned
//! tasks and turns their answers into actions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::settings::{SettingChange, Settings};
use crate::state::{Coordinate, LocationId, SavedLocation, WeatherSnapshot};

/// Failure of a weather lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("weather service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Failure of a location or settings store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Format(String),
}

/// Current conditions for a place name or `"lat,lon"` string
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn fetch_weather(&self, query: &str) -> Result<WeatherSnapshot, LookupError>;
}

/// Saved locations, keyed by store-assigned ids
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn insert(&self, name: &str) -> Result<LocationId, StoreError>;

    async fn delete(&self, id: LocationId) -> Result<(), StoreError>;

    /// The full list, re-published after every write
    fn observe_all(&self) -> watch::Receiver<Vec<SavedLocation>>;
}

/// Observable preferences
#[async_trait]
pub trait SettingsStore: Send + Sync {
    fn observe(&self) -> watch::Receiver<Settings>;

    async fn apply(&self, change: SettingChange) -> Result<(), StoreError>;
}

/// Last known device position
#[async_trait]
pub trait CoordinateProvider: Send + Sync {
    async fn last_known(&self) -> Option<Coordinate>;
}

/// Coordinate provider backed by a fixed, optional position
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCoordinates(pub Option<Coordinate>);

impl FixedCoordinates {
    pub fn at(lat: f64, lon: f64) -> Self {
        Self(Some(Coordinate { lat, lon }))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CoordinateProvider for FixedCoordinates {
    async fn last_known(&self) -> Option<Coordinate> {
        self.0
    }
}

/// The collaborators a runtime is wired to
#[derive(Clone)]
pub struct Services {
    pub weather: Arc<dyn WeatherLookup>,
    pub locations: Arc<dyn LocationStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub coordinates: Arc<dyn CoordinateProvider>,
}
