//! Application state - single source of truth
//!
//! `UiState` is owned by the [`Store`](crate::Store). Observers only ever see
//! an `Arc<UiState>` snapshot; the reducer works on a private copy and the
//! store swaps it in when something changed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::effect::ActiveQuery;

/// Lower bound for the refresh countdown, in seconds.
pub const MIN_REFRESH_SECS: u32 = 5;
/// Upper bound for the refresh countdown, in seconds.
pub const MAX_REFRESH_SECS: u32 = 60;
/// Countdown used until the settings store says otherwise.
pub const DEFAULT_REFRESH_SECS: u32 = 5;

/// Whether `secs` is an acceptable refresh interval.
pub fn is_valid_refresh_interval(secs: u32) -> bool {
    (MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&secs)
}

/// Identifier assigned by the location store. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of the location store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: LocationId,
    pub name: String,
}

impl SavedLocation {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: LocationId(id),
            name: name.into(),
        }
    }
}

/// Where a snapshot was observed
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub country: String,
    pub region: String,
    pub name: String,
}

/// Current conditions for one place, as returned by the weather lookup
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub place: Place,
    pub temp_c: f64,
    pub temp_f: f64,
    pub condition_text: String,
    /// Icon reference as handed out by the API (usually a URL)
    pub condition_icon: String,
    pub wind_mph: f64,
    pub wind_kph: f64,
    pub wind_degree: i32,
    pub wind_dir: String,
    pub humidity_pct: u8,
    pub pressure_in: f64,
}

impl WeatherSnapshot {
    /// "Region | Name", the title used by notifications and the header line.
    pub fn headline(&self) -> String {
        format!("{} | {}", self.place.region, self.place.name)
    }
}

/// A device coordinate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Query string understood by the weather lookup (`"lat,lon"`).
    pub fn to_query(self) -> String {
        format!("{},{}", self.lat, self.lon)
    }
}

/// Error returned when a unit string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit: {0}")]
pub struct ParseUnitError(pub String);

/// Temperature unit preference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl DegreeUnit {
    /// Format the snapshot temperature in this unit
    pub fn format(&self, weather: &WeatherSnapshot) -> String {
        match self {
            DegreeUnit::Celsius => format!("{:.1}°C", weather.temp_c),
            DegreeUnit::Fahrenheit => format!("{:.1}°F", weather.temp_f),
        }
    }
}

impl FromStr for DegreeUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(DegreeUnit::Celsius),
            "f" | "fahrenheit" => Ok(DegreeUnit::Fahrenheit),
            other => Err(ParseUnitError(other.to_string())),
        }
    }
}

/// Wind speed unit preference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    Mph,
    #[default]
    Kph,
}

impl WindUnit {
    /// Format wind speed and direction in this unit
    pub fn format(&self, weather: &WeatherSnapshot) -> String {
        match self {
            WindUnit::Mph => format!("{:.1} mph {}", weather.wind_mph, weather.wind_dir),
            WindUnit::Kph => format!("{:.1} km/h {}", weather.wind_kph, weather.wind_dir),
        }
    }
}

impl FromStr for WindUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mph" => Ok(WindUnit::Mph),
            "kph" | "kmh" | "km/h" => Ok(WindUnit::Kph),
            other => Err(ParseUnitError(other.to_string())),
        }
    }
}

/// A saved location and whatever the row lookup produced for it
#[derive(Clone, Debug, PartialEq)]
pub struct LocationWithWeather {
    pub location: SavedLocation,
    /// `None` both while loading and after a failed lookup; see `fetched`
    pub weather: Option<WeatherSnapshot>,
    /// Set once the first lookup for this row has completed
    pub fetched: bool,
}

impl LocationWithWeather {
    pub fn new(location: SavedLocation) -> Self {
        Self {
            location,
            weather: None,
            fetched: false,
        }
    }

    pub fn id(&self) -> LocationId {
        self.location.id
    }
}

bitflags! {
    /// Presentation-only visibility flags (bottom sheets, dialogs)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Sheets: u8 {
        const INSERT = 1 << 0;
        const DELETE = 1 << 1;
        const SELECT = 1 << 2;
        const DEGREE = 1 << 3;
        const WIND = 1 << 4;
        const REFRESH = 1 << 5;
        const NOTIFICATION = 1 << 6;
        const PERMISSION = 1 << 7;
    }
}

/// Observable phase of the periodic refresh loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    CountingDown { remaining: u32 },
    Fetching,
}

/// Application state - everything an observer needs to render
#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    /// Saved locations in store order, each with its own lookup result
    pub saved_locations: Vec<LocationWithWeather>,

    /// Location used for the active weather when GPS is off
    pub selected_location: Option<LocationId>,

    /// Mirrors the settings store
    pub gps_enabled: bool,

    /// Whether coordinates may be requested at all
    pub location_permission: bool,

    /// Conditions for the active location (None = not yet fetched)
    pub active_weather: Option<WeatherSnapshot>,

    pub degree_unit: DegreeUnit,
    pub wind_unit: WindUnit,
    pub refresh_interval_secs: u32,
    pub notifications_enabled: bool,

    pub sheets: Sheets,

    /// Whether the location store has emitted at least once
    pub locations_loaded: bool,

    /// Deleted ids whose removal the store has not confirmed yet
    pub pending_deletes: BTreeSet<LocationId>,

    /// Rows with a lookup in flight
    pub rows_in_flight: BTreeSet<LocationId>,

    /// Refresh loop bookkeeping
    pub refresh_running: bool,
    pub countdown_remaining: u32,

    /// Sequence number handed to the next active lookup
    pub next_request: u64,
    /// Latest active lookup that has not completed
    pub pending_request: Option<u64>,
    /// Latest active lookup that resolved (loaded, failed or skipped).
    /// Results of lookups issued before it are stale.
    pub settled_request: Option<u64>,
    /// Query of the latest active lookup issued
    pub last_query: Option<ActiveQuery>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            saved_locations: Vec::new(),
            selected_location: None,
            gps_enabled: false,
            location_permission: false,
            active_weather: None,
            degree_unit: DegreeUnit::default(),
            wind_unit: WindUnit::default(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            notifications_enabled: false,
            sheets: Sheets::empty(),
            locations_loaded: false,
            pending_deletes: BTreeSet::new(),
            rows_in_flight: BTreeSet::new(),
            refresh_running: false,
            countdown_remaining: 0,
            next_request: 0,
            pending_request: None,
            settled_request: None,
            last_query: None,
        }
    }

    /// Start with coordinate access already granted (or denied)
    pub fn with_permission(mut self, granted: bool) -> Self {
        self.location_permission = granted;
        self
    }

    pub fn location(&self, id: LocationId) -> Option<&LocationWithWeather> {
        self.saved_locations.iter().find(|row| row.id() == id)
    }

    pub(crate) fn location_mut(&mut self, id: LocationId) -> Option<&mut LocationWithWeather> {
        self.saved_locations.iter_mut().find(|row| row.id() == id)
    }

    /// The selected row, unless it is gone or being deleted
    pub fn selected(&self) -> Option<&LocationWithWeather> {
        let id = self.selected_location?;
        if self.pending_deletes.contains(&id) {
            return None;
        }
        self.location(id)
    }

    /// What the next active lookup would ask for.
    ///
    /// GPS wins when enabled; it resolves only with location permission.
    /// Otherwise the selected row's name is used.
    pub fn active_query(&self) -> Option<ActiveQuery> {
        if self.gps_enabled {
            return self.location_permission.then_some(ActiveQuery::Gps);
        }
        self.selected()
            .map(|row| ActiveQuery::Place(row.location.name.clone()))
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        if self.pending_request.is_some() {
            RefreshPhase::Fetching
        } else if self.refresh_running {
            RefreshPhase::CountingDown {
                remaining: self.countdown_remaining,
            }
        } else {
            RefreshPhase::Idle
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            place: Place {
                country: "France".into(),
                region: "Ile-de-France".into(),
                name: "Paris".into(),
            },
            temp_c: 18.0,
            temp_f: 64.4,
            condition_text: "Cloudy".into(),
            wind_kph: 9.0,
            wind_mph: 5.6,
            wind_dir: "NW".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_refresh_interval_bounds() {
        assert!(!is_valid_refresh_interval(4));
        assert!(is_valid_refresh_interval(5));
        assert!(is_valid_refresh_interval(60));
        assert!(!is_valid_refresh_interval(61));
    }

    #[test]
    fn test_unit_formatting() {
        let weather = snapshot();
        assert_eq!(DegreeUnit::Celsius.format(&weather), "18.0°C");
        assert_eq!(DegreeUnit::Fahrenheit.format(&weather), "64.4°F");
        assert_eq!(WindUnit::Kph.format(&weather), "9.0 km/h NW");
        assert_eq!(WindUnit::Mph.format(&weather), "5.6 mph NW");
        assert_eq!(weather.headline(), "Ile-de-France | Paris");
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("F".parse::<DegreeUnit>(), Ok(DegreeUnit::Fahrenheit));
        assert_eq!("celsius".parse::<DegreeUnit>(), Ok(DegreeUnit::Celsius));
        assert_eq!("kph".parse::<WindUnit>(), Ok(WindUnit::Kph));
        assert!("kelvin".parse::<DegreeUnit>().is_err());
    }

    #[test]
    fn test_active_query_prefers_gps() {
        let mut state = UiState::new();
        state.saved_locations = vec![LocationWithWeather::new(SavedLocation::new(1, "Oslo"))];
        state.selected_location = Some(LocationId(1));
        assert_eq!(state.active_query(), Some(ActiveQuery::Place("Oslo".into())));

        state.gps_enabled = true;
        assert_eq!(state.active_query(), None, "no permission yet");

        state.location_permission = true;
        assert_eq!(state.active_query(), Some(ActiveQuery::Gps));
    }

    #[test]
    fn test_selected_skips_pending_delete() {
        let mut state = UiState::new();
        state.saved_locations = vec![LocationWithWeather::new(SavedLocation::new(3, "Lima"))];
        state.selected_location = Some(LocationId(3));
        state.pending_deletes.insert(LocationId(3));
        assert!(state.selected().is_none());
        assert_eq!(state.active_query(), None);
    }

    #[test]
    fn test_refresh_phase() {
        let mut state = UiState::new();
        assert_eq!(state.refresh_phase(), RefreshPhase::Idle);

        state.refresh_running = true;
        state.countdown_remaining = 3;
        assert_eq!(
            state.refresh_phase(),
            RefreshPhase::CountingDown { remaining: 3 }
        );

        state.pending_request = Some(0);
        assert_eq!(state.refresh_phase(), RefreshPhase::Fetching);
    }

    #[test]
    fn test_coordinate_query() {
        let c = Coordinate {
            lat: 48.85,
            lon: 2.35,
        };
        assert_eq!(c.to_query(), "48.85,2.35");
    }
}
