//! Actions: every event that can change [`UiState`](crate::UiState)
//!
//! Intents come from the driver (`LocationInsert`, `WeatherFetch`, ...).
//! `*Did*` actions carry results from spawned tasks, and `*DidChange`/
//! `*DidLoad` stream actions mirror the settings and location stores.

use crate::settings::Settings;
use crate::state::{DegreeUnit, LocationId, SavedLocation, Sheets, WeatherSnapshot, WindUnit};

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    // ===== Settings =====
    GpsSet(bool),
    DegreeUnitSet(DegreeUnit),
    WindUnitSet(WindUnit),
    RefreshIntervalSet(u32),
    NotificationsSet(bool),
    PermissionUpdate(bool),
    /// Settings store emitted a new value
    SettingsDidChange(Settings),

    // ===== Locations =====
    LocationInsert(String),
    LocationDelete(LocationId),
    /// The store refused a delete; the row stays
    LocationDeleteDidFail(LocationId),
    LocationSelect(LocationId),
    /// The location list became visible; fetch rows that have no data yet
    LocationListShown,
    /// Location store emitted a new list
    LocationsDidLoad(Vec<SavedLocation>),

    // ===== Active weather =====
    WeatherFetch,
    WeatherDidLoad {
        request: u64,
        snapshot: WeatherSnapshot,
    },
    WeatherDidFail {
        request: u64,
        reason: String,
    },
    /// GPS query could not resolve a coordinate; nothing was looked up
    WeatherDidSkip {
        request: u64,
    },

    // ===== Row weather =====
    RowWeatherFetch(LocationId),
    RowWeatherDidLoad {
        id: LocationId,
        weather: Option<WeatherSnapshot>,
    },

    // ===== Refresh loop =====
    RefreshStart,
    RefreshTick,

    // ===== Sheets =====
    SheetOpen(Sheets),
    SheetClose(Sheets),

    // ===== Global =====
    Quit,
}

impl Action {
    /// Action name for logging and filtering
    pub fn name(&self) -> &'static str {
        match self {
            Action::GpsSet(_) => "GpsSet",
            Action::DegreeUnitSet(_) => "DegreeUnitSet",
            Action::WindUnitSet(_) => "WindUnitSet",
            Action::RefreshIntervalSet(_) => "RefreshIntervalSet",
            Action::NotificationsSet(_) => "NotificationsSet",
            Action::PermissionUpdate(_) => "PermissionUpdate",
            Action::SettingsDidChange(_) => "SettingsDidChange",
            Action::LocationInsert(_) => "LocationInsert",
            Action::LocationDelete(_) => "LocationDelete",
            Action::LocationDeleteDidFail(_) => "LocationDeleteDidFail",
            Action::LocationSelect(_) => "LocationSelect",
            Action::LocationListShown => "LocationListShown",
            Action::LocationsDidLoad(_) => "LocationsDidLoad",
            Action::WeatherFetch => "WeatherFetch",
            Action::WeatherDidLoad { .. } => "WeatherDidLoad",
            Action::WeatherDidFail { .. } => "WeatherDidFail",
            Action::WeatherDidSkip { .. } => "WeatherDidSkip",
            Action::RowWeatherFetch(_) => "RowWeatherFetch",
            Action::RowWeatherDidLoad { .. } => "RowWeatherDidLoad",
            Action::RefreshStart => "RefreshStart",
            Action::RefreshTick => "RefreshTick",
            Action::SheetOpen(_) => "SheetOpen",
            Action::SheetClose(_) => "SheetClose",
            Action::Quit => "Quit",
        }
    }

    /// One-line description for logs. Large payloads are abbreviated.
    pub fn summary(&self) -> String {
        match self {
            Action::LocationsDidLoad(list) => format!("LocationsDidLoad({} rows)", list.len()),
            Action::WeatherDidLoad { request, snapshot } => {
                format!("WeatherDidLoad(#{request} {})", snapshot.place.name)
            }
            Action::RowWeatherDidLoad { id, weather } => match weather {
                Some(w) => format!("RowWeatherDidLoad({id} {})", w.place.name),
                None => format!("RowWeatherDidLoad({id} none)"),
            },
            other => format!("{other:?}"),
        }
    }
}
