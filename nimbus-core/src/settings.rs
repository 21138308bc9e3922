//! Persisted preferences
//!
//! The settings store publishes a whole [`Settings`] value on every change and
//! accepts one [`SettingChange`] per write.

use serde::{Deserialize, Serialize};

use crate::state::{
    is_valid_refresh_interval, DegreeUnit, LocationId, WindUnit, DEFAULT_REFRESH_SECS,
};

/// Everything the settings store keeps
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gps_enabled: bool,
    pub degree_unit: DegreeUnit,
    pub wind_unit: WindUnit,
    pub refresh_interval_secs: u32,
    pub notifications_enabled: bool,
    pub selected_location: Option<LocationId>,
    /// Name of the last selected location, read by the background notifier
    pub last_location: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gps_enabled: false,
            degree_unit: DegreeUnit::default(),
            wind_unit: WindUnit::default(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            notifications_enabled: false,
            selected_location: None,
            last_location: String::new(),
        }
    }
}

impl Settings {
    /// Replace one key. Returns whether the stored value differs afterwards.
    pub fn apply(&mut self, change: SettingChange) -> bool {
        match change {
            SettingChange::Gps(on) => replace(&mut self.gps_enabled, on),
            SettingChange::DegreeUnit(unit) => replace(&mut self.degree_unit, unit),
            SettingChange::WindUnit(unit) => replace(&mut self.wind_unit, unit),
            SettingChange::RefreshInterval(secs) => {
                replace(&mut self.refresh_interval_secs, secs)
            }
            SettingChange::Notifications(on) => replace(&mut self.notifications_enabled, on),
            SettingChange::SelectedLocation(id) => replace(&mut self.selected_location, id),
            SettingChange::LastLocation(name) => replace(&mut self.last_location, name),
        }
    }

    /// Stored interval, or the default when the file holds something out of range
    pub fn refresh_interval(&self) -> u32 {
        if is_valid_refresh_interval(self.refresh_interval_secs) {
            self.refresh_interval_secs
        } else {
            DEFAULT_REFRESH_SECS
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A single-key write to the settings store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingChange {
    Gps(bool),
    DegreeUnit(DegreeUnit),
    WindUnit(WindUnit),
    RefreshInterval(u32),
    Notifications(bool),
    SelectedLocation(Option<LocationId>),
    LastLocation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.gps_enabled);
        assert_eq!(settings.degree_unit, DegreeUnit::Celsius);
        assert_eq!(settings.wind_unit, WindUnit::Kph);
        assert_eq!(settings.refresh_interval(), 5);
        assert_eq!(settings.selected_location, None);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut settings = Settings::default();
        assert!(settings.apply(SettingChange::Gps(true)));
        assert!(!settings.apply(SettingChange::Gps(true)));
        assert!(settings.apply(SettingChange::SelectedLocation(Some(LocationId(4)))));
        assert_eq!(settings.selected_location, Some(LocationId(4)));
    }

    #[test]
    fn test_out_of_range_interval_falls_back() {
        let settings = Settings {
            refresh_interval_secs: 600,
            ..Default::default()
        };
        assert_eq!(settings.refresh_interval(), DEFAULT_REFRESH_SECS);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"degree_unit":"fahrenheit"}"#).unwrap();
        assert_eq!(settings.degree_unit, DegreeUnit::Fahrenheit);
        assert_eq!(settings.wind_unit, WindUnit::Kph);
        assert_eq!(settings.refresh_interval_secs, 5);
    }
}
