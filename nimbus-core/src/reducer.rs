//! Reducer - (state, action) -> changed flag + effects
//!
//! All state mutations happen here. I/O is described as [`Effect`]s and
//! executed by the runtime; results come back as `*Did*` actions.

use tracing::{debug, warn};

use crate::action::Action;
use crate::effect::{DispatchResult, Effect};
use crate::settings::{SettingChange, Settings};
use crate::state::{
    is_valid_refresh_interval, LocationId, LocationWithWeather, SavedLocation, Sheets, UiState,
};

pub fn reducer(state: &mut UiState, action: Action) -> DispatchResult {
    match action {
        // ===== Settings =====
        Action::GpsSet(on) => DispatchResult::effect(Effect::PersistSetting(SettingChange::Gps(on))),

        Action::DegreeUnitSet(unit) => {
            close_sheet(state, Sheets::DEGREE).with(Effect::PersistSetting(SettingChange::DegreeUnit(unit)))
        }

        Action::WindUnitSet(unit) => {
            close_sheet(state, Sheets::WIND).with(Effect::PersistSetting(SettingChange::WindUnit(unit)))
        }

        Action::RefreshIntervalSet(secs) => {
            if !is_valid_refresh_interval(secs) {
                warn!(secs, "refresh interval out of range");
                return DispatchResult::unchanged();
            }
            close_sheet(state, Sheets::REFRESH)
                .with(Effect::PersistSetting(SettingChange::RefreshInterval(secs)))
        }

        Action::NotificationsSet(on) => close_sheet(state, Sheets::NOTIFICATION)
            .with(Effect::PersistSetting(SettingChange::Notifications(on))),

        Action::PermissionUpdate(granted) => {
            if state.location_permission == granted {
                return DispatchResult::unchanged();
            }
            state.location_permission = granted;
            if granted {
                state.sheets.remove(Sheets::PERMISSION);
            }
            DispatchResult::changed().merge(follow_active_query(state))
        }

        Action::SettingsDidChange(settings) => {
            let changed = apply_settings(state, settings);
            DispatchResult::unchanged()
                .changed_if(changed)
                .merge(follow_active_query(state))
        }

        // ===== Locations =====
        Action::LocationInsert(name) => {
            let name = name.trim();
            if name.is_empty() {
                debug!("ignoring blank location name");
                return DispatchResult::unchanged();
            }
            close_sheet(state, Sheets::INSERT).with(Effect::InsertLocation {
                name: name.to_string(),
            })
        }

        Action::LocationDelete(id) => {
            if state.location(id).is_none() || state.pending_deletes.contains(&id) {
                debug!(%id, "delete of unknown location ignored");
                return DispatchResult::unchanged();
            }
            state.pending_deletes.insert(id);
            let mut result =
                close_sheet(state, Sheets::DELETE).with(Effect::DeleteLocation { id }).mark_changed();
            if state.selected_location == Some(id) {
                state.selected_location = None;
                result = result.with(Effect::PersistSetting(SettingChange::SelectedLocation(None)));
            }
            result
        }

        Action::LocationDeleteDidFail(id) => {
            // the row is still stored; show it again
            DispatchResult::unchanged().changed_if(state.pending_deletes.remove(&id))
        }

        Action::LocationSelect(id) => {
            let Some(name) = state.location(id).map(|row| row.location.name.clone()) else {
                debug!(%id, "select of unknown location ignored");
                return DispatchResult::unchanged();
            };
            if state.pending_deletes.contains(&id) {
                return DispatchResult::unchanged();
            }
            state.selected_location = Some(id);
            close_sheet(state, Sheets::SELECT)
                .mark_changed()
                .with(Effect::PersistSetting(SettingChange::SelectedLocation(Some(id))))
                .with(Effect::PersistSetting(SettingChange::LastLocation(name)))
                .merge(follow_active_query(state))
        }

        Action::LocationListShown => fan_out_rows(state),

        Action::LocationsDidLoad(list) => {
            apply_locations(state, list).merge(follow_active_query(state))
        }

        // ===== Active weather =====
        Action::WeatherFetch => request_active_weather(state),

        Action::WeatherDidLoad { request, snapshot } => {
            let finished = finish_request(state, request);
            if !settle_request(state, request) {
                debug!(request, "dropping stale weather result");
                return DispatchResult::unchanged().changed_if(finished);
            }
            if state.active_weather.as_ref() == Some(&snapshot) {
                return DispatchResult::unchanged().changed_if(finished);
            }
            state.active_weather = Some(snapshot);
            DispatchResult::changed()
        }

        Action::WeatherDidFail { request, reason } => {
            warn!(request, %reason, "active weather lookup failed");
            settle_request(state, request);
            DispatchResult::unchanged().changed_if(finish_request(state, request))
        }

        Action::WeatherDidSkip { request } => {
            debug!(request, "no coordinate available");
            settle_request(state, request);
            DispatchResult::unchanged().changed_if(finish_request(state, request))
        }

        // ===== Row weather =====
        Action::RowWeatherFetch(id) => {
            if state.pending_deletes.contains(&id) {
                return DispatchResult::unchanged();
            }
            let Some(row) = state.location(id) else {
                return DispatchResult::unchanged();
            };
            let name = row.location.name.clone();
            state.rows_in_flight.insert(id);
            DispatchResult::changed_with(Effect::FetchRowWeather { id, name })
        }

        Action::RowWeatherDidLoad { id, weather } => {
            let was_in_flight = state.rows_in_flight.remove(&id);
            let Some(row) = state.location_mut(id) else {
                return DispatchResult::unchanged().changed_if(was_in_flight);
            };
            let changed = !row.fetched || row.weather != weather;
            row.weather = weather;
            row.fetched = true;
            DispatchResult::unchanged().changed_if(changed || was_in_flight)
        }

        // ===== Refresh loop =====
        Action::RefreshStart => {
            if state.refresh_running {
                return DispatchResult::unchanged();
            }
            state.refresh_running = true;
            state.countdown_remaining = state.refresh_interval_secs;
            DispatchResult::changed().merge(follow_active_query(state))
        }

        Action::RefreshTick => tick(state),

        // ===== Sheets =====
        Action::SheetOpen(sheet) => {
            if state.sheets.contains(sheet) {
                return DispatchResult::unchanged();
            }
            state.sheets.insert(sheet);
            DispatchResult::changed()
        }

        Action::SheetClose(sheet) => close_sheet(state, sheet),

        // Handled by the runtime loop
        Action::Quit => DispatchResult::unchanged(),
    }
}

fn close_sheet(state: &mut UiState, sheet: Sheets) -> DispatchResult {
    if !state.sheets.intersects(sheet) {
        return DispatchResult::unchanged();
    }
    state.sheets.remove(sheet);
    DispatchResult::changed()
}

/// Issue an active lookup for whatever the state currently resolves to.
///
/// The previous `active_weather` stays visible until the result lands.
fn request_active_weather(state: &mut UiState) -> DispatchResult {
    let Some(query) = state.active_query() else {
        if state.gps_enabled && !state.location_permission {
            debug!("gps enabled without permission");
            let opened = !state.sheets.contains(Sheets::PERMISSION);
            state.sheets.insert(Sheets::PERMISSION);
            return DispatchResult::unchanged().changed_if(opened);
        }
        debug!("no location to fetch weather for");
        return DispatchResult::unchanged();
    };

    let request = state.next_request;
    state.next_request += 1;
    state.pending_request = Some(request);
    state.last_query = Some(query.clone());
    DispatchResult::changed_with(Effect::FetchActiveWeather { request, query })
}

/// While the refresh loop runs, fetch right away when the resolved query
/// differs from the one last requested (first load, new selection, GPS toggle).
fn follow_active_query(state: &mut UiState) -> DispatchResult {
    if !state.refresh_running {
        return DispatchResult::unchanged();
    }
    match state.active_query() {
        Some(query) if state.last_query.as_ref() != Some(&query) => request_active_weather(state),
        _ => DispatchResult::unchanged(),
    }
}

/// Record `request` as resolved. Returns false when a later lookup already
/// resolved, in which case the caller must drop the result.
fn settle_request(state: &mut UiState, request: u64) -> bool {
    if state.settled_request.is_some_and(|settled| settled > request) {
        return false;
    }
    state.settled_request = Some(request);
    true
}

/// Clear the pending marker if `request` is the latest one issued.
fn finish_request(state: &mut UiState, request: u64) -> bool {
    if state.pending_request == Some(request) {
        state.pending_request = None;
        true
    } else {
        false
    }
}

fn tick(state: &mut UiState) -> DispatchResult {
    if !state.refresh_running {
        return DispatchResult::unchanged();
    }
    let remaining = state.countdown_remaining.saturating_sub(1);
    if remaining > 0 {
        state.countdown_remaining = remaining;
        return DispatchResult::changed();
    }
    state.countdown_remaining = state.refresh_interval_secs;
    request_active_weather(state).mark_changed()
}

fn apply_settings(state: &mut UiState, settings: Settings) -> bool {
    let mut changed = false;

    if state.gps_enabled != settings.gps_enabled {
        state.gps_enabled = settings.gps_enabled;
        changed = true;
    }
    if state.degree_unit != settings.degree_unit {
        state.degree_unit = settings.degree_unit;
        changed = true;
    }
    if state.wind_unit != settings.wind_unit {
        state.wind_unit = settings.wind_unit;
        changed = true;
    }
    if state.notifications_enabled != settings.notifications_enabled {
        state.notifications_enabled = settings.notifications_enabled;
        changed = true;
    }

    let interval = settings.refresh_interval();
    if state.refresh_interval_secs != interval {
        state.refresh_interval_secs = interval;
        // the countdown in progress keeps running, but never past the new interval
        state.countdown_remaining = state.countdown_remaining.min(interval);
        changed = true;
    }

    let selected = settings.selected_location.filter(|id| {
        !state.pending_deletes.contains(id) && (!state.locations_loaded || state.location(*id).is_some())
    });
    if state.selected_location != selected {
        state.selected_location = selected;
        changed = true;
    }

    changed
}

/// Replace the rows with a fresh store emission. Every row starts unfetched.
fn apply_locations(state: &mut UiState, list: Vec<SavedLocation>) -> DispatchResult {
    let rows: Vec<LocationWithWeather> = list.into_iter().map(LocationWithWeather::new).collect();
    let present = |id: &LocationId| rows.iter().any(|row| row.id() == *id);

    state.rows_in_flight.retain(|id| present(id));
    state.pending_deletes.retain(|id| present(id));

    let mut result = DispatchResult::changed();
    if let Some(id) = state.selected_location {
        if !present(&id) {
            debug!(%id, "selected location no longer stored");
            state.selected_location = None;
            result = result.with(Effect::PersistSetting(SettingChange::SelectedLocation(None)));
        }
    }

    state.saved_locations = rows;
    state.locations_loaded = true;
    result
}

/// One row lookup for every row that has neither data nor a request in flight.
fn fan_out_rows(state: &mut UiState) -> DispatchResult {
    let pending: Vec<(LocationId, String)> = state
        .saved_locations
        .iter()
        .filter(|row| {
            !row.fetched
                && !state.rows_in_flight.contains(&row.id())
                && !state.pending_deletes.contains(&row.id())
        })
        .map(|row| (row.id(), row.location.name.clone()))
        .collect();

    if pending.is_empty() {
        return DispatchResult::unchanged();
    }

    let effects = pending
        .into_iter()
        .map(|(id, name)| {
            state.rows_in_flight.insert(id);
            Effect::FetchRowWeather { id, name }
        })
        .collect();
    DispatchResult::changed_with_many(effects)
}
