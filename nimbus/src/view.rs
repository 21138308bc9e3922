//! Plain-text rendering of a state snapshot for the line driver

use nimbus_core::{LocationWithWeather, RefreshPhase, UiState};

/// One line describing the active weather and the refresh loop
pub fn summary_line(state: &UiState) -> String {
    let source = if state.gps_enabled {
        if state.location_permission {
            "gps".to_string()
        } else {
            "gps (no permission)".to_string()
        }
    } else {
        match state.selected() {
            Some(row) => format!("#{} {}", row.id(), row.location.name),
            None => "no location".to_string(),
        }
    };

    let weather = match &state.active_weather {
        Some(w) => format!(
            "{}: {} {}, wind {}, humidity {}%",
            w.headline(),
            state.degree_unit.format(w),
            w.condition_text,
            state.wind_unit.format(w),
            w.humidity_pct
        ),
        None => "no data".to_string(),
    };

    let phase = match state.refresh_phase() {
        RefreshPhase::Idle => "idle".to_string(),
        RefreshPhase::Fetching => "fetching".to_string(),
        RefreshPhase::CountingDown { remaining } => format!("next in {remaining}s"),
    };

    format!("[{source}] {weather} ({phase})")
}

fn row_line(state: &UiState, row: &LocationWithWeather) -> String {
    let marker = if state.selected_location == Some(row.id()) {
        '*'
    } else {
        ' '
    };
    let weather = match (&row.weather, row.fetched) {
        (Some(w), _) => format!("{} {}", state.degree_unit.format(w), w.condition_text),
        (None, true) => "unavailable".to_string(),
        (None, false) if state.rows_in_flight.contains(&row.id()) => "loading".to_string(),
        (None, false) => "-".to_string(),
    };
    format!("{marker} {:>4}  {:<20} {weather}", row.id().0, row.location.name)
}

/// One line per saved location; rows being deleted are left out
pub fn location_lines(state: &UiState) -> Vec<String> {
    if !state.locations_loaded {
        return vec!["loading locations...".to_string()];
    }
    let lines: Vec<String> = state
        .saved_locations
        .iter()
        .filter(|row| !state.pending_deletes.contains(&row.id()))
        .map(|row| row_line(state, row))
        .collect();
    if lines.is_empty() {
        vec!["no saved locations (add one with `add <name>`)".to_string()]
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::testing::sample_snapshot;
    use nimbus_core::{DegreeUnit, LocationId, SavedLocation};

    fn state_with_rows() -> UiState {
        let mut state = UiState::new();
        state.locations_loaded = true;
        state.saved_locations = vec![
            LocationWithWeather::new(SavedLocation::new(1, "Oslo")),
            LocationWithWeather::new(SavedLocation::new(2, "Paris")),
            LocationWithWeather::new(SavedLocation::new(3, "Rome")),
        ];
        state
    }

    #[test]
    fn test_summary_line() {
        let mut state = state_with_rows();
        assert_eq!(summary_line(&state), "[no location] no data (idle)");

        state.selected_location = Some(LocationId(2));
        state.active_weather = Some(sample_snapshot("Paris", 18.0, "Cloudy"));
        state.degree_unit = DegreeUnit::Fahrenheit;
        state.refresh_running = true;
        state.countdown_remaining = 3;
        assert_eq!(
            summary_line(&state),
            "[#2 Paris] Test Region | Paris: 64.4°F Cloudy, wind 10.0 km/h S, humidity 60% (next in 3s)"
        );

        state.gps_enabled = true;
        state.pending_request = Some(4);
        assert!(summary_line(&state).starts_with("[gps (no permission)]"));
        assert!(summary_line(&state).ends_with("(fetching)"));
    }

    #[test]
    fn test_location_lines() {
        let mut state = state_with_rows();
        state.selected_location = Some(LocationId(1));
        state.saved_locations[0].weather = Some(sample_snapshot("Oslo", 2.0, "Snow"));
        state.saved_locations[0].fetched = true;
        state.saved_locations[1].fetched = true;
        state.rows_in_flight.insert(LocationId(3));

        let lines = location_lines(&state);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("*    1  Oslo"));
        assert!(lines[0].ends_with("2.0°C Snow"));
        assert!(lines[1].ends_with("unavailable"));
        assert!(lines[2].ends_with("loading"));

        state.pending_deletes.insert(LocationId(2));
        assert_eq!(location_lines(&state).len(), 2);
    }

    #[test]
    fn test_location_lines_before_load_and_empty() {
        let mut state = UiState::new();
        assert_eq!(location_lines(&state), vec!["loading locations..."]);
        state.locations_loaded = true;
        assert!(location_lines(&state)[0].starts_with("no saved locations"));
    }
}
