//! Settings written from back-to-back selections land in dispatch order

use std::sync::Arc;

use nimbus::{EffectHandler, TomlSettingsStore};
use nimbus_core::testing::{FakeWeather, MemoryLocationStore};
use nimbus_core::{
    Action, EffectRuntime, FixedCoordinates, LocationId, SavedLocation, Services, UiState,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_selection_wins_on_disk() {
    for round in 0..100 {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = Arc::new(TomlSettingsStore::load(&path).unwrap());
        let services = Services {
            weather: Arc::new(FakeWeather::new()),
            locations: Arc::new(MemoryLocationStore::new()),
            settings: settings.clone(),
            coordinates: Arc::new(FixedCoordinates::unavailable()),
        };
        let handler = EffectHandler::new(services);

        let mut runtime = EffectRuntime::new(UiState::new());
        runtime.dispatch(
            Action::LocationsDidLoad(vec![SavedLocation::new(1, "Oslo"), SavedLocation::new(2, "Rome")]),
            &mut |effect, ctx| handler.handle(effect, ctx),
        );
        runtime.dispatch(Action::LocationSelect(LocationId(1)), &mut |effect, ctx| {
            handler.handle(effect, ctx)
        });
        runtime.dispatch(Action::LocationSelect(LocationId(2)), &mut |effect, ctx| {
            handler.handle(effect, ctx)
        });
        handler.close().await;

        let current = settings.current();
        assert_eq!(current.selected_location, Some(LocationId(2)), "round {round}");
        assert_eq!(current.last_location, "Rome", "round {round}");

        let reloaded = TomlSettingsStore::load(&path).unwrap().current();
        assert_eq!(reloaded.selected_location, Some(LocationId(2)), "round {round}");
        assert_eq!(reloaded.last_location, "Rome", "round {round}");
    }
}
