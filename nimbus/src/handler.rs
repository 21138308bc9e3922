//! Effect handler: turns reducer effects into collaborator calls
//!
//! Lookups and location writes each become one spawned task. Lookups report
//! back with a result action; location writes report only failures, because
//! the store's own stream brings new values back into the state.
//!
//! Settings writes go through a single writer task and are applied in the
//! order the reducer asked for them, so the last choice is the one that
//! sticks.

use nimbus_core::{
    Action, ActiveQuery, Effect, EffectContext, Services, SettingChange, TaskKind,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct EffectHandler {
    services: Services,
    settings_tx: mpsc::UnboundedSender<SettingChange>,
    writer: JoinHandle<()>,
}

impl EffectHandler {
    /// Must be called inside a tokio runtime; starts the settings writer
    pub fn new(services: Services) -> Self {
        let (settings_tx, mut settings_rx) = mpsc::unbounded_channel::<SettingChange>();
        let settings = services.settings.clone();
        let writer = tokio::spawn(async move {
            while let Some(change) = settings_rx.recv().await {
                if let Err(e) = settings.apply(change.clone()).await {
                    warn!(error = %e, ?change, "failed to persist setting");
                }
            }
            debug!("settings writer stopped");
        });

        Self {
            services,
            settings_tx,
            writer,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Stop accepting effects and wait until queued settings are written
    pub async fn close(self) {
        drop(self.settings_tx);
        if let Err(e) = self.writer.await {
            warn!(error = %e, "settings writer failed");
        }
    }

    pub fn handle(&self, effect: Effect, ctx: &mut EffectContext<'_>) {
        match effect {
            Effect::PersistSetting(change) => {
                if self.settings_tx.send(change).is_err() {
                    warn!("settings writer gone, change dropped");
                }
            }

            Effect::InsertLocation { name } => {
                let locations = self.services.locations.clone();
                ctx.tasks().spawn(TaskKind::LocationWrite, async move {
                    if let Err(e) = locations.insert(&name).await {
                        warn!(error = %e, %name, "failed to insert location");
                    }
                    None
                });
            }

            Effect::DeleteLocation { id } => {
                let locations = self.services.locations.clone();
                ctx.tasks().spawn(TaskKind::LocationWrite, async move {
                    match locations.delete(id).await {
                        Ok(()) => None,
                        Err(e) => {
                            warn!(error = %e, %id, "failed to delete location");
                            Some(Action::LocationDeleteDidFail(id))
                        }
                    }
                });
            }

            Effect::FetchActiveWeather { request, query } => {
                let weather = self.services.weather.clone();
                let coordinates = self.services.coordinates.clone();
                ctx.tasks().spawn(TaskKind::ActiveWeather, async move {
                    let query = match query {
                        ActiveQuery::Place(name) => name,
                        ActiveQuery::Gps => match coordinates.last_known().await {
                            Some(coordinate) => coordinate.to_query(),
                            None => return Some(Action::WeatherDidSkip { request }),
                        },
                    };
                    Some(match weather.fetch_weather(&query).await {
                        Ok(snapshot) => Action::WeatherDidLoad { request, snapshot },
                        Err(e) => Action::WeatherDidFail {
                            request,
                            reason: e.to_string(),
                        },
                    })
                });
            }

            Effect::FetchRowWeather { id, name } => {
                let weather = self.services.weather.clone();
                ctx.tasks().spawn(TaskKind::RowWeather(id), async move {
                    let weather = match weather.fetch_weather(&name).await {
                        Ok(snapshot) => Some(snapshot),
                        Err(e) => {
                            warn!(error = %e, %id, %name, "row weather lookup failed");
                            None
                        }
                    };
                    Some(Action::RowWeatherDidLoad { id, weather })
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::testing::{
        sample_snapshot, FakeWeather, MemoryLocationStore, MemorySettingsStore, TestHarness,
    };
    use nimbus_core::{FixedCoordinates, LocationId, LocationStore, SavedLocation, SettingsStore};
    use std::sync::Arc;

    fn services(weather: FakeWeather, locations: MemoryLocationStore) -> Services {
        Services {
            weather: Arc::new(weather),
            locations: Arc::new(locations),
            settings: Arc::new(MemorySettingsStore::default()),
            coordinates: Arc::new(FixedCoordinates::unavailable()),
        }
    }

    #[tokio::test]
    async fn test_failed_delete_reports_back() {
        let locations = MemoryLocationStore::new().failing_deletes();
        let id = locations.insert("Oslo").await.unwrap();
        let handler = EffectHandler::new(services(FakeWeather::new(), locations));
        let mut harness = TestHarness::default();
        harness.dispatch(Action::LocationsDidLoad(vec![SavedLocation::new(id.0, "Oslo")]));
        let result = harness.dispatch(Action::LocationDelete(id));

        for effect in result.effects {
            handler.handle(effect, &mut harness.effect_context());
        }

        let reported = harness.next_emitted().await;
        assert_eq!(reported, Some(Action::LocationDeleteDidFail(id)));
        harness.dispatch(Action::LocationDeleteDidFail(id));
        assert!(harness.state.pending_deletes.is_empty());
        assert!(harness.state.location(id).is_some());
    }

    #[tokio::test]
    async fn test_successful_delete_is_silent() {
        let locations = MemoryLocationStore::new();
        let id = locations.insert("Oslo").await.unwrap();
        let services = services(FakeWeather::new(), locations);
        let handler = EffectHandler::new(services.clone());
        let mut harness = TestHarness::default();

        handler.handle(Effect::DeleteLocation { id }, &mut harness.effect_context());
        handler.handle(
            Effect::FetchRowWeather {
                id: LocationId(99),
                name: "Nowhere".into(),
            },
            &mut harness.effect_context(),
        );

        // the row lookup result arrives; the delete sent nothing
        assert_eq!(
            harness.next_emitted().await,
            Some(Action::RowWeatherDidLoad {
                id: LocationId(99),
                weather: None
            })
        );
        assert!(harness.drain_emitted().is_empty());
        assert!(services.locations.observe_all().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_row_lookup_reports_snapshot() {
        let rome = sample_snapshot("Rome", 24.0, "Sunny");
        let handler = EffectHandler::new(services(
            FakeWeather::new().with("Rome", rome.clone()),
            MemoryLocationStore::new(),
        ));
        let mut harness = TestHarness::default();

        handler.handle(
            Effect::FetchRowWeather {
                id: LocationId(2),
                name: "Rome".into(),
            },
            &mut harness.effect_context(),
        );

        assert_eq!(
            harness.next_emitted().await,
            Some(Action::RowWeatherDidLoad {
                id: LocationId(2),
                weather: Some(rome)
            })
        );
    }

    #[tokio::test]
    async fn test_settings_written_in_order() {
        let services = services(FakeWeather::new(), MemoryLocationStore::new());
        let handler = EffectHandler::new(services.clone());
        let mut harness = TestHarness::default();

        for id in 1..=50 {
            handler.handle(
                Effect::PersistSetting(SettingChange::SelectedLocation(Some(LocationId(id)))),
                &mut harness.effect_context(),
            );
        }
        handler.close().await;

        assert_eq!(
            services.settings.observe().borrow().selected_location,
            Some(LocationId(50))
        );
    }
}
