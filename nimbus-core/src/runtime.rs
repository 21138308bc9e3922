//! Effect runtime: the single loop that owns the store
//!
//! Actions arrive over one unbounded channel (driver input, task results,
//! subscriptions) and are applied one at a time. Effects returned by the
//! reducer are passed to the caller's effect handler, which spawns tasks
//! through the [`EffectContext`].
//!
//! ```ignore
//! let mut runtime = EffectRuntime::new(UiState::new());
//! runtime
//!     .follow_stores(services.locations.as_ref(), services.settings.as_ref())
//!     .start_refresh();
//!
//! runtime
//!     .run(
//!         |action| matches!(action, Action::Quit),
//!         |effect, ctx| handler.handle(effect, ctx),
//!     )
//!     .await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::effect::Effect;
use crate::services::{LocationStore, SettingsStore};
use crate::state::UiState;
use crate::store::{Middleware, NoopMiddleware, Store};
use crate::subscriptions::Subscriptions;
use crate::tasks::TaskManager;

/// Period of the refresh countdown tick
pub const REFRESH_TICK: Duration = Duration::from_secs(1);

/// Handed to the effect handler for each effect
pub struct EffectContext<'a> {
    action_tx: &'a mpsc::UnboundedSender<Action>,
    tasks: &'a mut TaskManager,
    subscriptions: &'a mut Subscriptions,
}

impl<'a> EffectContext<'a> {
    pub(crate) fn new(
        action_tx: &'a mpsc::UnboundedSender<Action>,
        tasks: &'a mut TaskManager,
        subscriptions: &'a mut Subscriptions,
    ) -> Self {
        Self {
            action_tx,
            tasks,
            subscriptions,
        }
    }

    /// Queue an action behind the ones already waiting
    pub fn emit(&self, action: Action) {
        let _ = self.action_tx.send(action);
    }

    pub fn action_tx(&self) -> &mpsc::UnboundedSender<Action> {
        self.action_tx
    }

    pub fn tasks(&mut self) -> &mut TaskManager {
        self.tasks
    }

    pub fn subscriptions(&mut self) -> &mut Subscriptions {
        self.subscriptions
    }
}

pub struct EffectRuntime<M: Middleware = NoopMiddleware> {
    store: Store<M>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    tasks: TaskManager,
    subscriptions: Subscriptions,
    cancel: CancellationToken,
}

impl EffectRuntime<NoopMiddleware> {
    pub fn new(state: UiState) -> Self {
        Self::from_store(Store::new(state))
    }
}

impl<M: Middleware> EffectRuntime<M> {
    pub fn from_store(store: Store<M>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let tasks = TaskManager::new(action_tx.clone());
        let subscriptions = Subscriptions::new(action_tx.clone());

        Self {
            store,
            action_tx,
            action_rx,
            tasks,
            subscriptions,
            cancel: CancellationToken::new(),
        }
    }

    /// Mirror the settings and location stores into the state
    pub fn follow_stores(
        &mut self,
        locations: &dyn LocationStore,
        settings: &dyn SettingsStore,
    ) -> &mut Self {
        self.subscriptions.stream(
            "settings",
            WatchStream::new(settings.observe()).map(Action::SettingsDidChange),
        );
        self.subscriptions.stream(
            "locations",
            WatchStream::new(locations.observe_all()).map(Action::LocationsDidLoad),
        );
        self
    }

    /// Start the once-a-second countdown tick
    pub fn start_refresh(&mut self) -> &mut Self {
        self.subscriptions
            .interval("refresh", REFRESH_TICK, || Action::RefreshTick);
        self.enqueue(Action::RefreshStart);
        self
    }

    pub fn enqueue(&self, action: Action) {
        let _ = self.action_tx.send(action);
    }

    pub fn action_tx(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    pub fn state(&self) -> &UiState {
        self.store.state()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<UiState>> {
        self.store.subscribe()
    }

    /// Token that stops [`run`](Self::run) when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Store<M> {
        &self.store
    }

    pub fn tasks(&mut self) -> &mut TaskManager {
        &mut self.tasks
    }

    pub fn subscriptions(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn effect_context(&mut self) -> EffectContext<'_> {
        EffectContext::new(&self.action_tx, &mut self.tasks, &mut self.subscriptions)
    }

    /// Apply one action and hand its effects to `handle_effect`.
    /// Returns whether the state changed.
    pub fn dispatch<FEffect>(&mut self, action: Action, handle_effect: &mut FEffect) -> bool
    where
        FEffect: FnMut(Effect, &mut EffectContext<'_>),
    {
        let result = self.store.dispatch(action);
        if result.has_effects() {
            let mut ctx = self.effect_context();
            for effect in result.effects {
                handle_effect(effect, &mut ctx);
            }
        }
        result.changed
    }

    /// Process actions until `should_quit` matches one or the cancel token fires.
    ///
    /// On exit every subscription and task is aborted and the action channel
    /// is closed, so late results are dropped.
    pub async fn run<FQuit, FEffect>(&mut self, mut should_quit: FQuit, mut handle_effect: FEffect)
    where
        FQuit: FnMut(&Action) -> bool,
        FEffect: FnMut(Effect, &mut EffectContext<'_>),
    {
        let cancel = self.cancel.clone();
        tracing::info!("runtime started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }

                Some(action) = self.action_rx.recv() => {
                    if should_quit(&action) {
                        break;
                    }
                    self.dispatch(action, &mut handle_effect);
                }

                else => {
                    break;
                }
            }
        }

        self.shutdown();
        tracing::info!("runtime stopped");
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        self.subscriptions.cancel_all();
        self.tasks.cancel_all();
        self.action_rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::ActiveQuery;
    use crate::state::{LocationId, LocationWithWeather, SavedLocation, WeatherSnapshot};
    use crate::tasks::TaskKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn oslo_selected() -> UiState {
        let mut state = UiState::new();
        state.saved_locations = vec![LocationWithWeather::new(SavedLocation::new(1, "Oslo"))];
        state.selected_location = Some(LocationId(1));
        state.locations_loaded = true;
        state
    }

    #[tokio::test]
    async fn test_quit_stops_loop() {
        let mut runtime = EffectRuntime::new(UiState::new());
        runtime.enqueue(Action::LocationsDidLoad(vec![SavedLocation::new(1, "Oslo")]));
        runtime.enqueue(Action::Quit);
        runtime.enqueue(Action::LocationListShown);

        let mut handled = 0;
        runtime
            .run(|a| matches!(a, Action::Quit), |_, _| handled += 1)
            .await;

        assert_eq!(runtime.state().saved_locations.len(), 1);
        assert_eq!(handled, 0, "actions after Quit are not processed");
    }

    #[tokio::test]
    async fn test_task_results_reenter() {
        let mut runtime = EffectRuntime::new(oslo_selected());
        let mut snapshots = runtime.subscribe();
        runtime.enqueue(Action::WeatherFetch);

        let cancel = runtime.cancel_token();
        let handle = tokio::spawn(async move {
            runtime
                .run(
                    |_| false,
                    |effect, ctx| {
                        if let Effect::FetchActiveWeather { request, query } = effect {
                            assert_eq!(query, ActiveQuery::Place("Oslo".into()));
                            ctx.tasks().spawn(TaskKind::ActiveWeather, async move {
                                let mut snapshot = WeatherSnapshot::default();
                                snapshot.place.name = "Oslo".into();
                                Some(Action::WeatherDidLoad { request, snapshot })
                            });
                        }
                    },
                )
                .await;
            runtime
        });

        let loaded = tokio::time::timeout(
            Duration::from_secs(1),
            snapshots.wait_for(|s| s.active_weather.is_some()),
        )
        .await
        .expect("timeout")
        .expect("store dropped")
        .clone();
        assert_eq!(loaded.active_weather.as_ref().map(|w| w.place.name.as_str()), Some("Oslo"));

        cancel.cancel();
        let runtime = handle.await.unwrap();
        assert!(runtime.tasks.is_empty());
        assert!(runtime.subscriptions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_fetches_once_per_interval() {
        let mut runtime = EffectRuntime::new(oslo_selected());
        runtime.start_refresh();

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let cancel = runtime.cancel_token();
        let handle = tokio::spawn(async move {
            runtime
                .run(
                    |_| false,
                    move |effect, ctx| {
                        if let Effect::FetchActiveWeather { request, .. } = effect {
                            counter.fetch_add(1, Ordering::SeqCst);
                            ctx.emit(Action::WeatherDidSkip { request });
                        }
                    },
                )
                .await;
        });

        // one fetch at start, then one every 5 ticks for 50 seconds
        tokio::time::sleep(Duration::from_millis(50_500)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1 + 10);
    }

    #[tokio::test]
    async fn test_results_after_teardown_are_dropped() {
        let mut runtime = EffectRuntime::new(UiState::new());
        let tx = runtime.action_tx();
        runtime.enqueue(Action::Quit);
        runtime.run(|a| matches!(a, Action::Quit), |_, _| {}).await;

        assert!(tx.send(Action::RefreshTick).is_err());
    }
}
