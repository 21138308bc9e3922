//! Test utilities
//!
//! - [`TestHarness`]: reducer state plus an action channel for collecting
//!   what a handler emitted
//! - In-memory collaborators: [`FakeWeather`], [`MemoryLocationStore`],
//!   [`MemorySettingsStore`]
//! - Assertion macros for emitted actions or effects
//!
//! ```ignore
//! use nimbus_core::testing::TestHarness;
//! use nimbus_core::{assert_emitted, Action, Effect};
//!
//! let mut harness = TestHarness::default();
//! let result = harness.dispatch(Action::LocationInsert("Paris".into()));
//! assert_emitted!(result.effects, Effect::InsertLocation { .. });
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::action::Action;
use crate::effect::DispatchResult;
use crate::reducer::reducer;
use crate::runtime::EffectContext;
use crate::services::{LocationStore, LookupError, SettingsStore, StoreError, WeatherLookup};
use crate::settings::{SettingChange, Settings};
use crate::state::{LocationId, Place, SavedLocation, UiState, WeatherSnapshot};
use crate::subscriptions::Subscriptions;
use crate::tasks::TaskManager;

/// State under test plus the action channel an effect handler reports on
pub struct TestHarness {
    pub state: UiState,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
    tasks: TaskManager,
    subscriptions: Subscriptions,
}

impl TestHarness {
    pub fn new(state: UiState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let tasks = TaskManager::new(tx.clone());
        let subscriptions = Subscriptions::new(tx.clone());
        Self {
            state,
            tx,
            rx,
            tasks,
            subscriptions,
        }
    }

    /// Run the reducer directly on the harness state
    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        reducer(&mut self.state, action)
    }

    /// Dispatch several actions, collecting every effect
    pub fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) -> DispatchResult {
        actions
            .into_iter()
            .fold(DispatchResult::unchanged(), |acc, action| {
                let result = self.dispatch(action);
                acc.merge(result)
            })
    }

    pub fn emit(&self, action: Action) {
        let _ = self.tx.send(action);
    }

    /// Context for driving an effect handler; task results land in
    /// [`drain_emitted`](Self::drain_emitted)
    pub fn effect_context(&mut self) -> EffectContext<'_> {
        EffectContext::new(&self.tx, &mut self.tasks, &mut self.subscriptions)
    }

    /// Wait (up to five seconds) for the next emitted action
    pub async fn next_emitted(&mut self) -> Option<Action> {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn drain_emitted(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    /// Feed everything emitted so far back through the reducer
    pub fn process_emitted(&mut self) -> DispatchResult {
        let emitted = self.drain_emitted();
        self.dispatch_all(emitted)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new(UiState::default())
    }
}

/// Assert that an item matching the pattern is in the list.
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected item matching `{}`, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no item matching the pattern is in the list.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected no item matching `{}`, but it was there: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// First item matching the pattern.
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Number of items matching the pattern.
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

/// A snapshot with the fields tests usually care about
pub fn sample_snapshot(name: &str, temp_c: f64, condition: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        place: Place {
            country: "Testland".into(),
            region: "Test Region".into(),
            name: name.into(),
        },
        temp_c,
        temp_f: temp_c * 9.0 / 5.0 + 32.0,
        condition_text: condition.into(),
        condition_icon: "//cdn.weatherapi.com/weather/64x64/day/116.png".into(),
        wind_kph: 10.0,
        wind_mph: 6.2,
        wind_degree: 180,
        wind_dir: "S".into(),
        humidity_pct: 60,
        pressure_in: 30.0,
    }
}

/// Weather lookup answering from a table. Unknown queries fail.
#[derive(Default)]
pub struct FakeWeather {
    answers: Mutex<HashMap<String, WeatherSnapshot>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, query: &str, snapshot: WeatherSnapshot) -> Self {
        self.answers.lock().insert(query.to_string(), snapshot);
        self
    }

    /// Hold the answer for `query` back by `delay`
    pub fn delayed(self, query: &str, delay: Duration) -> Self {
        self.delays.lock().insert(query.to_string(), delay);
        self
    }

    /// Every query seen so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WeatherLookup for FakeWeather {
    async fn fetch_weather(&self, query: &str) -> Result<WeatherSnapshot, LookupError> {
        self.calls.lock().push(query.to_string());
        let delay = self.delays.lock().get(query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let answer = self.answers.lock().get(query).cloned();
        answer.ok_or_else(|| LookupError::Status {
            status: 400,
            message: "No matching location found.".into(),
        })
    }
}

/// Location store kept in memory, ordered by name like the SQLite one
pub struct MemoryLocationStore {
    rows: Mutex<(i64, Vec<SavedLocation>)>,
    tx: watch::Sender<Vec<SavedLocation>>,
    fail_deletes: bool,
}

impl MemoryLocationStore {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Hand out ids from `first_id` upward
    pub fn starting_at(first_id: i64) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            rows: Mutex::new((first_id, Vec::new())),
            tx,
            fail_deletes: false,
        }
    }

    /// Make every delete fail without touching the rows
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn list(&self) -> Vec<SavedLocation> {
        self.rows.lock().1.clone()
    }
}

impl Default for MemoryLocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn insert(&self, name: &str) -> Result<LocationId, StoreError> {
        let mut guard = self.rows.lock();
        let (next_id, rows) = &mut *guard;
        let id = LocationId(*next_id);
        *next_id += 1;
        rows.push(SavedLocation {
            id,
            name: name.to_string(),
        });
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        self.tx.send_replace(rows.clone());
        Ok(id)
    }

    async fn delete(&self, id: LocationId) -> Result<(), StoreError> {
        if self.fail_deletes {
            return Err(StoreError::Database("database is locked".into()));
        }
        let mut guard = self.rows.lock();
        guard.1.retain(|row| row.id != id);
        self.tx.send_replace(guard.1.clone());
        Ok(())
    }

    fn observe_all(&self) -> watch::Receiver<Vec<SavedLocation>> {
        self.tx.subscribe()
    }
}

/// Settings store kept in memory
pub struct MemorySettingsStore {
    tx: watch::Sender<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _) = watch::channel(settings);
        Self { tx }
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    fn observe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    async fn apply(&self, change: SettingChange) -> Result<(), StoreError> {
        self.tx.send_if_modified(|settings| settings.apply(change));
        Ok(())
    }
}
