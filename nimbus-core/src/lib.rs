//! nimbus-core: the location/weather state loop
//!
//! A Redux/Elm-style core for a weather app:
//!
//! - **Action**: every intent and every collaborator result
//! - **Reducer**: `fn(&mut UiState, Action) -> DispatchResult`, no I/O
//! - **Effect**: work the reducer asks for (store writes, lookups)
//! - **Store**: owns the state and publishes `Arc<UiState>` snapshots
//! - **EffectRuntime**: one loop applying actions and spawning effect tasks
//!
//! Collaborators (weather lookup, location store, settings store,
//! coordinate provider) sit behind the traits in [`services`].
//!
//! # Basic Example
//!
//! ```ignore
//! use nimbus_core::prelude::*;
//!
//! let mut runtime = EffectRuntime::new(UiState::new());
//! runtime
//!     .follow_stores(services.locations.as_ref(), services.settings.as_ref())
//!     .start_refresh();
//! runtime
//!     .run(|a| matches!(a, Action::Quit), |effect, ctx| handle(effect, ctx))
//!     .await;
//! ```

pub mod action;
pub mod effect;
pub mod logger;
pub mod reducer;
pub mod runtime;
pub mod services;
pub mod settings;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod tasks;
pub mod testing;

pub use action::Action;
pub use effect::{ActiveQuery, DispatchResult, Effect};
pub use logger::{glob_match, ActionLoggerConfig, ActionLoggerMiddleware};
pub use reducer::reducer;
pub use runtime::{EffectContext, EffectRuntime, REFRESH_TICK};
pub use services::{
    CoordinateProvider, FixedCoordinates, LocationStore, LookupError, Services, SettingsStore,
    StoreError, WeatherLookup,
};
pub use settings::{SettingChange, Settings};
pub use state::{
    is_valid_refresh_interval, Coordinate, DegreeUnit, LocationId, LocationWithWeather,
    ParseUnitError, Place, RefreshPhase, SavedLocation, Sheets, UiState, WeatherSnapshot,
    WindUnit, DEFAULT_REFRESH_SECS, MAX_REFRESH_SECS, MIN_REFRESH_SECS,
};
pub use store::{Middleware, NoopMiddleware, Store};
pub use subscriptions::Subscriptions;
pub use tasks::{TaskKey, TaskKind, TaskManager};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::effect::{ActiveQuery, DispatchResult, Effect};
    pub use crate::runtime::{EffectContext, EffectRuntime};
    pub use crate::services::{
        CoordinateProvider, LocationStore, Services, SettingsStore, WeatherLookup,
    };
    pub use crate::settings::{SettingChange, Settings};
    pub use crate::state::{DegreeUnit, LocationId, UiState, WeatherSnapshot, WindUnit};
    pub use crate::store::{Middleware, Store};
    pub use crate::tasks::TaskKind;
}
