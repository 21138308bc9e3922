//! nimbus: collaborators and driver pieces around `nimbus-core`
//!
//! - [`api`]: weatherapi.com client
//! - [`locations`]: SQLite location store
//! - [`settings`]: TOML settings store
//! - [`handler`]: effect handler wiring effects to the collaborators
//! - [`notifier`]: background notification loop
//! - [`config`], [`commands`], [`view`]: what the binary needs

pub mod api;
pub mod commands;
pub mod config;
pub mod handler;
pub mod locations;
pub mod notifier;
pub mod settings;
pub mod view;

pub use api::WeatherApiClient;
pub use handler::EffectHandler;
pub use locations::SqliteLocationStore;
pub use notifier::{Notification, NotificationSink, Notifier, StdoutSink};
pub use settings::TomlSettingsStore;
