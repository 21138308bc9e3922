//! Background notifier
//!
//! Runs while the interactive driver is not: every period it reads the
//! persisted unit and last location name, looks the weather up once and
//! posts a notification. It never touches `UiState`.

use std::sync::Arc;
use std::time::Duration;

use nimbus_core::{DegreeUnit, SettingsStore, WeatherLookup, WeatherSnapshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn weather(snapshot: &WeatherSnapshot, unit: DegreeUnit) -> Self {
        Self {
            title: snapshot.headline(),
            body: format!("{} | {}", unit.format(snapshot), snapshot.condition_text),
        }
    }

    /// Posted when there is no location or the lookup failed
    pub fn no_data() -> Self {
        Self {
            title: "Can't get weather data".into(),
            body: "Location not available. Choose a location or enable GPS.".into(),
        }
    }
}

/// Where notifications end up
pub trait NotificationSink: Send + Sync {
    fn post(&self, notification: &Notification);
}

/// Prints notifications to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn post(&self, notification: &Notification) {
        info!(title = %notification.title, "notification posted");
        println!("[{}] {}", notification.title, notification.body);
    }
}

pub struct Notifier {
    settings: Arc<dyn SettingsStore>,
    weather: Arc<dyn WeatherLookup>,
    sink: Arc<dyn NotificationSink>,
    period: Duration,
}

impl Notifier {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        weather: Arc<dyn WeatherLookup>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            settings,
            weather,
            sink,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Fetch once and post, regardless of the notification toggle
    pub async fn notify_once(&self) -> Notification {
        let (location, unit) = {
            let settings = self.settings.observe();
            let settings = settings.borrow();
            (settings.last_location.trim().to_string(), settings.degree_unit)
        };

        let notification = if location.is_empty() {
            debug!("no last location stored");
            Notification::no_data()
        } else {
            match self.weather.fetch_weather(&location).await {
                Ok(snapshot) => Notification::weather(&snapshot, unit),
                Err(e) => {
                    warn!(error = %e, %location, "notification lookup failed");
                    Notification::no_data()
                }
            }
        };

        self.sink.post(&notification);
        notification
    }

    /// Post every period while notifications are enabled, until cancelled.
    /// The first notification goes out right away.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = self.period.as_secs(), "notifier started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let enabled = self.settings.observe().borrow().notifications_enabled;
                    if enabled {
                        self.notify_once().await;
                    } else {
                        debug!("notifications disabled, skipping");
                    }
                }
            }
        }

        info!("notifier stopped");
    }
}
