//! Continuous action sources: the refresh tick and store streams
//!
//! ```ignore
//! let mut subs = Subscriptions::new(action_tx);
//!
//! subs.interval("refresh", Duration::from_secs(1), || Action::RefreshTick);
//! subs.stream(
//!     "settings",
//!     WatchStream::new(settings.observe()).map(Action::SettingsDidChange),
//! );
//!
//! // on shutdown
//! subs.cancel_all();
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::{Stream, StreamExt};

use crate::action::Action;

pub struct Subscriptions {
    handles: HashMap<&'static str, JoinHandle<()>>,
    action_tx: mpsc::UnboundedSender<Action>,
}

impl Subscriptions {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            handles: HashMap::new(),
            action_tx,
        }
    }

    /// Emit an action every `period`, starting one period from now.
    ///
    /// Ticks are scheduled against the interval's own clock, so a slow
    /// consumer does not shift later ticks.
    pub fn interval<F>(&mut self, key: &'static str, period: Duration, action_fn: F) -> &mut Self
    where
        F: Fn() -> Action + Send + 'static,
    {
        self.cancel(key);

        let tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            // the first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                if tx.send(action_fn()).is_err() {
                    break;
                }
            }
        });

        self.handles.insert(key, handle);
        self
    }

    /// Forward every item of `stream` as an action
    pub fn stream<S>(&mut self, key: &'static str, stream: S) -> &mut Self
    where
        S: Stream<Item = Action> + Send + 'static,
    {
        self.cancel(key);

        let tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(action) = stream.next().await {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });

        self.handles.insert(key, handle);
        self
    }

    pub fn cancel(&mut self, key: &str) {
        if let Some(handle) = self.handles.remove(key) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.handles.get(key).is_some_and(|h| !h.is_finished())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::watch;
    use tokio_stream::wrappers::WatchStream;

    async fn settle() {
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_skips_immediate_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);
        subs.interval("refresh", Duration::from_secs(1), || Action::RefreshTick);

        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(rx.try_recv(), Ok(Action::RefreshTick));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_does_not_drift() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);
        subs.interval("refresh", Duration::from_secs(1), || Action::RefreshTick);
        settle().await;

        let mut ticks = 0;
        for _ in 0..50 {
            tokio::time::advance(Duration::from_secs(1)).await;
            settle().await;
            while rx.try_recv().is_ok() {
                ticks += 1;
            }
        }
        assert_eq!(ticks, 50);
    }

    #[tokio::test]
    async fn test_watch_stream_forwards_current_and_changes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);
        let (gps_tx, gps_rx) = watch::channel(false);

        subs.stream("gps", WatchStream::new(gps_rx).map(Action::GpsSet));
        assert_eq!(rx.recv().await, Some(Action::GpsSet(false)));

        gps_tx.send_replace(true);
        assert_eq!(rx.recv().await, Some(Action::GpsSet(true)));
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut subs = Subscriptions::new(tx);
        subs.interval("a", Duration::from_secs(1), || Action::RefreshTick);
        subs.interval("b", Duration::from_secs(1), || Action::RefreshTick);
        assert_eq!(subs.len(), 2);

        subs.cancel_all();
        assert!(subs.is_empty());
        assert!(!subs.is_active("a"));
    }
}
