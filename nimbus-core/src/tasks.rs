//! Task manager for collaborator calls
//!
//! Every effect that touches a collaborator runs as its own tokio task. A
//! task may resolve to a follow-up action, which is sent back to the runtime.
//! Individual tasks are never cancelled: results that arrive late are sorted
//! out by the reducer. Teardown aborts everything still running.
//!
//! ```ignore
//! let (action_tx, mut action_rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut tasks = TaskManager::new(action_tx);
//!
//! tasks.spawn(TaskKind::RowWeather(id), async move {
//!     let weather = lookup.fetch_weather(&name).await.ok();
//!     Some(Action::RowWeatherDidLoad { id, weather })
//! });
//!
//! // on shutdown
//! tasks.cancel_all();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::action::Action;
use crate::state::LocationId;

/// What a task is doing
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TaskKind {
    ActiveWeather,
    RowWeather(LocationId),
    LocationWrite,
}

/// Identifies one spawned task. Several tasks of the same kind may run at once.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey {
    pub kind: TaskKind,
    pub seq: u64,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.seq)
    }
}

pub struct TaskManager {
    tasks: HashMap<TaskKey, AbortHandle>,
    action_tx: mpsc::UnboundedSender<Action>,
    next_seq: u64,
}

impl TaskManager {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        Self {
            tasks: HashMap::new(),
            action_tx,
            next_seq: 0,
        }
    }

    /// Spawn a task. Its output, if any, is dispatched as an action.
    pub fn spawn<F>(&mut self, kind: TaskKind, future: F) -> TaskKey
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        self.prune();

        let key = TaskKey {
            kind,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let tx = self.action_tx.clone();
        let handle = tokio::spawn(async move {
            if let Some(action) = future.await {
                // closed channel means the runtime is gone; drop the result
                let _ = tx.send(action);
            }
        });

        self.tasks.insert(key, handle.abort_handle());
        key
    }

    /// Abort every task still running
    pub fn cancel_all(&mut self) {
        for (key, handle) in self.tasks.drain() {
            if !handle.is_finished() {
                tracing::debug!(task = %key, "aborting task");
            }
            handle.abort();
        }
    }

    /// Number of unfinished tasks of this kind
    pub fn running(&self, kind: TaskKind) -> usize {
        self.tasks
            .iter()
            .filter(|(key, handle)| key.kind == kind && !handle.is_finished())
            .count()
    }

    /// Number of unfinished tasks
    pub fn len(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
