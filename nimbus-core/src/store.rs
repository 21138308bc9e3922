//! Centralized state store with reducer pattern
//!
//! The store owns the current [`UiState`] snapshot. Each dispatch runs the
//! reducer on a working copy; when the reducer reports a change the copy is
//! published to every [`watch`] subscriber as a new `Arc<UiState>`.

use std::sync::Arc;

use tokio::sync::watch;

use crate::action::Action;
use crate::effect::DispatchResult;
use crate::reducer::reducer;
use crate::state::UiState;

/// Hook around every dispatch
pub trait Middleware {
    /// Called before the action reaches the reducer
    fn before(&mut self, action: &Action);

    /// Called after the reducer ran
    fn after(&mut self, action: &Action, result: &DispatchResult);
}

/// Middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn before(&mut self, _action: &Action) {}
    fn after(&mut self, _action: &Action, _result: &DispatchResult) {}
}

pub struct Store<M: Middleware = NoopMiddleware> {
    state: Arc<UiState>,
    publisher: watch::Sender<Arc<UiState>>,
    middleware: M,
}

impl Store<NoopMiddleware> {
    pub fn new(state: UiState) -> Self {
        Self::with_middleware(state, NoopMiddleware)
    }
}

impl<M: Middleware> Store<M> {
    pub fn with_middleware(state: UiState, middleware: M) -> Self {
        let state = Arc::new(state);
        let (publisher, _) = watch::channel(state.clone());
        Self {
            state,
            publisher,
            middleware,
        }
    }

    /// Run one action through the reducer and publish the result if it changed
    pub fn dispatch(&mut self, action: Action) -> DispatchResult {
        self.middleware.before(&action);

        let mut next = UiState::clone(&self.state);
        let result = reducer(&mut next, action.clone());
        if result.changed {
            self.state = Arc::new(next);
            self.publisher.send_replace(self.state.clone());
        }

        self.middleware.after(&action, &result);
        result
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// The current snapshot, cheap to clone and hand out
    pub fn snapshot(&self) -> Arc<UiState> {
        self.state.clone()
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<UiState>> {
        self.publisher.subscribe()
    }

    pub fn middleware(&self) -> &M {
        &self.middleware
    }

    pub fn middleware_mut(&mut self) -> &mut M {
        &mut self.middleware
    }
}
