//! Action logging with pattern-based filtering
//!
//! # Example
//!
//! ```ignore
//! use nimbus_core::{ActionLoggerConfig, ActionLoggerMiddleware, Store, UiState};
//!
//! // Everything except the once-a-second tick
//! let middleware = ActionLoggerMiddleware::new(ActionLoggerConfig::default());
//! let store = Store::with_middleware(UiState::new(), middleware);
//! ```

use crate::action::Action;
use crate::effect::DispatchResult;
use crate::store::Middleware;

const DEFAULT_EXCLUDES: &[&str] = &["RefreshTick"];

/// Glob include/exclude filter over action names.
///
/// Patterns support `*` (any sequence) and `?` (one character), e.g.
/// `Location*`, `*Did*`, `RefreshTick`.
#[derive(Debug, Clone)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern strings.
    ///
    /// `None` for `include` logs everything; `None` for `exclude` keeps the
    /// default excludes.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let include_patterns = include.map(split_patterns).unwrap_or_default();
        let exclude_patterns = exclude
            .map(split_patterns)
            .unwrap_or_else(|| Self::default().exclude_patterns);

        Self {
            include_patterns,
            exclude_patterns,
        }
    }

    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Logs dispatched actions through `tracing`
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    active: bool,
    logged: u64,
}

impl Default for ActionLoggerMiddleware {
    fn default() -> Self {
        Self::new(ActionLoggerConfig::default())
    }
}

impl ActionLoggerMiddleware {
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            active: true,
            logged: 0,
        }
    }

    /// Enable or disable logging (builder style)
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of actions that passed the filter so far
    pub fn logged(&self) -> u64 {
        self.logged
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl Middleware for ActionLoggerMiddleware {
    fn before(&mut self, action: &Action) {
        if !self.active || !self.config.should_log(action.name()) {
            return;
        }
        self.logged += 1;
        tracing::debug!(action = %action.name(), summary = %action.summary(), "action");
    }

    fn after(&mut self, action: &Action, result: &DispatchResult) {
        if !self.active || !self.config.should_log(action.name()) {
            return;
        }
        tracing::debug!(
            action = %action.name(),
            changed = result.changed,
            effects = result.effects.len(),
            "action processed"
        );
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // dp[j]: pattern[..i] matches text[..j]
    let mut dp = vec![false; text.len() + 1];
    dp[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '*' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            '?' => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = dp[j - 1] && text[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[text.len()]
}
