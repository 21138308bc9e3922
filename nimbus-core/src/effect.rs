//! Effects emitted by the reducer
//!
//! Effects describe work for the runtime (store writes, lookups); the reducer
//! never performs I/O itself. The effect handler spawns a task per effect and
//! the task's result comes back as an action.
//!
//! ```ignore
//! fn reducer(state: &mut UiState, action: Action) -> DispatchResult {
//!     match action {
//!         Action::GpsSet(on) => {
//!             DispatchResult::effect(Effect::PersistSetting(SettingChange::Gps(on)))
//!         }
//!         // ...
//!     }
//! }
//! ```

use crate::settings::SettingChange;
use crate::state::LocationId;

/// Query for the active weather lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveQuery {
    /// Resolve through the coordinate provider
    Gps,
    /// Look up a place by name
    Place(String),
}

/// Side effects requested by the reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    PersistSetting(SettingChange),
    InsertLocation { name: String },
    DeleteLocation { id: LocationId },
    FetchActiveWeather { request: u64, query: ActiveQuery },
    FetchRowWeather { id: LocationId, name: String },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::PersistSetting(_) => "PersistSetting",
            Effect::InsertLocation { .. } => "InsertLocation",
            Effect::DeleteLocation { .. } => "DeleteLocation",
            Effect::FetchActiveWeather { .. } => "FetchActiveWeather",
            Effect::FetchRowWeather { .. } => "FetchRowWeather",
        }
    }
}

/// Result of dispatching an action.
///
/// Contains both the state change indicator and any effects to be processed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchResult {
    /// Whether the state was modified by this action.
    pub changed: bool,
    /// Effects to be processed after dispatch.
    pub effects: Vec<Effect>,
}

impl DispatchResult {
    /// No state change and no effects.
    #[inline]
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// State changed, no effects.
    #[inline]
    pub fn changed() -> Self {
        Self {
            changed: true,
            effects: vec![],
        }
    }

    /// A single effect, no state change.
    #[inline]
    pub fn effect(effect: Effect) -> Self {
        Self {
            changed: false,
            effects: vec![effect],
        }
    }

    /// Several effects, no state change.
    #[inline]
    pub fn effects(effects: Vec<Effect>) -> Self {
        Self {
            changed: false,
            effects,
        }
    }

    /// State changed with a single effect.
    #[inline]
    pub fn changed_with(effect: Effect) -> Self {
        Self {
            changed: true,
            effects: vec![effect],
        }
    }

    /// State changed with several effects.
    #[inline]
    pub fn changed_with_many(effects: Vec<Effect>) -> Self {
        Self {
            changed: true,
            effects,
        }
    }

    /// Add an effect (builder style).
    #[inline]
    pub fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Mark as changed (builder style).
    #[inline]
    pub fn mark_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    /// Mark as changed when `changed` is true (builder style).
    #[inline]
    pub fn changed_if(mut self, changed: bool) -> Self {
        self.changed |= changed;
        self
    }

    /// Fold another result into this one.
    pub fn merge(mut self, other: DispatchResult) -> Self {
        self.changed |= other.changed;
        self.effects.extend(other.effects);
        self
    }

    #[inline]
    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let r = DispatchResult::unchanged();
        assert!(!r.changed);
        assert!(!r.has_effects());

        let r = DispatchResult::effect(Effect::DeleteLocation { id: LocationId(1) })
            .with(Effect::PersistSetting(SettingChange::SelectedLocation(None)))
            .mark_changed();
        assert!(r.changed);
        assert_eq!(r.effects.len(), 2);
    }

    #[test]
    fn test_merge_and_changed_if() {
        let a = DispatchResult::changed_if(DispatchResult::unchanged(), false);
        assert!(!a.changed);

        let merged = a.merge(DispatchResult::changed_with(Effect::InsertLocation {
            name: "Rome".into(),
        }));
        assert!(merged.changed);
        assert_eq!(merged.effects[0].name(), "InsertLocation");
    }
}
