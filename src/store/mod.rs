//! Domain store: one state container, one entry point.
//!
//! Every change goes through [`Store::dispatch`], which runs the pure
//! [`reduce`] function on the current state and swaps in the result only
//! when the action succeeds. Registered [`SaveHook`]s are told about every
//! transition that changes the persisted snapshot.

mod action;
mod groups;
mod reduce;
mod state;

use std::sync::Arc;

pub use action::{Action, Changes, DefectTarget, Dispatched, GroupPatch, StoreWarning};
pub use reduce::{Transition, reduce};
pub use state::{IntegrityViolation, State, YearTotals};

use crate::errors::StoreError;
use crate::sync::Snapshot;

/// Receives the new snapshot after a transition that changed it.
///
/// Implementations must not block; persistence failures are theirs to
/// report and never affect the in-memory state.
pub trait SaveHook: Send + Sync {
    fn save_requested(&self, snapshot: Snapshot);
}

impl<F> SaveHook for F
where
    F: Fn(Snapshot) + Send + Sync,
{
    fn save_requested(&self, snapshot: Snapshot) {
        self(snapshot)
    }
}

pub struct Store {
    state: Arc<State>,
    hooks: Vec<Arc<dyn SaveHook>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::from_state(State::default())
    }

    /// Wrap an existing state, repairing it first.
    pub fn from_state(state: State) -> Self {
        Self {
            state: Arc::new(state.finish()),
            hooks: Vec::new(),
        }
    }

    pub fn with_save_hook(mut self, hook: Arc<dyn SaveHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Current state. The returned handle stays valid after later
    /// dispatches.
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&self.state)
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched, StoreError> {
        let kind = action.kind();
        let Transition { state, outcome } = match reduce(&self.state, action) {
            Ok(transition) => transition,
            Err(e) => {
                tracing::debug!(action = kind, error = %e, "Action rejected");
                return Err(e);
            }
        };

        let violations = state.integrity_violations();
        debug_assert!(
            violations.is_empty(),
            "{} left broken references: {:?}",
            kind,
            violations
        );

        self.state = Arc::new(state);
        tracing::debug!(
            action = kind,
            warnings = outcome.warnings.len(),
            created = outcome.created.len(),
            "Action applied"
        );

        if outcome.changes.needs_save() && !self.hooks.is_empty() {
            let snapshot = Snapshot::from(self.state.as_ref());
            for hook in &self.hooks {
                hook.save_requested(snapshot.clone());
            }
        }
        Ok(outcome)
    }
}
