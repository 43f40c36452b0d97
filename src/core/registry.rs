// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! State registry and per-state dispatch table

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::State;

/// Set of states the robot may enter, plus optional per-state data
///
/// Built and populated once at startup (built-in states, then whatever a
/// renderer adapter registers) and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct StateRegistry {
    states: HashMap<State, Option<Value>>,
}

impl StateRegistry {
    /// Registry holding only the built-in states
    pub fn new() -> Self {
        let states = State::BUILTIN.iter().cloned().map(|s| (s, None)).collect();
        Self { states }
    }

    /// Registry with no states at all
    pub fn empty() -> Self {
        Self { states: HashMap::new() }
    }

    /// Register a state, or replace the data of an existing one
    pub fn register(&mut self, state: State, data: Option<Value>) {
        debug!("Registered state data for: {}", state);
        self.states.insert(state, data);
    }

    pub fn contains(&self, state: &State) -> bool {
        self.states.contains_key(state)
    }

    pub fn data(&self, state: &State) -> Option<&Value> {
        self.states.get(state).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Registered states in name order
    pub fn states(&self) -> Vec<State> {
        let mut states: Vec<State> = self.states.keys().cloned().collect();
        states.sort();
        states
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type Handler<C> = Box<dyn Fn(&C) + Send + Sync>;

/// Finite map from state to handler, with a mandatory fallback
pub struct StateDispatch<C> {
    handlers: HashMap<State, Handler<C>>,
    fallback: Handler<C>,
}

impl<C> StateDispatch<C> {
    pub fn new<F>(fallback: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        Self {
            handlers: HashMap::new(),
            fallback: Box::new(fallback),
        }
    }

    /// Install the handler for `state`, replacing any previous one
    pub fn on<F>(mut self, state: State, handler: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        if self.handlers.insert(state.clone(), Box::new(handler)).is_some() {
            warn!("Replaced dispatch handler for {}", state);
        }
        self
    }

    pub fn has_handler(&self, state: &State) -> bool {
        self.handlers.contains_key(state)
    }

    /// Run the handler for `state`, or the fallback
    pub fn dispatch(&self, state: &State, ctx: &C) {
        match self.handlers.get(state) {
            Some(handler) => handler(ctx),
            None => (self.fallback)(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_builtin_states_registered() {
        let registry = StateRegistry::new();
        assert!(registry.contains(&State::ACTIVE));
        assert!(registry.contains(&State::new("canvas")));
        assert!(!registry.contains(&State::new("FLYING")));
        assert_eq!(registry.len(), State::BUILTIN.len());
    }

    #[test]
    fn test_register_adds_state_and_data() {
        let mut registry = StateRegistry::new();
        registry.register(State::new("DIZZY"), Some(serde_json::json!([140, 0.05])));
        assert!(registry.contains(&State::new("DIZZY")));
        assert_eq!(registry.data(&State::new("DIZZY")), Some(&serde_json::json!([140, 0.05])));
        assert_eq!(registry.data(&State::ACTIVE), None);
    }

    #[test]
    fn test_dispatch_uses_fallback_for_unregistered() {
        let hits = Arc::new(AtomicUsize::new(0));
        let misses = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let m = misses.clone();
        let table: StateDispatch<()> = StateDispatch::new(move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        })
        .on(State::WAKING, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        table.dispatch(&State::WAKING, &());
        table.dispatch(&State::ANGRY, &());
        table.dispatch(&State::new("UNKNOWN"), &());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 2);
        assert!(table.has_handler(&State::WAKING));
    }
}
