// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! State handler - current state, entry time, params and context history

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BehaviorError, Clock, Params, PhysicsBlob, State, StateMachine, StateRegistry};

/// Default number of saved contexts kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Restorable snapshot of the handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateContext {
    pub state: State,
    pub entry_time: u64,
    pub physics: PhysicsBlob,
    pub params: Option<Params>,
}

/// Renderer side of a context save/restore
///
/// The handler never looks inside the blob; it only carries it.
pub trait RendererLink: Send {
    fn physics_state(&self) -> PhysicsBlob;
    fn set_physics_state(&mut self, blob: PhysicsBlob);
}

/// Stand-in used when no renderer is attached; keeps the last blob it was given
#[derive(Debug, Default)]
pub struct DetachedRenderer {
    blob: PhysicsBlob,
}

impl RendererLink for DetachedRenderer {
    fn physics_state(&self) -> PhysicsBlob {
        self.blob.clone()
    }

    fn set_physics_state(&mut self, blob: PhysicsBlob) {
        self.blob = blob;
    }
}

/// Owns the state machine and everything needed to undo a preemption
pub struct StateHandler {
    registry: Arc<StateRegistry>,
    machine: StateMachine,
    clock: Arc<dyn Clock>,
    renderer: Box<dyn RendererLink>,
    entry_time: u64,
    params: Option<Params>,
    history: VecDeque<StateContext>,
    history_capacity: usize,
}

impl StateHandler {
    pub fn new(registry: Arc<StateRegistry>, initial: State, clock: Arc<dyn Clock>) -> Self {
        let entry_time = clock.now_ms();
        Self {
            registry,
            machine: StateMachine::new(initial),
            clock,
            renderer: Box::new(DetachedRenderer::default()),
            entry_time,
            params: None,
            history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn RendererLink>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    pub fn get_state(&self) -> &State {
        self.machine.get_state()
    }

    pub fn current_state_params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    pub fn state_entry_time(&self) -> u64 {
        self.entry_time
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn RendererLink {
        self.renderer.as_mut()
    }

    /// Transition to `new_state` with `params`
    ///
    /// Params are replaced even when the state does not change. Returns
    /// whether the state value actually changed.
    pub fn set_state(&mut self, new_state: State, params: Option<Params>) -> Result<bool, BehaviorError> {
        if !self.registry.contains(&new_state) {
            return Err(BehaviorError::UnknownState(new_state.to_string()));
        }

        self.params = params;

        let previous = self.machine.get_state().clone();
        if !self.machine.set_state(new_state) {
            debug!("Re-parameterized {}", previous);
            return Ok(false);
        }

        self.entry_time = self.clock.now_ms();
        info!(
            "State transition: {} -> {}, state_entry_time: {}",
            previous,
            self.machine.get_state(),
            self.entry_time
        );
        Ok(true)
    }

    pub fn current_context(&self) -> StateContext {
        StateContext {
            state: self.machine.get_state().clone(),
            entry_time: self.entry_time,
            physics: self.renderer.physics_state(),
            params: self.params.clone(),
        }
    }

    /// Push the current context, dropping the oldest one when full
    pub fn save_state_ctx(&mut self) {
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        let ctx = self.current_context();
        debug!("Saved context: {} (depth {})", ctx.state, self.history.len() + 1);
        self.history.push_back(ctx);
    }

    /// Pop and re-apply the most recent context. No-op on empty history.
    pub fn restore_state_ctx(&mut self) -> Option<StateContext> {
        let ctx = self.history.pop_back()?;

        self.machine.set_state(ctx.state.clone());
        self.entry_time = ctx.entry_time;
        self.params = ctx.params.clone();
        self.renderer.set_physics_state(ctx.physics.clone());

        info!("Context restored to: {} (entry {})", ctx.state, ctx.entry_time);
        Some(ctx)
    }
}

/// Narrow read/save capability handed to arbitration components
pub trait StateAccess: Send + Sync {
    fn current_state(&self) -> State;
    fn state_entry_time(&self) -> u64;
    fn current_params(&self) -> Option<Params>;
    fn save_context(&self);
}

/// Shared handle to the one [`StateHandler`]
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<Mutex<StateHandler>>,
}

impl StateHandle {
    pub fn new(handler: StateHandler) -> Self {
        Self { inner: Arc::new(Mutex::new(handler)) }
    }

    pub fn lock(&self) -> MutexGuard<'_, StateHandler> {
        self.inner.lock()
    }
}

impl StateAccess for StateHandle {
    fn current_state(&self) -> State {
        self.inner.lock().get_state().clone()
    }

    fn state_entry_time(&self) -> u64 {
        self.inner.lock().state_entry_time()
    }

    fn current_params(&self) -> Option<Params> {
        self.inner.lock().current_state_params().cloned()
    }

    fn save_context(&self) {
        self.inner.lock().save_state_ctx();
    }
}
