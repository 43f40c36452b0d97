// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Behavior engine - composition root and tick loop body

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{info, trace};

use super::{
    BehaviorError, Clock, CommandCenter, CommandQueue, DetachedRenderer, EventManager, EventSettings,
    FollowerAction, InterruptManager, InterruptPolicy, Params, RendererLink, ScheduleFollower, Scheduler,
    SnapshotSlot, State, StateDispatch, StateHandle, StateHandler, StateRegistry, DEFAULT_BOOT_GRACE_MS,
    DEFAULT_HISTORY_CAPACITY,
};
use crate::comms::{CommsSnapshot, MediaLookup, OfflineMedia};
use crate::config::Config;
use crate::sensors::{SensorSnapshot, SensorTriggers};

/// Default time spent WAKING before returning to ACTIVE
pub const DEFAULT_WAKE_DURATION_MS: u64 = 4000;

/// Tunables for one engine instance
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub initial_state: State,
    pub history_capacity: usize,
    pub boot_grace_ms: u64,
    pub wake_duration_ms: u64,
    pub interrupt_policy: InterruptPolicy,
    pub triggers: SensorTriggers,
    pub events: EventSettings,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_state: State::ACTIVE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            boot_grace_ms: DEFAULT_BOOT_GRACE_MS,
            wake_duration_ms: DEFAULT_WAKE_DURATION_MS,
            interrupt_policy: InterruptPolicy::default(),
            triggers: SensorTriggers::default(),
            events: EventSettings::default(),
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            initial_state: State::new(&config.engine.initial_state),
            history_capacity: config.engine.history_capacity,
            boot_grace_ms: config.engine.boot_grace_ms,
            wake_duration_ms: config.engine.wake_duration_ms,
            interrupt_policy: config.engine.interrupt_policy,
            triggers: SensorTriggers::new(config.sensors.proximity_mm, config.sensors.distance_mm),
            events: EventSettings {
                entry_time_ms: config.sensors.entry_time_ms,
                proximity_priority: config.interrupts.proximity_priority,
                distance_priority: config.interrupts.distance_priority,
                canvas_priority: config.interrupts.canvas_priority,
                canvas_duration_ms: config.interrupts.canvas_duration_ms,
            },
        }
    }
}

/// External collaborators injected into the engine
pub struct Collaborators {
    pub registry: Arc<StateRegistry>,
    pub scheduler: Scheduler,
    pub clock: Arc<dyn Clock>,
    pub media: Arc<dyn MediaLookup>,
    pub renderer: Box<dyn RendererLink>,
}

impl Collaborators {
    /// Built-in states, no schedule, offline media, no renderer
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Arc::new(StateRegistry::new()),
            scheduler: Scheduler::empty(),
            clock,
            media: Arc::new(OfflineMedia::default()),
            renderer: Box::new(DetachedRenderer::default()),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_media(mut self, media: Arc<dyn MediaLookup>) -> Self {
        self.media = media;
        self
    }

    pub fn with_registry(mut self, registry: StateRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn RendererLink>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Load the schedule named by `path`; an unreadable file leaves it empty
    pub fn with_schedule_file(self, path: &Path) -> Self {
        let mut scheduler = Scheduler::load(path);
        scheduler.retain_registered(&self.registry);
        self.with_scheduler(scheduler)
    }
}

/// Input to per-state tick hooks
pub struct TickContext {
    pub now_ms: u64,
    pub state: State,
    pub entry_time: u64,
    pub commands: CommandCenter,
}

impl TickContext {
    pub fn in_state_for(&self) -> u64 {
        self.now_ms.saturating_sub(self.entry_time)
    }
}

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub expired: usize,
    pub applied: usize,
    pub follower: FollowerAction,
    pub state: State,
}

/// Owns the arbitration graph and runs it one tick at a time
pub struct BehaviorEngine {
    clock: Arc<dyn Clock>,
    state: StateHandle,
    commands: CommandCenter,
    queue: CommandQueue,
    interrupts: Arc<InterruptManager>,
    follower: ScheduleFollower,
    events: EventManager,
    dispatch: StateDispatch<TickContext>,
    sensors: SnapshotSlot<SensorSnapshot>,
    comms: SnapshotSlot<CommsSnapshot>,
    ticks: u64,
}

impl BehaviorEngine {
    /// Build the graph leaf-first: handler, queue, interrupts, follower, events
    pub fn new(options: EngineOptions, parts: Collaborators) -> Result<Self, BehaviorError> {
        let Collaborators { registry, mut scheduler, clock, media, renderer } = parts;

        if !registry.contains(&options.initial_state) {
            return Err(BehaviorError::UnknownState(options.initial_state.to_string()));
        }
        scheduler.retain_registered(&registry);

        let handler = StateHandler::new(registry, options.initial_state.clone(), clock.clone())
            .with_renderer(renderer)
            .with_history_capacity(options.history_capacity);
        let state = StateHandle::new(handler);
        let (commands, queue) = CommandCenter::channel();

        let interrupts = Arc::new(InterruptManager::with_policy(
            Arc::new(state.clone()),
            commands.clone(),
            options.interrupt_policy,
        ));

        let follower = ScheduleFollower::new(
            scheduler,
            commands.clone(),
            interrupts.clone(),
            Arc::new(state.clone()),
            clock.now_ms(),
        )
        .with_grace(options.boot_grace_ms);

        let events = EventManager::new(
            options.triggers,
            options.events,
            commands.clone(),
            interrupts.clone(),
            Arc::new(state.clone()),
            media,
        );

        let dispatch = default_dispatch(options.wake_duration_ms);

        info!(
            "Behavior engine ready in {} ({} scheduled events, {:?} interrupts)",
            options.initial_state,
            follower.scheduler().rules().len(),
            options.interrupt_policy
        );

        Ok(Self {
            clock,
            state,
            commands,
            queue,
            interrupts,
            follower,
            events,
            dispatch,
            sensors: SnapshotSlot::new(),
            comms: SnapshotSlot::new(),
            ticks: 0,
        })
    }

    /// Replace the per-state hook table
    pub fn with_dispatch(mut self, dispatch: StateDispatch<TickContext>) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn commands(&self) -> CommandCenter {
        self.commands.clone()
    }

    pub fn interrupts(&self) -> Arc<InterruptManager> {
        self.interrupts.clone()
    }

    /// Producer handle for sensor snapshots
    pub fn sensor_slot(&self) -> SnapshotSlot<SensorSnapshot> {
        self.sensors.clone()
    }

    /// Producer handle for comms messages
    pub fn comms_slot(&self) -> SnapshotSlot<CommsSnapshot> {
        self.comms.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Local::now().naive_local())
    }

    /// One tick against an explicit wall-clock time
    pub fn tick_at(&mut self, wall: NaiveDateTime) -> TickReport {
        let now = self.clock.now_ms();

        let expired = self.interrupts.expire(now);
        let applied = self.queue.drain(&self.state);
        let follower = self.follower.tick(now, wall);

        let sensors = self.sensors.latest();
        let comms = self.comms.take();
        self.events.update(now, sensors.as_ref(), comms.as_ref());

        let ctx = {
            let handler = self.state.lock();
            TickContext {
                now_ms: now,
                state: handler.get_state().clone(),
                entry_time: handler.state_entry_time(),
                commands: self.commands.clone(),
            }
        };
        self.dispatch.dispatch(&ctx.state, &ctx);

        self.ticks += 1;
        trace!("Tick {}: {} ({} applied, {} expired)", self.ticks, ctx.state, applied, expired);

        TickReport { expired, applied, follower, state: ctx.state }
    }

    /// Wait for background work and apply whatever it queued
    pub fn shutdown(&mut self) {
        self.events.join_lookups();
        let applied = self.queue.drain(&self.state);
        info!(
            "Behavior engine stopped after {} ticks in {} ({} late commands)",
            self.ticks,
            self.state.lock().get_state(),
            applied
        );
    }
}

fn default_dispatch(wake_duration_ms: u64) -> StateDispatch<TickContext> {
    StateDispatch::new(|_: &TickContext| {}).on(State::WAKING, move |ctx: &TickContext| {
        if ctx.in_state_for() >= wake_duration_ms {
            info!("Awake after {} ms", ctx.in_state_for());
            ctx.commands.change_state(&State::ACTIVE, Params::new());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, StateAccess, CANVAS_INTERRUPT};
    use crate::sensors::TofReading;
    use chrono::NaiveDate;
    use serde_json::json;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn engine(clock: &ManualClock) -> BehaviorEngine {
        BehaviorEngine::new(EngineOptions::default(), Collaborators::new(Arc::new(clock.clone()))).unwrap()
    }

    #[test]
    fn test_unknown_initial_state_is_rejected() {
        let clock = ManualClock::new(0);
        let options = EngineOptions { initial_state: State::new("FLYING"), ..Default::default() };
        assert!(matches!(
            BehaviorEngine::new(options, Collaborators::new(Arc::new(clock))),
            Err(BehaviorError::UnknownState(_))
        ));
    }

    #[test]
    fn test_interrupt_episode_round_trip() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);
        engine.state().lock().set_state(State::SQUINTING, json!({"mood": "sly"}).as_object().cloned()).unwrap();
        let before = engine.state().lock().current_context();

        let interrupts = engine.interrupts();
        interrupts.set_interrupt("A", 10, State::HAPPY, Params::new());
        interrupts.set_interrupt("B", 50, State::ANGRY, Params::new());
        clock.advance(16);
        assert_eq!(engine.tick_at(noon()).state, State::ANGRY);

        interrupts.clear_interrupt("B");
        clock.advance(16);
        assert_eq!(engine.tick_at(noon()).state, State::HAPPY);

        interrupts.clear_interrupt("A");
        clock.advance(16);
        engine.tick_at(noon());
        assert_eq!(engine.state().lock().current_context(), before);
    }

    #[test]
    fn test_proximity_through_slots() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);
        let sensors = engine.sensor_slot();

        clock.set(1_000);
        sensors.publish(SensorSnapshot::from_tof(TofReading::ok(10)));
        engine.tick_at(noon());
        assert_eq!(engine.tick_at(noon()).state, State::UWU);

        sensors.publish(SensorSnapshot::from_tof(TofReading::ok(700)));
        clock.set(1_100);
        engine.tick_at(noon());
        assert_eq!(engine.tick_at(noon()).state, State::ACTIVE);
    }

    #[test]
    fn test_canvas_text_expires_on_tick() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);

        engine.comms_slot().publish(CommsSnapshot::connected("hi there"));
        engine.tick_at(noon());
        assert!(engine.interrupts().is_active(CANVAS_INTERRUPT));
        assert_eq!(engine.tick_at(noon()).state, State::CANVAS);

        clock.set(10_000);
        let report = engine.tick_at(noon());
        assert_eq!(report.expired, 1);
        assert_eq!(report.state, State::ACTIVE);
    }

    #[test]
    fn test_scheduled_sleep_wakes_into_active() {
        let clock = ManualClock::new(0);
        let scheduler = Scheduler::from_json_str(
            &json!([{"type": "daily", "start_time": "21:00", "end_time": "07:00", "state": "SLEEPING",
                     "interruptible_states": ["ACTIVE", "SQUINTING"]}])
            .to_string(),
        )
        .unwrap();
        let mut engine = BehaviorEngine::new(
            EngineOptions::default(),
            Collaborators::new(Arc::new(clock.clone())).with_scheduler(scheduler),
        )
        .unwrap();
        let night = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap().and_hms_opt(22, 0, 0).unwrap();
        let morning = NaiveDate::from_ymd_opt(2026, 6, 2).unwrap().and_hms_opt(7, 0, 1).unwrap();

        assert_eq!(engine.tick_at(night).follower, FollowerAction::Idle);

        clock.set(2_000);
        assert_eq!(engine.tick_at(night).follower, FollowerAction::Apply(State::SLEEPING));
        assert_eq!(engine.tick_at(night).state, State::SLEEPING);

        clock.set(60_000);
        assert_eq!(engine.tick_at(morning).follower, FollowerAction::Revert(State::WAKING));
        assert_eq!(engine.tick_at(morning).state, State::WAKING);

        clock.set(63_999);
        engine.tick_at(morning);
        assert_eq!(engine.state().current_state(), State::WAKING);

        clock.set(64_000);
        engine.tick_at(morning);
        assert_eq!(engine.tick_at(morning).state, State::ACTIVE);
    }

    #[test]
    fn test_schedule_for_unknown_state_never_fires() {
        let clock = ManualClock::new(0);
        let scheduler = Scheduler::from_json_str(
            &json!([{"type": "daily", "start_time": "00:00", "end_time": "23:59", "state": "FLYING"}]).to_string(),
        )
        .unwrap();
        assert_eq!(scheduler.rules().len(), 1);

        let options = EngineOptions { boot_grace_ms: 0, ..Default::default() };
        let mut engine =
            BehaviorEngine::new(options, Collaborators::new(Arc::new(clock.clone())).with_scheduler(scheduler))
                .unwrap();

        for _ in 0..5 {
            clock.advance(16);
            let report = engine.tick_at(noon());
            assert_eq!(report.follower, FollowerAction::Idle);
            assert_eq!(report.applied, 0);
        }
        assert_eq!(engine.state().current_state(), State::ACTIVE);
    }

    #[test]
    fn test_direct_state_command() {
        let clock = ManualClock::new(0);
        let mut engine = engine(&clock);
        engine.comms_slot().publish(CommsSnapshot::connected("STATE;excited"));
        engine.tick_at(noon());
        assert_eq!(engine.tick_at(noon()).state, State::EXCITED);
        assert_eq!(engine.ticks(), 2);
        engine.shutdown();
    }
}
