// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Core module - state ownership, command queue and arbitration

mod clock;
mod command;
mod engine;
mod error;
mod events;
mod follower;
mod handler;
mod interrupts;
mod registry;
mod scheduler;
mod slot;
mod state;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use command::{Command, CommandCenter, CommandKind, CommandQueue, TARGET_STATE};
pub use engine::{
    BehaviorEngine, Collaborators, EngineOptions, TickContext, TickReport, DEFAULT_WAKE_DURATION_MS,
};
pub use error::BehaviorError;
pub use events::{EventManager, EventSettings, CANVAS_INTERRUPT, MAX_PENDING_LOOKUPS, SENSOR_INTERRUPT};
pub use follower::{FollowerAction, ScheduleFollower, DEFAULT_BOOT_GRACE_MS, SCHEDULER_SOURCE, SOURCE_KEY};
pub use handler::{
    DetachedRenderer, RendererLink, StateAccess, StateContext, StateHandle, StateHandler,
    DEFAULT_HISTORY_CAPACITY,
};
pub use interrupts::{Interrupt, InterruptManager, InterruptPolicy};
pub use registry::{StateDispatch, StateRegistry};
pub use scheduler::{RuleRecord, RuleWindow, ScheduleRule, Scheduler, DEFAULT_HOURLY_DURATION_SECS};
pub use slot::SnapshotSlot;
pub use state::{Params, PhysicsBlob, State, StateMachine};
