// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Event manager - turns sensor and comms snapshots into interrupts and commands

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::{CommandCenter, InterruptManager, Params, State, StateAccess};
use crate::comms::{CommsMessage, CommsSnapshot, MediaLookup};
use crate::sensors::{SensorSnapshot, SensorTrigger, SensorTriggers};

/// Interrupt raised by range sensors
pub const SENSOR_INTERRUPT: &str = "sensor";
/// Interrupt raised by canvas text from the control link
pub const CANVAS_INTERRUPT: &str = "canvas_media";
/// GIF and chat lookups allowed in flight at once
pub const MAX_PENDING_LOOKUPS: usize = 2;

/// Timings and priorities for event-driven interrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSettings {
    /// Minimum time in the current state before a sensor may interrupt it
    pub entry_time_ms: u64,
    pub proximity_priority: i32,
    pub distance_priority: i32,
    pub canvas_priority: i32,
    pub canvas_duration_ms: u64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            entry_time_ms: 500,
            proximity_priority: 50,
            distance_priority: 30,
            canvas_priority: 80,
            canvas_duration_ms: 10_000,
        }
    }
}

enum Lookup {
    Gif(String),
    Chat(String),
}

pub struct EventManager {
    triggers: SensorTriggers,
    settings: EventSettings,
    commands: CommandCenter,
    interrupts: Arc<InterruptManager>,
    state: Arc<dyn StateAccess>,
    media: Arc<dyn MediaLookup>,
    lookups: Mutex<Vec<JoinHandle<()>>>,
}

impl EventManager {
    pub fn new(
        triggers: SensorTriggers,
        settings: EventSettings,
        commands: CommandCenter,
        interrupts: Arc<InterruptManager>,
        state: Arc<dyn StateAccess>,
        media: Arc<dyn MediaLookup>,
    ) -> Self {
        Self {
            triggers,
            settings,
            commands,
            interrupts,
            state,
            media,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &EventSettings {
        &self.settings
    }

    /// Process this tick's snapshots
    pub fn update(&self, now_ms: u64, sensors: Option<&SensorSnapshot>, comms: Option<&CommsSnapshot>) {
        self.update_sensor_events(now_ms, sensors);
        if let Some(comms) = comms {
            self.update_comms_events(now_ms, comms);
        }
    }

    fn update_sensor_events(&self, now_ms: u64, sensors: Option<&SensorSnapshot>) {
        let Some(trigger) = sensors.and_then(|s| self.triggers.evaluate(s)) else {
            self.interrupts.clear_interrupt(SENSOR_INTERRUPT);
            return;
        };

        let in_state_for = now_ms.saturating_sub(self.state.state_entry_time());
        if in_state_for < self.settings.entry_time_ms {
            return;
        }

        let (priority, target) = match trigger {
            SensorTrigger::Proximity { .. } => (self.settings.proximity_priority, State::UWU),
            SensorTrigger::Distance { .. } => (self.settings.distance_priority, State::DISTANCE),
        };
        let mut params = Params::new();
        params.insert("trigger".to_string(), Value::String(trigger.name().to_string()));
        self.interrupts.set_interrupt(SENSOR_INTERRUPT, priority, target, params);
        debug!("Set {} interrupt at {} mm", trigger.name(), trigger.mm());
    }

    fn update_comms_events(&self, now_ms: u64, comms: &CommsSnapshot) {
        if !comms.is_connected {
            return;
        }

        match CommsMessage::parse(&comms.text) {
            CommsMessage::SetState(target) => {
                self.commands.change_state(&target, Params::new());
            }
            CommsMessage::Gif(query) => self.spawn_lookup(Lookup::Gif(query)),
            CommsMessage::Chat(query) => self.spawn_lookup(Lookup::Chat(query)),
            CommsMessage::Canvas(text) => {
                let mut params = Params::new();
                params.insert("param".to_string(), json!({ "text": text }));
                params.insert("interrupt_name".to_string(), Value::String(CANVAS_INTERRUPT.to_string()));
                self.interrupts.set_interrupt_until(
                    CANVAS_INTERRUPT,
                    self.settings.canvas_priority,
                    State::CANVAS,
                    params,
                    now_ms + self.settings.canvas_duration_ms,
                );
            }
            CommsMessage::Ignored => debug!("Ignoring comms message {:?}", comms.text),
        }
    }

    fn spawn_lookup(&self, lookup: Lookup) {
        let mut lookups = self.lookups.lock();
        lookups.retain(|h| !h.is_finished());
        if lookups.len() >= MAX_PENDING_LOOKUPS {
            warn!("Media lookup busy, dropping request");
            return;
        }

        let media = self.media.clone();
        let commands = self.commands.clone();
        let spawned = std::thread::Builder::new()
            .name("media-lookup".to_string())
            .spawn(move || run_lookup(media.as_ref(), &commands, lookup));

        match spawned {
            Ok(handle) => lookups.push(handle),
            Err(e) => error!("Could not start media lookup: {}", e),
        }
    }

    /// Lookups still running
    pub fn pending_lookups(&self) -> usize {
        let mut lookups = self.lookups.lock();
        lookups.retain(|h| !h.is_finished());
        lookups.len()
    }

    /// Wait for every in-flight lookup
    pub fn join_lookups(&self) {
        let handles: Vec<_> = self.lookups.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("Media lookup thread panicked");
            }
        }
    }
}

fn run_lookup(media: &dyn MediaLookup, commands: &CommandCenter, lookup: Lookup) {
    match lookup {
        Lookup::Gif(query) => match media.find_gif(&query) {
            Ok(Some(path)) => {
                info!("GIF for '{}': {:?}", query, path);
                let mut params = Params::new();
                params.insert("media_type".to_string(), Value::String("gif".to_string()));
                params.insert("media_path".to_string(), Value::String(path.to_string_lossy().into_owned()));
                commands.change_state(&State::CANVAS, params);
            }
            Ok(None) => warn!("No GIF found for '{}'", query),
            Err(e) => warn!("GIF lookup failed for '{}': {}", query, e),
        },
        Lookup::Chat(query) => match media.ask_chat(&query) {
            Ok(Some(reply)) => {
                let mut params = Params::new();
                params.insert("param".to_string(), json!({ "text": reply, "query": query }));
                commands.change_state(&State::CHAT, params);
            }
            Ok(None) => warn!("Chat returned no reply for '{}'", query),
            Err(e) => warn!("Chat lookup failed: {}", e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandQueue, ManualClock, StateHandle, StateHandler, StateRegistry};
    use crate::sensors::TofReading;
    use crate::services::ServiceError;
    use std::path::PathBuf;

    struct FakeMedia;

    impl MediaLookup for FakeMedia {
        fn find_gif(&self, query: &str) -> Result<Option<PathBuf>, ServiceError> {
            Ok(Some(PathBuf::from(format!("/tmp/{}.gif", query))))
        }

        fn ask_chat(&self, _query: &str) -> Result<Option<String>, ServiceError> {
            Err(ServiceError::Unavailable("offline".into()))
        }
    }

    struct Rig {
        clock: ManualClock,
        state: StateHandle,
        queue: CommandQueue,
        interrupts: Arc<InterruptManager>,
        events: EventManager,
    }

    fn rig(triggers: SensorTriggers) -> Rig {
        let clock = ManualClock::new(1_000);
        let state = StateHandle::new(StateHandler::new(
            Arc::new(StateRegistry::new()),
            State::ACTIVE,
            Arc::new(clock.clone()),
        ));
        let (commands, queue) = CommandCenter::channel();
        let interrupts = Arc::new(InterruptManager::new(Arc::new(state.clone()), commands.clone()));
        let events = EventManager::new(
            triggers,
            EventSettings::default(),
            commands,
            interrupts.clone(),
            Arc::new(state.clone()),
            Arc::new(FakeMedia),
        );
        Rig { clock, state, queue, interrupts, events }
    }

    fn near() -> SensorSnapshot {
        SensorSnapshot::from_tof(TofReading::ok(20))
    }

    fn far() -> SensorSnapshot {
        SensorSnapshot::from_tof(TofReading::ok(900))
    }

    #[test]
    fn test_proximity_debounce_and_immediate_clear() {
        let rig = rig(SensorTriggers::default());

        rig.events.update(1_499, Some(&near()), None);
        assert!(!rig.interrupts.is_interrupted());

        rig.events.update(1_500, Some(&near()), None);
        assert!(rig.interrupts.is_active(SENSOR_INTERRUPT));
        rig.queue.drain(&rig.state);
        assert_eq!(rig.state.current_state(), State::UWU);

        rig.clock.set(1_600);
        rig.events.update(1_600, Some(&far()), None);
        assert!(!rig.interrupts.is_interrupted());
        rig.queue.drain(&rig.state);
        assert_eq!(rig.state.current_state(), State::ACTIVE);
    }

    #[test]
    fn test_missing_snapshot_clears() {
        let rig = rig(SensorTriggers::default());
        rig.events.update(2_000, Some(&near()), None);
        assert!(rig.interrupts.is_interrupted());
        rig.events.update(2_100, None, None);
        assert!(!rig.interrupts.is_interrupted());
    }

    #[test]
    fn test_distance_interrupt_when_enabled() {
        let rig = rig(SensorTriggers::new(50, Some(500)));
        rig.events.update(2_000, Some(&SensorSnapshot::from_tof(TofReading::ok(300))), None);
        let winner = rig.interrupts.winner().unwrap();
        assert_eq!(winner.target_state, State::DISTANCE);
        assert_eq!(winner.priority, 30);
    }

    #[test]
    fn test_state_command_bypasses_interrupts() {
        let rig = rig(SensorTriggers::default());
        rig.events.update(2_000, None, Some(&CommsSnapshot::connected("state;angry")));
        assert!(!rig.interrupts.is_interrupted());
        rig.queue.drain(&rig.state);
        assert_eq!(rig.state.current_state(), State::ANGRY);
    }

    #[test]
    fn test_disconnected_link_is_ignored() {
        let rig = rig(SensorTriggers::default());
        let comms = CommsSnapshot { text: "STATE;SAD".into(), is_connected: false };
        rig.events.update(2_000, None, Some(&comms));
        assert_eq!(rig.queue.pending(), 0);
    }

    #[test]
    fn test_canvas_text_outranks_sensor_and_expires() {
        let rig = rig(SensorTriggers::default());
        rig.events.update(2_000, Some(&near()), Some(&CommsSnapshot::connected("Hello Ekko")));

        let winner = rig.interrupts.winner().unwrap();
        assert_eq!(winner.name, CANVAS_INTERRUPT);
        assert_eq!(winner.expires_at, Some(12_000));
        assert_eq!(winner.params["param"]["text"], json!("Hello Ekko"));

        assert_eq!(rig.interrupts.expire(11_999), 0);
        assert_eq!(rig.interrupts.expire(12_000), 1);
        assert_eq!(rig.interrupts.winner().unwrap().name, SENSOR_INTERRUPT);
    }

    /// Blocks every GIF lookup until the gate sender is dropped
    struct GatedMedia {
        gate: crossbeam::channel::Receiver<()>,
    }

    impl MediaLookup for GatedMedia {
        fn find_gif(&self, query: &str) -> Result<Option<PathBuf>, ServiceError> {
            let _ = self.gate.recv();
            Ok(Some(PathBuf::from(format!("/tmp/{}.gif", query))))
        }

        fn ask_chat(&self, _query: &str) -> Result<Option<String>, ServiceError> {
            Ok(None)
        }
    }

    #[test]
    fn test_lookups_are_bounded() {
        let clock = ManualClock::new(0);
        let state = StateHandle::new(StateHandler::new(
            Arc::new(StateRegistry::new()),
            State::ACTIVE,
            Arc::new(clock),
        ));
        let (commands, queue) = CommandCenter::channel();
        let interrupts = Arc::new(InterruptManager::new(Arc::new(state.clone()), commands.clone()));
        let (open, gate) = crossbeam::channel::bounded::<()>(0);
        let events = EventManager::new(
            SensorTriggers::default(),
            EventSettings::default(),
            commands,
            interrupts,
            Arc::new(state),
            Arc::new(GatedMedia { gate }),
        );

        for query in ["GIF;a", "GIF;b", "GIF;c", "GIF;d"] {
            events.update(0, None, Some(&CommsSnapshot::connected(query)));
        }
        assert_eq!(events.pending_lookups(), MAX_PENDING_LOOKUPS);

        drop(open);
        events.join_lookups();
        assert_eq!(events.pending_lookups(), 0);
        assert_eq!(queue.pending(), MAX_PENDING_LOOKUPS);
    }

    #[test]
    fn test_gif_lookup_issues_canvas() {
        let rig = rig(SensorTriggers::default());
        rig.events.update(2_000, None, Some(&CommsSnapshot::connected("GIF;cats")));
        rig.events.update(2_100, None, Some(&CommsSnapshot::connected("CHAT;hello")));
        rig.events.join_lookups();

        let command = rig.queue.try_next().unwrap();
        assert_eq!(command.target_state(), Some(State::CANVAS));
        assert_eq!(command.params()["media_path"], json!("/tmp/cats.gif"));
        assert!(rig.queue.try_next().is_none());
    }
}
