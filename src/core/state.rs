// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! State identifiers and the bare state holder

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// Transition parameters carried alongside a state change
pub type Params = Map<String, Value>;

/// Opaque renderer physics snapshot
pub type PhysicsBlob = Map<String, Value>;

/// Name of a behavioral state
///
/// Names are upper-cased on construction so `"sleeping"` and `"SLEEPING"`
/// refer to the same state. Whether a name is *valid* is decided by the
/// [`StateRegistry`](super::StateRegistry), not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Cow<'static, str>);

impl State {
    pub const ACTIVE: State = State::from_static("ACTIVE");
    pub const SQUINTING: State = State::from_static("SQUINTING");
    pub const SLEEPING: State = State::from_static("SLEEPING");
    pub const WAKING: State = State::from_static("WAKING");
    pub const CONFUSED: State = State::from_static("CONFUSED");
    pub const THINKING: State = State::from_static("THINKING");
    pub const ANGRY: State = State::from_static("ANGRY");
    pub const SCARED: State = State::from_static("SCARED");
    pub const HAPPY: State = State::from_static("HAPPY");
    pub const RAINBOW_EYES: State = State::from_static("RAINBOW_EYES");
    pub const WINK: State = State::from_static("WINK");
    pub const UWU: State = State::from_static("UWU");
    pub const SAD: State = State::from_static("SAD");
    pub const CRYING: State = State::from_static("CRYING");
    pub const EXCITED: State = State::from_static("EXCITED");
    pub const AMUSED: State = State::from_static("AMUSED");
    pub const SURPRISED: State = State::from_static("SURPRISED");
    pub const CANVAS: State = State::from_static("CANVAS");
    pub const CHAT: State = State::from_static("CHAT");
    pub const CLOCK: State = State::from_static("CLOCK");
    pub const DISTANCE: State = State::from_static("DISTANCE");

    /// Built-in states, in registration order
    pub const BUILTIN: [State; 21] = [
        State::ACTIVE,
        State::SQUINTING,
        State::SLEEPING,
        State::WAKING,
        State::CONFUSED,
        State::THINKING,
        State::ANGRY,
        State::SCARED,
        State::HAPPY,
        State::RAINBOW_EYES,
        State::WINK,
        State::UWU,
        State::SAD,
        State::CRYING,
        State::EXCITED,
        State::AMUSED,
        State::SURPRISED,
        State::CANVAS,
        State::CHAT,
        State::CLOCK,
        State::DISTANCE,
    ];

    /// `name` must already be upper case
    const fn from_static(name: &'static str) -> Self {
        State(Cow::Borrowed(name))
    }

    pub fn new(name: impl AsRef<str>) -> Self {
        State(Cow::Owned(name.as_ref().trim().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for State {
    fn from(name: &str) -> Self {
        State::new(name)
    }
}

impl From<String> for State {
    fn from(name: String) -> Self {
        State::new(name)
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(State::new(name))
    }
}

/// Holds exactly one current state
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: State,
}

impl StateMachine {
    pub fn new(initial: State) -> Self {
        Self { state: initial }
    }

    pub fn get_state(&self) -> &State {
        &self.state
    }

    /// Replaces the held state. Returns `false` when `new_state` was already current.
    pub fn set_state(&mut self, new_state: State) -> bool {
        if self.state == new_state {
            return false;
        }
        debug!("State machine: {} -> {}", self.state, new_state);
        self.state = new_state;
        true
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(State::ACTIVE)
    }
}
