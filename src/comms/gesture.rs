// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Gesture recognizer output to state commands

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::{CommandCenter, Params, State};

/// One recognizer result, e.g. `{"gesture": "thumb_up", "score": 0.93}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GesturePayload {
    #[serde(default)]
    pub gesture: Option<String>,
    #[serde(default)]
    pub score: f64,
}

pub fn default_gesture_mapping() -> HashMap<String, State> {
    HashMap::from([
        ("thumb_up".to_string(), State::HAPPY),
        ("thumb_down".to_string(), State::RAINBOW_EYES),
        ("closed_fist".to_string(), State::ACTIVE),
    ])
}

pub struct GestureTranslator {
    mapping: HashMap<String, State>,
    commands: CommandCenter,
    last_gesture: Option<String>,
}

impl GestureTranslator {
    pub fn new(commands: CommandCenter) -> Self {
        Self::with_mapping(commands, default_gesture_mapping())
    }

    pub fn with_mapping(commands: CommandCenter, mapping: HashMap<String, State>) -> Self {
        let mapping = mapping
            .into_iter()
            .map(|(gesture, state)| (gesture.to_lowercase(), state))
            .collect();
        Self { mapping, commands, last_gesture: None }
    }

    /// Issue a state change for a new gesture. Returns the requested state.
    pub fn handle(&mut self, payload: &GesturePayload) -> Option<State> {
        let gesture = match payload.gesture.as_deref().map(str::trim) {
            Some(g) if !g.is_empty() => g.to_lowercase(),
            _ => {
                warn!("Gesture payload without a gesture: {:?}", payload);
                return None;
            }
        };

        if self.last_gesture.as_deref() == Some(gesture.as_str()) {
            return None;
        }
        info!("Processing new gesture '{}' with score {:.2}", gesture, payload.score);
        self.last_gesture = Some(gesture.clone());

        let Some(target) = self.mapping.get(&gesture).cloned() else {
            debug!("Unmapped gesture '{}'", gesture);
            return None;
        };

        let mut params = Params::new();
        params.insert("score".to_string(), json!(payload.score));
        params.insert("gesture".to_string(), Value::String(gesture));
        self.commands.change_state(&target, params);
        Some(target)
    }

    /// Decode a raw JSON payload and handle it
    pub fn handle_json(&mut self, payload: &[u8]) -> Result<Option<State>, serde_json::Error> {
        let payload: GesturePayload = serde_json::from_slice(payload)?;
        Ok(self.handle(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Command, CommandQueue};

    fn payload(gesture: &str) -> GesturePayload {
        GesturePayload { gesture: Some(gesture.to_string()), score: 0.9 }
    }

    fn drain(queue: &CommandQueue) -> Vec<Command> {
        std::iter::from_fn(|| queue.try_next()).collect()
    }

    #[test]
    fn test_default_mapping() {
        let (commands, queue) = CommandCenter::channel();
        let mut translator = GestureTranslator::new(commands);

        assert_eq!(translator.handle(&payload("THUMB_UP")), Some(State::HAPPY));
        assert_eq!(translator.handle(&payload("thumb_down")), Some(State::RAINBOW_EYES));
        assert_eq!(translator.handle(&payload("closed_fist")), Some(State::ACTIVE));

        let issued = drain(&queue);
        assert_eq!(issued.len(), 3);
        assert_eq!(issued[0].target_state(), Some(State::HAPPY));
        assert_eq!(issued[0].params()["score"], json!(0.9));
    }

    #[test]
    fn test_repeat_is_suppressed() {
        let (commands, queue) = CommandCenter::channel();
        let mut translator = GestureTranslator::new(commands);

        translator.handle(&payload("thumb_up"));
        assert_eq!(translator.handle(&payload("thumb_up")), None);
        translator.handle(&payload("victory"));
        assert_eq!(translator.handle(&payload("thumb_up")), Some(State::HAPPY));
        assert_eq!(drain(&queue).len(), 2);
    }

    #[test]
    fn test_missing_or_unknown_gesture() {
        let (commands, queue) = CommandCenter::channel();
        let mut translator = GestureTranslator::with_mapping(
            commands,
            HashMap::from([("Wave".to_string(), State::WINK)]),
        );

        assert_eq!(translator.handle_json(br#"{"score": 0.5}"#).unwrap(), None);
        assert_eq!(translator.handle_json(br#"{"gesture": "thumb_up"}"#).unwrap(), None);
        assert_eq!(translator.handle_json(br#"{"gesture": "wave", "score": 1}"#).unwrap(), Some(State::WINK));
        assert!(translator.handle_json(b"not json").is_err());
        assert_eq!(drain(&queue).len(), 1);
    }
}
