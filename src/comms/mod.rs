// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Control-link text protocol and external lookups
//!
//! The wireless link delivers short text commands of the form
//! `<CMD>[;<PARAM>]`:
//!
//! | text             | effect                                     |
//! |------------------|--------------------------------------------|
//! | `STATE;happy`    | direct state change, bypasses interrupts   |
//! | `GIF;cats`       | background GIF lookup, then CANVAS         |
//! | `CHAT;hi there`  | background chat query, then CHAT           |
//! | anything else    | shown as canvas text for a short while     |

mod gesture;
mod media;

pub use gesture::{default_gesture_mapping, GesturePayload, GestureTranslator};
pub use media::{MediaLookup, OfflineMedia};

use serde::{Deserialize, Serialize};

use crate::core::State;

/// Latest message from the control link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommsSnapshot {
    pub text: String,
    pub is_connected: bool,
}

impl CommsSnapshot {
    pub fn connected(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_connected: true }
    }
}

/// Decoded control-link message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommsMessage {
    SetState(State),
    Gif(String),
    Chat(String),
    Canvas(String),
    /// Blank text, or a known verb without a parameter
    Ignored,
}

impl CommsMessage {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return CommsMessage::Ignored;
        }

        let (verb, param) = match text.split_once(';') {
            Some((verb, param)) => (verb.trim(), param.trim()),
            None => (text, ""),
        };

        let needs_param = |wrap: fn(&str) -> CommsMessage| {
            if param.is_empty() {
                CommsMessage::Ignored
            } else {
                wrap(param)
            }
        };

        match verb.to_ascii_uppercase().as_str() {
            "STATE" => needs_param(|p| CommsMessage::SetState(State::new(p))),
            "GIF" => needs_param(|p| CommsMessage::Gif(p.to_string())),
            "CHAT" => needs_param(|p| CommsMessage::Chat(p.to_string())),
            _ => CommsMessage::Canvas(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_are_case_insensitive() {
        assert_eq!(CommsMessage::parse("state;happy"), CommsMessage::SetState(State::HAPPY));
        assert_eq!(CommsMessage::parse(" Gif; dancing cat "), CommsMessage::Gif("dancing cat".into()));
        assert_eq!(CommsMessage::parse("CHAT;how are you?"), CommsMessage::Chat("how are you?".into()));
    }

    #[test]
    fn test_empty_param_is_ignored() {
        assert_eq!(CommsMessage::parse("GIF"), CommsMessage::Ignored);
        assert_eq!(CommsMessage::parse("STATE;"), CommsMessage::Ignored);
        assert_eq!(CommsMessage::parse("chat;   "), CommsMessage::Ignored);
        assert_eq!(CommsMessage::parse("   "), CommsMessage::Ignored);
    }

    #[test]
    fn test_anything_else_is_canvas_text() {
        assert_eq!(CommsMessage::parse("Hello Ekko"), CommsMessage::Canvas("Hello Ekko".into()));
        assert_eq!(CommsMessage::parse("note;buy milk"), CommsMessage::Canvas("note;buy milk".into()));
    }
}
