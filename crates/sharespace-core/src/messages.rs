//! Outbound message model.
//!
//! Everything the showcase sends to the rendering host is one of three
//! kinds, matching the streaming client's entry points:
//!
//! - **UI interactions**: free-form descriptors the host application
//!   interprets (character/skin selection, BVH motion traffic).
//! - **Commands**: built-in host commands such as a resolution change.
//! - **Console commands**: raw console strings passed through untouched.
//!
//! Descriptors serialise to the exact JSON objects the host expects, e.g.
//! `{"type":"BVHMotionFrame","data":"0 0 0"}` or `{"Skin":1}`.

use serde::{Deserialize, Serialize};

use crate::types::Resolution;

// MARK: - MotionMessage

/// BVH playback traffic, sent as UI interactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MotionMessage {
    #[serde(rename = "BVHStartMotion")]
    Start,

    #[serde(rename = "BVHStopMotion")]
    Stop,

    /// Hierarchy section plus the `Frames:` and `Frame Time:` lines.
    #[serde(rename = "BVHHierarchy")]
    Hierarchy { data: String },

    /// One line of per-frame channel values, passed through verbatim.
    #[serde(rename = "BVHMotionFrame")]
    Frame { data: String },
}

impl MotionMessage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "BVHStartMotion",
            Self::Stop => "BVHStopMotion",
            Self::Hierarchy { .. } => "BVHHierarchy",
            Self::Frame { .. } => "BVHMotionFrame",
        }
    }
}

// MARK: - UiInteraction

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UiInteraction {
    Motion(MotionMessage),
    Character {
        #[serde(rename = "Character")]
        name: String,
    },
    Skin {
        #[serde(rename = "Skin")]
        index: u32,
    },
}

impl From<MotionMessage> for UiInteraction {
    fn from(msg: MotionMessage) -> Self {
        Self::Motion(msg)
    }
}

// MARK: - Command

/// Resolution payload in the host's PascalCase field naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolutionRequest {
    pub width: u32,
    pub height: u32,
}

impl From<Resolution> for ResolutionRequest {
    fn from(r: Resolution) -> Self {
        Self { width: r.width, height: r.height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Resolution(ResolutionRequest),
}

// MARK: - OutboundMessage

/// A single message for the streaming collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    UiInteraction(UiInteraction),
    Command(Command),
    ConsoleCommand(String),
}

impl OutboundMessage {
    pub fn character(name: impl Into<String>) -> Self {
        Self::UiInteraction(UiInteraction::Character { name: name.into() })
    }

    pub fn skin(index: u32) -> Self {
        Self::UiInteraction(UiInteraction::Skin { index })
    }

    pub fn resolution(resolution: Resolution) -> Self {
        Self::Command(Command::Resolution(resolution.into()))
    }

    pub fn console(command: impl Into<String>) -> Self {
        Self::ConsoleCommand(command.into())
    }

    /// JSON descriptor as the host receives it.
    pub fn descriptor(&self) -> serde_json::Value {
        match self {
            Self::UiInteraction(i) => serde_json::to_value(i),
            Self::Command(c) => serde_json::to_value(c),
            Self::ConsoleCommand(cmd) => Ok(serde_json::json!({ "ConsoleCommand": cmd })),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

impl From<MotionMessage> for OutboundMessage {
    fn from(msg: MotionMessage) -> Self {
        Self::UiInteraction(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn motion_messages_use_host_type_tags() {
        assert_eq!(
            OutboundMessage::from(MotionMessage::Start).descriptor(),
            json!({ "type": "BVHStartMotion" })
        );
        assert_eq!(
            OutboundMessage::from(MotionMessage::Frame { data: "0 0 0".into() }).descriptor(),
            json!({ "type": "BVHMotionFrame", "data": "0 0 0" })
        );
        assert_eq!(
            OutboundMessage::from(MotionMessage::Hierarchy { data: "ROOT Hips".into() })
                .descriptor(),
            json!({ "type": "BVHHierarchy", "data": "ROOT Hips" })
        );
    }

    #[test]
    fn selection_and_command_descriptors() {
        assert_eq!(OutboundMessage::character("Aurora").descriptor(), json!({ "Character": "Aurora" }));
        assert_eq!(OutboundMessage::skin(2).descriptor(), json!({ "Skin": 2 }));
        assert_eq!(
            OutboundMessage::resolution(Resolution::HD).descriptor(),
            json!({ "Resolution": { "Width": 1280, "Height": 720 } })
        );
        assert_eq!(
            OutboundMessage::console("stat fps").descriptor(),
            json!({ "ConsoleCommand": "stat fps" })
        );
    }

    #[test]
    fn ui_interaction_parses_back_from_host_json() {
        let skin: UiInteraction = serde_json::from_str(r#"{"Skin":1}"#).unwrap();
        assert_eq!(skin, UiInteraction::Skin { index: 1 });

        let frame: UiInteraction =
            serde_json::from_str(r#"{"type":"BVHMotionFrame","data":"1 1 1"}"#).unwrap();
        assert_eq!(frame, UiInteraction::Motion(MotionMessage::Frame { data: "1 1 1".into() }));
    }
}
