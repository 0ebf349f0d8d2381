//! Example panels and action dispatch.
//!
//! Panels are described as data ([`PanelSection`] / [`Control`]) so the
//! egui layer only renders them; what a click does is decided by
//! [`outbound_message`] and the session task, both testable without a UI.

use std::path::PathBuf;

use sharespace_core::{OutboundMessage, Resolution};

/// Recordings shipped in the BVH directory: (button label, file name).
pub const BUNDLED_RECORDINGS: [(&str, &str); 2] = [
    ("Rec. 0 3d", "recording_0_3d.bvh"),
    ("Rec. 0 6d", "recording_0_6d.bvh"),
];

pub const CHARACTERS: [&str; 2] = ["Aurora", "Crunch"];

pub const SKIN_COUNT: u32 = 3;

pub const CONSOLE_COMMANDS: [&str; 2] = ["stat fps", "stat pixelstreaming"];

// ── Example ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Example {
    GettingStarted,
    SendData,
    Commands,
    SharespaceBvh,
}

impl Example {
    pub const ALL: [Example; 4] = [
        Example::GettingStarted,
        Example::SendData,
        Example::Commands,
        Example::SharespaceBvh,
    ];

    /// Name shown in the example drop-down.
    pub fn name(self) -> &'static str {
        match self {
            Example::GettingStarted => "Getting Started",
            Example::SendData       => "Send Data to UE",
            Example::Commands       => "Send Commands to UE",
            Example::SharespaceBvh  => "Sharespace BVH",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    pub fn instructions(self) -> Vec<InfoBlock> {
        use InfoBlock::*;
        match self {
            Example::GettingStarted => vec![
                Paragraph("Welcome to the Sharespace showcase!"),
                Heading("Getting Started"),
                Step("Run the rendering host with its message endpoint enabled (set SHARESPACE_HOST / SHARESPACE_PORT to reach it)."),
                Step("Wait for the status badge to show Connected."),
                Step("Use the drop down to select an example."),
                Step("Use the control panel on the left to interact with the example."),
            ],
            Example::SendData => vec![
                Heading("Example: Sending data to the rendering host"),
                Step("Click the character portraits to change character."),
                Step("Click the skins to change character skins."),
                Paragraph("Under the hood these interactions send a UI interaction descriptor that the host interprets and responds to."),
                Paragraph("The descriptors look like this:"),
                Code(r#"{"Character": "Aurora"}   {"Skin": 0}"#),
            ],
            Example::Commands => vec![
                Heading("Example: Triggering commands on the rendering host"),
                Step("Click on the resolution buttons to change the host application's resolution (requires a windowed application)."),
                Paragraph("Built-in commands such as changing resolution are sent as command descriptors:"),
                Code(r#"{"Resolution": {"Width": 1920, "Height": 1080}}"#),
                Paragraph("Console commands like stat gpu are passed through when the host is launched with -AllowPixelStreamingCommands:"),
                Code(r#"{"ConsoleCommand": "stat fps"}"#),
            ],
            Example::SharespaceBvh => Vec::new(),
        }
    }

    /// Settings panel for this example.
    pub fn panel(self) -> Vec<PanelSection> {
        match self {
            Example::GettingStarted => Vec::new(),
            Example::SendData => vec![
                PanelSection {
                    title: Some("Send data: "),
                    note: Some("Select a character: "),
                    controls: CHARACTERS
                        .iter()
                        .map(|name| Control::Portrait {
                            label: name.to_string(),
                            action: UiAction::SelectCharacter(name.to_string()),
                        })
                        .collect(),
                },
                PanelSection {
                    title: None,
                    note: Some("Select a skin: "),
                    controls: (0..SKIN_COUNT)
                        .map(|i| Control::button(format!("Skin {}", i + 1), UiAction::SelectSkin(i)))
                        .collect(),
                },
            ],
            Example::Commands => vec![
                PanelSection {
                    title: Some("Send a custom command: "),
                    note: Some("Change resolution"),
                    controls: Resolution::PRESETS
                        .iter()
                        .map(|(label, res)| Control::button(*label, UiAction::ChangeResolution(*res)))
                        .collect(),
                },
                PanelSection {
                    title: Some("Send a console command: "),
                    note: Some("(Requires the host launched with -AllowPixelStreamingCommands)"),
                    controls: CONSOLE_COMMANDS
                        .iter()
                        .map(|cmd| Control::button(*cmd, UiAction::ConsoleCommand(cmd.to_string())))
                        .collect(),
                },
            ],
            Example::SharespaceBvh => {
                let mut file_controls: Vec<Control> = BUNDLED_RECORDINGS
                    .iter()
                    .map(|(label, file)| Control::button(*label, UiAction::LoadBundledMotion(file.to_string())))
                    .collect();
                file_controls.push(Control::FilePicker);
                file_controls.push(Control::MotionFileLabel);
                vec![
                    PanelSection {
                        title: Some("Send BVH Motion: "),
                        note: Some("Select file"),
                        controls: file_controls,
                    },
                    PanelSection {
                        title: Some("Start/Stop Motion"),
                        note: None,
                        controls: vec![
                            Control::button("Start Motion", UiAction::StartMotion),
                            Control::button("Stop Motion", UiAction::StopMotion),
                        ],
                    },
                ]
            }
        }
    }
}

impl Default for Example {
    fn default() -> Self {
        Example::GettingStarted
    }
}

// ── Panel description ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum InfoBlock {
    Heading(&'static str),
    Paragraph(&'static str),
    Step(&'static str),
    Code(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSection {
    pub title:    Option<&'static str>,
    pub note:     Option<&'static str>,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Button { label: String, action: UiAction },
    /// Character portrait (rendered as a large selectable tile).
    Portrait { label: String, action: UiAction },
    /// Path field + button that loads a local BVH file.
    FilePicker,
    /// "No file selected" / "Remote file: …" / "Uploaded file: …".
    MotionFileLabel,
}

impl Control {
    fn button(label: impl Into<String>, action: UiAction) -> Self {
        Control::Button { label: label.into(), action }
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SelectCharacter(String),
    SelectSkin(u32),
    ChangeResolution(Resolution),
    ConsoleCommand(String),
    /// Bundled recording, by file name inside the BVH directory.
    LoadBundledMotion(String),
    /// User-chosen file on the local disk.
    LoadMotionFile(PathBuf),
    StartMotion,
    StopMotion,
}

impl UiAction {
    /// Whether the control for this action is clickable given the playback state.
    pub fn enabled(&self, playing: bool) -> bool {
        match self {
            UiAction::StartMotion => !playing,
            UiAction::StopMotion => playing,
            _ => true,
        }
    }
}

/// The one-shot message an action sends, if any.
///
/// Motion and file actions return `None`; the session task handles them.
pub fn outbound_message(action: &UiAction) -> Option<OutboundMessage> {
    match action {
        UiAction::SelectCharacter(name) => Some(OutboundMessage::character(name.clone())),
        UiAction::SelectSkin(index) => Some(OutboundMessage::skin(*index)),
        UiAction::ChangeResolution(res) => Some(OutboundMessage::resolution(*res)),
        UiAction::ConsoleCommand(cmd) => Some(OutboundMessage::console(cmd.clone())),
        UiAction::LoadBundledMotion(_)
        | UiAction::LoadMotionFile(_)
        | UiAction::StartMotion
        | UiAction::StopMotion => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
