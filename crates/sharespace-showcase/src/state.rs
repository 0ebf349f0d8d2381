use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sharespace_core::MotionSource;

// ── Phase ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Connecting { attempt: u32 },
    Connected { host: String, session_id: String },
    Disconnected(String),
}

impl Default for Phase {
    fn default() -> Self {
        Self::Connecting { attempt: 0 }
    }
}

impl Phase {
    pub fn label(&self) -> &str {
        match self {
            Phase::Connecting { .. }   => "Connecting…",
            Phase::Connected { .. }    => "Connected",
            Phase::Disconnected(_)     => "Disconnected",
        }
    }

    pub fn color(&self) -> egui::Color32 {
        match self {
            Phase::Connecting { .. }   => egui::Color32::from_rgb(230, 185, 50),
            Phase::Connected { .. }    => egui::Color32::from_rgb(60, 200, 80),
            Phase::Disconnected(_)     => egui::Color32::from_rgb(220, 60, 60),
        }
    }
}

// ── GuiState ──────────────────────────────────────────────────────────────────

pub struct GuiState {
    pub phase:          Phase,
    /// Where the loaded motion file came from; `None` until one is loaded.
    pub motion_source:  Option<MotionSource>,
    /// Last load failure, shown under the file label.
    pub motion_error:   Option<String>,
    pub playing:        bool,
    pub frames_sent:    u64,
    pub logs:           VecDeque<String>,
}

impl Default for GuiState {
    fn default() -> Self {
        Self {
            phase:         Phase::default(),
            motion_source: None,
            motion_error:  None,
            playing:       false,
            frames_sent:   0,
            logs:          VecDeque::new(),
        }
    }
}

impl GuiState {
    /// Append a line to the circular log buffer (max 300 entries).
    pub fn push_log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("[GUI log] {}", line);
        if self.logs.len() >= 300 {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    /// Label for the selected-file line of the BVH panel.
    pub fn motion_label(&self) -> String {
        self.motion_source
            .as_ref()
            .map_or_else(|| "No file selected".to_owned(), ToString::to_string)
    }
}

/// Shared handle passed between the GUI thread and the async session task.
pub type SharedState = Arc<Mutex<GuiState>>;
