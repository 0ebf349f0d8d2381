use std::sync::Arc;

use crate::parser::MotionClip;

/// Looping position over a clip's frame lines.
///
/// Never returns `None`: after the last frame it wraps back to the first.
#[derive(Debug, Clone)]
pub struct FrameCursor {
    clip: Arc<MotionClip>,
    position: usize,
}

impl FrameCursor {
    pub fn new(clip: Arc<MotionClip>) -> Self {
        Self { clip, position: 0 }
    }

    /// Index (into the frame lines) of the frame the next call to `next` yields.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for FrameCursor {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let frames = self.clip.frame_lines();
        let line = frames[self.position].clone();
        self.position += 1;
        if self.position == frames.len() {
            self.position = 0;
        }
        Some(line)
    }
}
