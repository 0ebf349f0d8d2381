//! BVH header scan.
//!
//! Only the motion header is interpreted: the skeleton is forwarded as
//! text and frame lines are forwarded verbatim, so joints and channel
//! layouts are never parsed here.

use std::path::Path;
use std::time::Duration;

use sharespace_core::{MotionError, ShowcaseError};
use tracing::{debug, warn};

/// Line that separates the hierarchy section from the motion section.
pub const MOTION_SENTINEL: &str = "MOTION";

// ── MotionClip ────────────────────────────────────────────────────────────────

/// A validated BVH motion file.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionClip {
    lines: Vec<String>,
    /// Index of the `MOTION` line.
    sentinel: usize,
    frame_count: u32,
    frame_time: f64,
    /// Index of the first frame line.
    first_frame: usize,
    /// Number of frame lines played back.
    frames_len: usize,
}

impl MotionClip {
    /// Read a motion file from disk.
    ///
    /// Returns `Ok(None)` for an empty file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ShowcaseError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(&bytes)?)
    }

    /// Decode file bytes as UTF-8 (invalid sequences are replaced) and parse.
    pub fn from_bytes(bytes: &[u8]) -> Result<Option<Self>, MotionError> {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }

    /// Normalise line endings, split into lines and parse.
    ///
    /// Returns `Ok(None)` when the text has no lines at all.
    pub fn from_text(text: &str) -> Result<Option<Self>, MotionError> {
        let lines = split_lines(text);
        if lines.is_empty() {
            return Ok(None);
        }
        Self::from_lines(lines).map(Some)
    }

    /// Parse already split lines. `lines` must not contain `\r` or `\n`.
    pub fn from_lines(lines: Vec<String>) -> Result<Self, MotionError> {
        let sentinel = lines
            .iter()
            .position(|l| l.trim() == MOTION_SENTINEL)
            .ok_or(MotionError::MissingMotionSection)?;

        let count_idx = sentinel + 1;
        let count_line = lines
            .get(count_idx)
            .ok_or(MotionError::MissingHeaderLine { field: "Frames", line: count_idx + 1 })?;
        let digits = first_digit_run(count_line).ok_or_else(|| MotionError::InvalidFrameCount {
            line: count_idx + 1,
            text: count_line.clone(),
        })?;
        let frame_count: u32 = digits.parse().map_err(|_| MotionError::FrameCountOutOfRange {
            line: count_idx + 1,
            text: count_line.clone(),
        })?;

        let time_idx = sentinel + 2;
        let time_line = lines
            .get(time_idx)
            .ok_or(MotionError::MissingHeaderLine { field: "Frame Time", line: time_idx + 1 })?;
        let frame_time: f64 = first_decimal(time_line)
            .and_then(|number| number.parse().ok())
            .ok_or_else(|| MotionError::InvalidFrameTime {
                line: time_idx + 1,
                text: time_line.clone(),
            })?;
        if interval_ms(frame_time).is_none() {
            return Err(MotionError::InvalidFrameInterval { seconds: frame_time });
        }

        let first_frame = time_idx + 1;
        let available = lines[first_frame..]
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |last| last + 1);
        let frames_len = available.min(frame_count as usize);
        if frames_len == 0 {
            return Err(MotionError::NoFrames);
        }
        if available < frame_count as usize {
            warn!(
                "BVH header declares {} frames but only {} frame lines are present",
                frame_count, available
            );
        }

        debug!(
            "Parsed BVH: {} hierarchy lines, {} frames @ {}s",
            sentinel, frames_len, frame_time
        );

        Ok(Self { lines, sentinel, frame_count, frame_time, first_frame, frames_len })
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Frame count as declared by the `Frames:` line.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Seconds per frame as declared by the `Frame Time:` line.
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Playback tick period: frame time in whole milliseconds, floored.
    pub fn frame_interval(&self) -> Duration {
        // Validated in `from_lines`.
        Duration::from_millis(interval_ms(self.frame_time).unwrap_or(1))
    }

    /// Lines before the `MOTION` sentinel.
    pub fn hierarchy_lines(&self) -> &[String] {
        &self.lines[..self.sentinel]
    }

    /// Hierarchy section, sentinel and both header lines joined by `\n`.
    pub fn hierarchy_payload(&self) -> String {
        self.lines[..self.first_frame].join("\n")
    }

    /// Frame lines that are played back, in file order.
    pub fn frame_lines(&self) -> &[String] {
        &self.lines[self.first_frame..self.first_frame + self.frames_len]
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Strip every `\r` and split on `\n`. Empty text has no lines.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.replace('\r', "").split('\n').map(str::to_owned).collect()
}

fn interval_ms(frame_time: f64) -> Option<u64> {
    let ms = (frame_time * 1000.0).floor();
    (ms.is_finite() && ms >= 1.0).then_some(ms as u64)
}

/// First run of ASCII digits, e.g. `"2"` in `"Frames: 2"`.
fn first_digit_run(line: &str) -> Option<&str> {
    let start = line.find(|c: char| c.is_ascii_digit())?;
    let rest = &line[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// First `digits.digits` number, e.g. `"0.033333"` in `"Frame Time: 0.033333"`.
fn first_decimal(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            let mut end = i + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            return Some(&line[start..end]);
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = "ROOT Hips\n{\n}\nMOTION\nFrames: 2\nFrame Time: 0.033333\n0 0 0\n1 1 1";

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_header_and_frames() {
        let clip = MotionClip::from_text(SCENARIO_A).unwrap().unwrap();
        assert_eq!(clip.frame_count(), 2);
        assert!((clip.frame_time() - 0.033333).abs() < 1e-12);
        assert_eq!(clip.frame_interval(), Duration::from_millis(33));
        assert_eq!(clip.frame_lines(), &["0 0 0".to_owned(), "1 1 1".to_owned()]);
        assert_eq!(clip.hierarchy_lines().len(), 3);
        assert_eq!(
            clip.hierarchy_payload(),
            "ROOT Hips\n{\n}\nMOTION\nFrames: 2\nFrame Time: 0.033333"
        );
    }

    #[test]
    fn hierarchy_payload_reproduces_source_prefix() {
        let text = "HIERARCHY\nROOT Hips\n{\n\tOFFSET 0.00 0.00 0.00\n\tCHANNELS 3 Xposition Yposition Zposition\n}\nMOTION\nFrames:\t3\nFrame Time:\t0.0083333\n1 2 3\n4 5 6\n7 8 9\n";
        let clip = MotionClip::from_text(text).unwrap().unwrap();
        let payload = clip.hierarchy_payload();
        let rest = clip.lines()[payload.lines().count()..].join("\n");
        assert_eq!(format!("{payload}\n{rest}"), text);
        assert_eq!(clip.frame_interval(), Duration::from_millis(8));
        assert_eq!(clip.frame_lines().len(), 3);
    }

    #[test]
    fn crlf_is_normalised() {
        let clip = MotionClip::from_text(&SCENARIO_A.replace('\n', "\r\n")).unwrap().unwrap();
        assert_eq!(clip.frame_lines()[1], "1 1 1");
        assert!(!clip.hierarchy_payload().contains('\r'));
    }

    #[test]
    fn empty_text_has_no_clip() {
        assert_eq!(MotionClip::from_text("").unwrap(), None);
        assert_eq!(MotionClip::from_bytes(b"").unwrap(), None);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let mut bytes = b"ROOT Caf".to_vec();
        bytes.extend_from_slice(&[0xC3, 0x28]);
        bytes.extend_from_slice(b"\nMOTION\nFrames: 1\nFrame Time: 0.05\n0 \xFF 0\n");

        let clip = MotionClip::from_bytes(&bytes).unwrap().unwrap();
        assert_eq!(clip.hierarchy_lines(), &["ROOT Caf\u{FFFD}(".to_owned()]);
        assert_eq!(clip.frame_lines(), &["0 \u{FFFD} 0".to_owned()]);
    }

    #[tokio::test]
    async fn load_reads_file_and_reports_missing_file() {
        let dir = std::env::temp_dir().join(format!("sharespace-bvh-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenario_a.bvh");
        std::fs::write(&path, SCENARIO_A).unwrap();

        let clip = MotionClip::load(&path).await.unwrap().unwrap();
        assert_eq!(clip.frame_count(), 2);

        let err = MotionClip::load(dir.join("missing.bvh")).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::Io(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_sentinel_is_an_error() {
        let err = MotionClip::from_lines(lines(&["ROOT Hips", "{", "}"])).unwrap_err();
        assert_eq!(err, MotionError::MissingMotionSection);
    }

    #[test]
    fn frame_count_without_digits_is_an_error() {
        let err = MotionClip::from_lines(lines(&[
            "ROOT Hips", "MOTION", "Frames: abc", "Frame Time: 0.033333", "0 0 0",
        ]))
        .unwrap_err();
        assert_eq!(err, MotionError::InvalidFrameCount { line: 3, text: "Frames: abc".into() });
    }

    #[test]
    fn oversized_frame_count_is_out_of_range() {
        let err = MotionClip::from_lines(lines(&[
            "MOTION", "Frames: 99999999999", "Frame Time: 0.033333", "0 0 0",
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            MotionError::FrameCountOutOfRange { line: 2, text: "Frames: 99999999999".into() }
        );
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn frame_time_without_decimal_is_an_error() {
        let err = MotionClip::from_lines(lines(&["MOTION", "Frames: 1", "Frame Time: 1", "0"]))
            .unwrap_err();
        assert!(matches!(err, MotionError::InvalidFrameTime { line: 3, .. }));
    }

    #[test]
    fn truncated_header_is_an_error() {
        let err = MotionClip::from_lines(lines(&["ROOT Hips", "MOTION", "Frames: 1"])).unwrap_err();
        assert_eq!(err, MotionError::MissingHeaderLine { field: "Frame Time", line: 4 });
    }

    #[test]
    fn sub_millisecond_frame_time_is_rejected() {
        let err = MotionClip::from_lines(lines(&["MOTION", "Frames: 1", "Frame Time: 0.0004", "0"]))
            .unwrap_err();
        assert_eq!(err, MotionError::InvalidFrameInterval { seconds: 0.0004 });
    }

    #[test]
    fn frames_are_clamped_to_declared_count() {
        let clip = MotionClip::from_lines(lines(&[
            "MOTION", "Frames: 2", "Frame Time: 0.1", "a", "b", "c", "", "",
        ]))
        .unwrap();
        assert_eq!(clip.frame_lines(), &["a".to_owned(), "b".to_owned()]);

        let short = MotionClip::from_lines(lines(&["MOTION", "Frames: 5", "Frame Time: 0.1", "a", ""]))
            .unwrap();
        assert_eq!(short.frame_lines(), &["a".to_owned()]);
        assert_eq!(short.frame_count(), 5);
    }

    #[test]
    fn no_frame_lines_is_an_error() {
        let err = MotionClip::from_lines(lines(&["MOTION", "Frames: 0", "Frame Time: 0.1", ""]))
            .unwrap_err();
        assert_eq!(err, MotionError::NoFrames);
    }

    #[test]
    fn number_scanners_follow_leftmost_match() {
        assert_eq!(first_digit_run("Frames: 120"), Some("120"));
        assert_eq!(first_digit_run("Frames:"), None);
        assert_eq!(first_decimal("Frame Time: 12 0.5"), Some("0.5"));
        assert_eq!(first_decimal("t=1.2.3"), Some("1.2"));
        assert_eq!(first_decimal(".5 7."), None);
    }
}
