//! Fixed-rate BVH playback.
//!
//! # Lifecycle
//!
//! ```text
//!        start()                          stop()
//! Idle ──────────► BVHStartMotion      Running ──────► (tick task cancelled)
//!                  BVHHierarchy                        BVHStopMotion
//!                  spawn tick task ─► Running
//!
//! Running: every frame_interval → BVHMotionFrame(cursor.next())
//! ```
//!
//! A player holds at most one tick task. `start` while running and `stop`
//! while idle are no-ops, and a player built from an empty file never
//! leaves `Idle`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sharespace_core::{MotionMessage, ShowcaseError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cursor::FrameCursor;
use crate::parser::MotionClip;

// ── PlayerState ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Running,
}

// ── MotionPlayer ──────────────────────────────────────────────────────────────

/// Streams one clip's frames to an outbound channel.
///
/// Construct a fresh player per loaded file; `start` and `stop` are the
/// only mutators.
pub struct MotionPlayer {
    clip: Option<Arc<MotionClip>>,
    outbound: mpsc::Sender<MotionMessage>,
    tick_task: Option<JoinHandle<()>>,
    /// Frames sent since the last `start` (shared with the tick task).
    frames_sent: Arc<AtomicU64>,
}

impl MotionPlayer {
    /// `clip` is `None` for an empty file.
    pub fn new(clip: Option<MotionClip>, outbound: mpsc::Sender<MotionMessage>) -> Self {
        Self {
            clip: clip.map(Arc::new),
            outbound,
            tick_task: None,
            frames_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn clip(&self) -> Option<&MotionClip> {
        self.clip.as_deref()
    }

    pub fn state(&self) -> PlayerState {
        match &self.tick_task {
            Some(task) if !task.is_finished() => PlayerState::Running,
            _ => PlayerState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == PlayerState::Running
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Send the hierarchy and begin ticking.
    pub async fn start(&mut self) -> Result<(), ShowcaseError> {
        let Some(clip) = self.clip.clone() else {
            debug!("start ignored: no motion lines loaded");
            return Ok(());
        };
        if self.is_running() {
            debug!("start ignored: playback already running");
            return Ok(());
        }
        // A tick task that ended on its own (closed channel) is discarded.
        self.tick_task = None;

        self.emit(MotionMessage::Start).await?;
        self.emit(MotionMessage::Hierarchy { data: clip.hierarchy_payload() }).await?;

        let period = clip.frame_interval();
        self.frames_sent.store(0, Ordering::Relaxed);
        info!(
            "Motion playback started: {} frames every {}ms",
            clip.frame_lines().len(),
            period.as_millis()
        );

        self.tick_task = Some(tokio::spawn(run_ticks(
            FrameCursor::new(clip),
            period,
            self.outbound.clone(),
            Arc::clone(&self.frames_sent),
        )));
        Ok(())
    }

    /// Cancel the tick task and notify the host.
    pub async fn stop(&mut self) -> Result<(), ShowcaseError> {
        let Some(task) = self.tick_task.take() else {
            return Ok(());
        };
        task.abort();
        // Wait for cancellation so no frame can follow BVHStopMotion.
        let _ = task.await;
        info!("Motion playback stopped after {} frames", self.frames_sent());
        self.emit(MotionMessage::Stop).await
    }

    async fn emit(&self, msg: MotionMessage) -> Result<(), ShowcaseError> {
        debug!("Emitting {}", msg.label());
        self.outbound.send(msg).await.map_err(|_| ShowcaseError::StreamError {
            reason: "outbound channel closed".into(),
        })
    }
}

impl Drop for MotionPlayer {
    fn drop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }
}

// ── Tick task ─────────────────────────────────────────────────────────────────

async fn run_ticks(
    mut cursor: FrameCursor,
    period: Duration,
    outbound: mpsc::Sender<MotionMessage>,
    frames_sent: Arc<AtomicU64>,
) {
    // First frame goes out one period after start, not immediately.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let position = cursor.position();
        let Some(data) = cursor.next() else { return };
        if outbound.send(MotionMessage::Frame { data }).await.is_err() {
            debug!("Outbound channel closed; ending playback at frame {}", position);
            return;
        }
        frames_sent.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
