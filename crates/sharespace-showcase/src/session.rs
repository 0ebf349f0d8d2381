//! Async side of the showcase: host connection, action handling, BVH playback.
//!
//! Runs on the tokio runtime thread. The egui thread sends
//! [`SessionCommand`]s; progress is reported through [`SharedState`].
//!
//! # Flow
//!
//! ```text
//! connect ─► hello ─► session loop ─┬─ UI action    → emit / load / start / stop
//!    ▲                              ├─ motion frame → emit
//!    │                              ├─ keepalive    → emit + refresh stats
//!    │                              └─ host response → log
//!    └──── retry every 3 s (file loads still served) ◄── disconnected
//! ```

use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sharespace_bvh::{MotionClip, MotionPlayer};
use sharespace_core::{MotionMessage, MotionSource, ShowcaseConfig, ShowcaseError, TransportError};
use sharespace_transport_client::{StreamClient, StreamWriter};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::controller::{outbound_message, UiAction};
use crate::state::{Phase, SharedState};

const RETRY_DELAY: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ── Commands from the UI ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SessionCommand {
    Dispatch(UiAction),
    Shutdown,
}

#[derive(Debug, PartialEq)]
pub enum SessionEnd {
    Disconnected,
    Shutdown,
}

// ── Loaded motion ─────────────────────────────────────────────────────────────

/// The most recently loaded motion file; survives reconnects.
#[derive(Default)]
pub struct MotionLibrary {
    clip: Option<MotionClip>,
}

impl MotionLibrary {
    /// Read and parse `path`. On failure the previous clip stays loaded.
    pub async fn load(&mut self, path: &Path) -> Result<(), ShowcaseError> {
        self.clip = MotionClip::load(path).await?;
        Ok(())
    }

    pub fn clip(&self) -> Option<MotionClip> {
        self.clip.clone()
    }
}

// ── Entry point (called from the tokio runtime thread) ─────────────────────────

/// Keeps a session to the rendering host alive until the UI shuts down.
pub async fn run(
    config: ShowcaseConfig,
    state: SharedState,
    ctx: egui::Context,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
) {
    let mut library = MotionLibrary::default();
    let mut attempt: u32 = 0;

    loop {
        set_phase(&state, &ctx, Phase::Connecting { attempt });

        let connect = tokio::time::timeout(
            CONNECT_TIMEOUT,
            StreamClient::connect(&config.host, config.port),
        )
        .await
        .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {}s", CONNECT_TIMEOUT.as_secs())));

        let reason = match connect {
            Ok(client) => {
                attempt = 0;
                match run_session(client, &config, &state, &ctx, &mut library, &mut cmd_rx).await {
                    Ok(SessionEnd::Shutdown) => {
                        info!("Session closed by the UI");
                        return;
                    }
                    Ok(SessionEnd::Disconnected) => "host disconnected".to_owned(),
                    Err(e) => format!("{e:#}"),
                }
            }
            Err(e) => format!("{e:#}"),
        };

        warn!("Host {}:{} unavailable: {}", config.host, config.port, reason);
        set_phase(&state, &ctx, Phase::Disconnected(reason.clone()));
        log(&state, &ctx, format!("[ERROR] {reason} — retrying in {}s", RETRY_DELAY.as_secs()));
        attempt += 1;

        // Wait before retrying, still serving file loads.
        let retry = tokio::time::sleep(RETRY_DELAY);
        tokio::pin!(retry);
        loop {
            tokio::select! {
                _ = &mut retry => break,
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(SessionCommand::Shutdown) => return,
                    Some(SessionCommand::Dispatch(action)) => {
                        handle_offline(action, &config, &state, &ctx, &mut library).await;
                    }
                },
            }
        }
    }
}

async fn handle_offline(
    action: UiAction,
    config: &ShowcaseConfig,
    state: &SharedState,
    ctx: &egui::Context,
    library: &mut MotionLibrary,
) {
    match load_request(&action, config) {
        Some((source, path)) => {
            load_into(library, source, &path, state, ctx).await;
        }
        None => log(state, ctx, format!("Not connected; dropped {action:?}")),
    }
}

// ── Session loop ──────────────────────────────────────────────────────────────

/// Runs one connected session until the host goes away or the UI shuts down.
///
/// Playback is reported as stopped on return, whether the session ended
/// cleanly or with an error.
pub async fn run_session<S>(
    client: StreamClient<S>,
    config: &ShowcaseConfig,
    state: &SharedState,
    ctx: &egui::Context,
    library: &mut MotionLibrary,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
) -> Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let result = session_loop(client, config, state, ctx, library, cmd_rx).await;
    set_playing(state, ctx, false, 0);
    result
}

async fn session_loop<S>(
    mut client: StreamClient<S>,
    config: &ShowcaseConfig,
    state: &SharedState,
    ctx: &egui::Context,
    library: &mut MotionLibrary,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
) -> Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let session_id = format!("showcase-{}", uuid::Uuid::new_v4());
    let ack = client
        .send_hello(&session_id, &config.device_name)
        .await
        .context("hello handshake")?;
    if !ack.accepted {
        let reason = ack.reason.unwrap_or_else(|| "unknown".to_owned());
        return Err(TransportError::Rejected { reason }.into());
    }

    set_phase(
        state,
        ctx,
        Phase::Connected {
            host: format!("{}:{}", config.host, config.port),
            session_id: session_id.clone(),
        },
    );
    log(state, ctx, format!("Session {session_id} accepted"));

    let (writer, mut responses) = client.start_recv_loop();
    let (motion_tx, motion_rx) = mpsc::channel::<MotionMessage>(256);
    let mut session = Session {
        config,
        state,
        ctx,
        writer,
        player: MotionPlayer::new(library.clip(), motion_tx.clone()),
        motion_tx,
        motion_rx,
    };
    let mut keepalive = tokio::time::interval(Duration::from_secs(config.keepalive_secs));

    let end = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                None | Some(SessionCommand::Shutdown) => break SessionEnd::Shutdown,
                Some(SessionCommand::Dispatch(action)) => session.handle(action, library).await?,
            },

            Some(msg) = session.motion_rx.recv() => {
                session.writer.emit(&msg.into()).await.context("sending motion message")?;
            }

            _ = keepalive.tick() => {
                session.writer.send_keepalive(ts_ms()).await.context("keepalive")?;
                session.refresh_playback();
            }

            response = responses.recv() => match response {
                Some(text) => log(state, ctx, format!("[HOST] {text}")),
                None => break SessionEnd::Disconnected,
            },
        }
    };

    if end == SessionEnd::Shutdown {
        session.stop_player().await?;
        // Flush BVHStopMotion (and anything queued before it).
        let Session { player, motion_tx, mut motion_rx, mut writer, .. } = session;
        drop(player);
        drop(motion_tx);
        while let Some(msg) = motion_rx.recv().await {
            writer.emit(&msg.into()).await?;
        }
        writer.send_stop(&session_id).await?;
    }
    Ok(end)
}

struct Session<'a, S> {
    config: &'a ShowcaseConfig,
    state: &'a SharedState,
    ctx: &'a egui::Context,
    writer: StreamWriter<S>,
    player: MotionPlayer,
    motion_tx: mpsc::Sender<MotionMessage>,
    motion_rx: mpsc::Receiver<MotionMessage>,
}

impl<S: AsyncWrite> Session<'_, S> {
    async fn handle(&mut self, action: UiAction, library: &mut MotionLibrary) -> Result<()> {
        if let Some(msg) = outbound_message(&action) {
            self.writer.emit(&msg).await.context("sending UI action")?;
            log(self.state, self.ctx, format!("Sent {}", msg.descriptor()));
            return Ok(());
        }

        if let Some((source, path)) = load_request(&action, self.config) {
            if load_into(library, source, &path, self.state, self.ctx).await {
                // Cancel the old ticks before the new file takes over.
                self.stop_player().await?;
                self.player = MotionPlayer::new(library.clip(), self.motion_tx.clone());
                self.refresh_playback();
            }
            return Ok(());
        }

        match action {
            UiAction::StartMotion => {
                if self.player.clip().is_none() {
                    log(self.state, self.ctx, "No motion file loaded");
                }
                let start = self.player.start();
                forward_while(start, &mut self.motion_rx, &mut self.writer).await?;
            }
            UiAction::StopMotion => self.stop_player().await?,
            _ => {}
        }
        self.refresh_playback();
        Ok(())
    }

    async fn stop_player(&mut self) -> Result<()> {
        let stop = self.player.stop();
        forward_while(stop, &mut self.motion_rx, &mut self.writer).await
    }

    fn refresh_playback(&self) {
        set_playing(self.state, self.ctx, self.player.is_running(), self.player.frames_sent());
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Drive a player operation while forwarding the motion queue to the host.
///
/// The player awaits space in the queue and the session is its only
/// reader, so the queue must keep draining until the operation returns.
async fn forward_while<S: AsyncWrite>(
    op: impl Future<Output = Result<(), ShowcaseError>>,
    motion_rx: &mut mpsc::Receiver<MotionMessage>,
    writer: &mut StreamWriter<S>,
) -> Result<()> {
    tokio::pin!(op);
    loop {
        tokio::select! {
            res = &mut op => return Ok(res?),
            Some(msg) = motion_rx.recv() => {
                writer.emit(&msg.into()).await.context("sending motion message")?;
            }
        }
    }
}

/// Resolve a file action to its source label and disk path.
fn load_request(action: &UiAction, config: &ShowcaseConfig) -> Option<(MotionSource, std::path::PathBuf)> {
    match action {
        UiAction::LoadBundledMotion(name) => {
            Some((MotionSource::Bundled(name.clone()), config.bundled_motion_path(name)))
        }
        UiAction::LoadMotionFile(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Some((MotionSource::Uploaded(name), path.clone()))
        }
        _ => None,
    }
}

/// Load a motion file and report the outcome. Returns `true` on success.
async fn load_into(
    library: &mut MotionLibrary,
    source: MotionSource,
    path: &Path,
    state: &SharedState,
    ctx: &egui::Context,
) -> bool {
    let result = library.load(path).await;
    {
        let mut s = state.lock().unwrap();
        match &result {
            Ok(()) => {
                s.push_log(format!("Loaded {}", path.display()));
                s.motion_source = Some(source);
                s.motion_error = None;
            }
            Err(e) => {
                warn!("Loading {} failed: {}", path.display(), e);
                s.push_log(format!("[ERROR] {}: {}", source.file_name(), e));
                s.motion_error = Some(e.to_string());
            }
        }
    }
    ctx.request_repaint();
    result.is_ok()
}

fn set_phase(state: &SharedState, ctx: &egui::Context, phase: Phase) {
    state.lock().unwrap().phase = phase;
    ctx.request_repaint();
}

fn set_playing(state: &SharedState, ctx: &egui::Context, playing: bool, frames_sent: u64) {
    {
        let mut s = state.lock().unwrap();
        s.playing = playing;
        s.frames_sent = frames_sent;
    }
    ctx.request_repaint();
}

fn log(state: &SharedState, ctx: &egui::Context, line: impl Into<String>) {
    state.lock().unwrap().push_log(line);
    ctx.request_repaint();
}

fn ts_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::state::GuiState;
    use serde_json::{json, Value};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    const CLIP: &str = "HIERARCHY\nROOT Hips\n{\n}\nMOTION\nFrames: 2\nFrame Time: 0.050000\n0 0 0\n1 1 1\n";
    const FAST_CLIP: &str = "HIERARCHY\nROOT Hips\n{\n}\nMOTION\nFrames: 2\nFrame Time: 0.010000\n0 0 0\n1 1 1\n";

    // Minimal host side of the wire format.
    async fn read_frame(host: &mut DuplexStream) -> Value {
        let len = host.read_u32().await.unwrap() as usize;
        let mut body = vec![0u8; len];
        host.read_exact(&mut body).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn write_frame(host: &mut DuplexStream, value: Value) {
        let body = serde_json::to_vec(&value).unwrap();
        host.write_u32(body.len() as u32).await.unwrap();
        host.write_all(&body).await.unwrap();
    }

    /// Next frame that is not a keepalive.
    async fn next_message(host: &mut DuplexStream) -> Value {
        loop {
            let frame = read_frame(host).await;
            if frame["type"] != "keepalive" {
                return frame;
            }
        }
    }

    fn clip_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sharespace-{}", std::process::id()))
    }

    fn write_clip(name: &str, text: &str) -> std::path::PathBuf {
        let dir = clip_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    struct Harness {
        host: DuplexStream,
        cmd_tx: mpsc::Sender<SessionCommand>,
        state: SharedState,
        task: tokio::task::JoinHandle<Result<SessionEnd>>,
    }

    async fn connect() -> Harness {
        connect_with(256 * 1024).await
    }

    /// `buffer` bounds how many bytes the client can write before the host reads.
    async fn connect_with(buffer: usize) -> Harness {
        let (client, mut host) = duplex(buffer);
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let state: SharedState = Arc::new(Mutex::new(GuiState::default()));
        let state_bg = Arc::clone(&state);

        let task = tokio::spawn(async move {
            let config = ShowcaseConfig { keepalive_secs: 60, ..Default::default() };
            let ctx = egui::Context::default();
            let mut library = MotionLibrary::default();
            run_session(StreamClient::from_stream(client), &config, &state_bg, &ctx, &mut library, &mut cmd_rx).await
        });

        let hello = read_frame(&mut host).await;
        assert_eq!(hello["type"], "hello");
        write_frame(&mut host, json!({ "type": "hello_ack", "accepted": true, "sessionID": hello["sessionID"] })).await;

        Harness { host, cmd_tx, state, task }
    }

    async fn dispatch(h: &Harness, action: UiAction) {
        h.cmd_tx.send(SessionCommand::Dispatch(action)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ui_actions_are_forwarded_as_descriptors() {
        let mut h = connect().await;

        dispatch(&h, UiAction::SelectSkin(2)).await;
        let msg = next_message(&mut h.host).await;
        assert_eq!(msg["type"], "ui_interaction");
        assert_eq!(msg["descriptor"], json!({ "Skin": 2 }));

        dispatch(&h, UiAction::ConsoleCommand("stat fps".into())).await;
        let msg = next_message(&mut h.host).await;
        assert_eq!(msg["type"], "command");
        assert_eq!(msg["descriptor"], json!({ "ConsoleCommand": "stat fps" }));

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        assert_eq!(next_message(&mut h.host).await["type"], "stop");
        assert_eq!(h.task.await.unwrap().unwrap(), SessionEnd::Shutdown);
        assert!(matches!(h.state.lock().unwrap().phase, Phase::Connected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_file_streams_until_stopped() {
        let mut h = connect().await;
        let path = write_clip("walk.bvh", CLIP);

        dispatch(&h, UiAction::LoadMotionFile(path.clone())).await;
        dispatch(&h, UiAction::StartMotion).await;

        assert_eq!(next_message(&mut h.host).await["descriptor"], json!({ "type": "BVHStartMotion" }));
        let hierarchy = next_message(&mut h.host).await;
        assert_eq!(hierarchy["descriptor"]["type"], "BVHHierarchy");
        assert_eq!(
            hierarchy["descriptor"]["data"],
            "HIERARCHY\nROOT Hips\n{\n}\nMOTION\nFrames: 2\nFrame Time: 0.050000"
        );
        for expected in ["0 0 0", "1 1 1", "0 0 0"] {
            let frame = next_message(&mut h.host).await;
            assert_eq!(frame["descriptor"], json!({ "type": "BVHMotionFrame", "data": expected }));
        }
        {
            let s = h.state.lock().unwrap();
            assert!(s.playing);
            assert_eq!(s.motion_label(), "Uploaded file: walk.bvh");
        }

        dispatch(&h, UiAction::StopMotion).await;
        // Frames already in flight may precede the stop notice.
        loop {
            let msg = next_message(&mut h.host).await;
            if msg["descriptor"]["type"] == "BVHStopMotion" {
                break;
            }
            assert_eq!(msg["descriptor"]["type"], "BVHMotionFrame");
        }

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        assert_eq!(next_message(&mut h.host).await["type"], "stop");
        h.task.await.unwrap().unwrap();
        assert!(!h.state.lock().unwrap().playing);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_file_keeps_previous_clip() {
        let mut h = connect().await;
        let good = write_clip("good.bvh", CLIP);
        let bad = write_clip("bad.bvh", "ROOT Hips\nMOTION\nFrames: abc\nFrame Time: 0.05\n0 0 0\n");

        dispatch(&h, UiAction::LoadMotionFile(good.clone())).await;
        dispatch(&h, UiAction::LoadMotionFile(bad.clone())).await;
        dispatch(&h, UiAction::StartMotion).await;

        assert_eq!(next_message(&mut h.host).await["descriptor"]["type"], "BVHStartMotion");
        let hierarchy = next_message(&mut h.host).await;
        assert!(hierarchy["descriptor"]["data"].as_str().unwrap().starts_with("HIERARCHY"));
        {
            let s = h.state.lock().unwrap();
            assert_eq!(s.motion_label(), "Uploaded file: good.bvh");
            assert!(s.motion_error.as_deref().unwrap().contains("frame count"));
        }

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
        let _ = std::fs::remove_file(good);
        let _ = std::fs::remove_file(bad);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_reaches_host_after_stalled_reads() {
        let mut h = connect_with(1024).await;
        let path = write_clip("fast.bvh", FAST_CLIP);

        dispatch(&h, UiAction::LoadMotionFile(path.clone())).await;
        dispatch(&h, UiAction::StartMotion).await;
        assert_eq!(next_message(&mut h.host).await["descriptor"]["type"], "BVHStartMotion");

        // The host stops reading: the wire buffer and the motion queue fill up.
        tokio::time::sleep(Duration::from_secs(10)).await;
        dispatch(&h, UiAction::StopMotion).await;

        let host = &mut h.host;
        let forwarded = tokio::time::timeout(Duration::from_secs(60), async move {
            let mut forwarded = 0;
            loop {
                let msg = next_message(host).await;
                if msg["descriptor"]["type"] == "BVHStopMotion" {
                    return forwarded;
                }
                forwarded += 1;
            }
        })
        .await
        .expect("BVHStopMotion reaches the host once it reads again");
        assert!(forwarded > 0);
        assert!(!h.state.lock().unwrap().playing);

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        assert_eq!(next_message(&mut h.host).await["type"], "stop");
        assert_eq!(h.task.await.unwrap().unwrap(), SessionEnd::Shutdown);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_file_keeps_previous_clip() {
        let mut h = connect().await;
        let good = write_clip("kept.bvh", CLIP);

        dispatch(&h, UiAction::LoadMotionFile(good.clone())).await;
        dispatch(&h, UiAction::LoadMotionFile(clip_dir().join("does-not-exist.bvh"))).await;
        dispatch(&h, UiAction::StartMotion).await;

        // Nothing is sent for the failed load; the kept clip starts playing.
        assert_eq!(next_message(&mut h.host).await["descriptor"]["type"], "BVHStartMotion");
        let hierarchy = next_message(&mut h.host).await;
        assert!(hierarchy["descriptor"]["data"].as_str().unwrap().starts_with("HIERARCHY"));
        {
            let s = h.state.lock().unwrap();
            assert_eq!(s.motion_label(), "Uploaded file: kept.bvh");
            assert!(s.motion_error.is_some());
            assert!(s.logs.iter().any(|l| l.starts_with("[ERROR] does-not-exist.bvh")));
        }

        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        h.task.await.unwrap().unwrap();
        let _ = std::fs::remove_file(good);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_host_clears_playing_flag() {
        let mut h = connect().await;
        let path = write_clip("lost.bvh", CLIP);

        dispatch(&h, UiAction::LoadMotionFile(path.clone())).await;
        dispatch(&h, UiAction::StartMotion).await;
        next_message(&mut h.host).await;
        next_message(&mut h.host).await;
        assert_eq!(next_message(&mut h.host).await["descriptor"]["type"], "BVHMotionFrame");
        assert!(h.state.lock().unwrap().playing);

        let Harness { host, cmd_tx: _cmd_tx, state, task } = h;
        drop(host);

        // Either a failed write or the closed read side ends the session.
        let _ = task.await.unwrap();
        assert!(!state.lock().unwrap().playing);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_file_sends_nothing() {
        let mut h = connect().await;

        dispatch(&h, UiAction::StartMotion).await;
        dispatch(&h, UiAction::StopMotion).await;
        h.cmd_tx.send(SessionCommand::Shutdown).await.unwrap();

        assert_eq!(next_message(&mut h.host).await["type"], "stop");
        h.task.await.unwrap().unwrap();
        assert!(h.state.lock().unwrap().logs.iter().any(|l| l == "No motion file loaded"));
    }

    #[tokio::test(start_paused = true)]
    async fn host_stop_ends_session() {
        let mut h = connect().await;
        write_frame(&mut h.host, json!({ "type": "stop" })).await;
        assert_eq!(h.task.await.unwrap().unwrap(), SessionEnd::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_hello_is_an_error() {
        let (client, mut host) = duplex(4096);
        let (_cmd_tx, mut cmd_rx) = mpsc::channel(1);
        let state: SharedState = Arc::new(Mutex::new(GuiState::default()));

        let task = tokio::spawn(async move {
            let ctx = egui::Context::default();
            let mut library = MotionLibrary::default();
            run_session(
                StreamClient::from_stream(client),
                &ShowcaseConfig::default(),
                &state,
                &ctx,
                &mut library,
                &mut cmd_rx,
            )
            .await
        });

        read_frame(&mut host).await;
        write_frame(&mut host, json!({ "type": "hello_ack", "accepted": false, "reason": "full" })).await;

        let err = task.await.unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("full"));
    }
}
