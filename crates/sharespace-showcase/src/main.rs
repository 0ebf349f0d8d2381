mod app;
mod controller;
mod session;
mod state;

use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use sharespace_core::ShowcaseConfig;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use controller::Example;
use session::SessionCommand;
use state::GuiState;

/// How long to wait for the session thread to say goodbye to the host.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    // ── Config ────────────────────────────────────────────────────────────
    let mut config = ShowcaseConfig::from_env()?;
    if config.device_name == ShowcaseConfig::default().device_name {
        if let Ok(host) = hostname::get() {
            config.device_name = format!("Sharespace Showcase ({})", host.to_string_lossy());
        }
    }
    info!(
        "Sharespace Showcase v{} → {}:{} (BVH dir {})",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port,
        config.bvh_dir.display()
    );

    let initial_example = std::env::args()
        .nth(1)
        .and_then(|name| {
            let example = Example::from_name(&name);
            if example.is_none() {
                warn!("Unknown example {:?}; starting with {}", name, Example::default().name());
            }
            example
        })
        .unwrap_or_default();

    // ── Shared state ──────────────────────────────────────────────────────
    let shared_state: state::SharedState = Arc::new(Mutex::new(GuiState::default()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(64);
    let (done_tx, done_rx) = std_mpsc::channel::<()>();

    // ── Window options ────────────────────────────────────────────────────
    let window_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Sharespace Showcase")
            .with_inner_size([960.0, 680.0])
            .with_min_inner_size([640.0, 480.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Sharespace Showcase",
        window_options,
        Box::new(move |cc| {
            let state_bg = Arc::clone(&shared_state);
            let ctx_bg   = cc.egui_ctx.clone();

            // The session runs on its own OS thread with a tokio runtime,
            // off the egui main thread.
            std::thread::Builder::new()
                .name("sharespace-session".into())
                .spawn(move || {
                    let rt = match tokio::runtime::Builder::new_multi_thread()
                        .worker_threads(2)
                        .enable_all()
                        .build()
                    {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to build tokio runtime: {}", e);
                            return;
                        }
                    };

                    rt.block_on(session::run(config, state_bg, ctx_bg, cmd_rx));
                    let _ = done_tx.send(());
                })?;

            // Closing the window drops the app, which shuts the session down.
            Ok(Box::new(app::ShowcaseApp::new(cc, shared_state, cmd_tx, initial_example)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe: {e}"))?;

    if done_rx.recv_timeout(SHUTDOWN_GRACE).is_err() {
        warn!("Session did not finish within {}s; exiting", SHUTDOWN_GRACE.as_secs());
    }
    Ok(())
}
