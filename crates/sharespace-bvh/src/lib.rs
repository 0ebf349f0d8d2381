//! sharespace-bvh — BVH motion playback
//!
//! Reads a textual BVH file, keeps its skeleton description as an opaque
//! hierarchy payload and streams the per-frame channel lines to the
//! rendering host at the rate given by the `Frame Time:` header.
//!
//! ```text
//! HIERARCHY            ┐
//! ROOT Hips            │
//! { ... }              │ hierarchy payload (sent once)
//! MOTION               │
//! Frames: 2            │
//! Frame Time: 0.033333 ┘
//! 0 0 0                ┐ frame lines (one per tick, looping)
//! 1 1 1                ┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use sharespace_bvh::{MotionClip, MotionPlayer};
//!
//! async fn play() -> Result<(), sharespace_core::ShowcaseError> {
//!     let clip = MotionClip::load("./bvh/recording_0_3d.bvh").await?;
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//!     let mut player = MotionPlayer::new(clip, tx);
//!     player.start().await?;
//!     while let Some(msg) = rx.recv().await {
//!         println!("{}", msg.label());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cursor;
pub mod parser;
pub mod player;

pub use cursor::FrameCursor;
pub use parser::{MotionClip, MOTION_SENTINEL};
pub use player::{MotionPlayer, PlayerState};
