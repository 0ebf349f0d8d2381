//! sharespace-transport-client
//!
//! Sender-side link to the rendering host. Plays the part of the streaming
//! client for the showcase: it opens a session and delivers UI interactions,
//! commands and console commands; it does not carry media.
//!
//! # Architecture
//!
//! ```text
//! Showcase (this crate)                 Rendering host
//! ─────────────────────────────         ─────────────────────────────
//! StreamClient ─── TLS:8888 ─────────►  message endpoint
//!   hello / hello_ack
//!   StreamWriter: ui_interaction, command, keepalive, stop
//!   recv loop    ◄── response
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sharespace_core::OutboundMessage;
//! use sharespace_transport_client::StreamClient;
//!
//! async fn demo() -> anyhow::Result<()> {
//!     let mut client = StreamClient::connect("192.168.1.100", 8888).await?;
//!     let ack = client.send_hello("session-1", "Showcase").await?;
//!     assert!(ack.accepted);
//!
//!     let (mut writer, _responses) = client.start_recv_loop();
//!     writer.emit(&OutboundMessage::console("stat fps")).await?;
//!     writer.send_stop("session-1").await
//! }
//! ```

pub mod stream_client;

pub use stream_client::{HelloAck, StreamClient, StreamWriter, TlsClientStream};

/// Default port of the host's message endpoint.
pub const DEFAULT_PORT: u16 = 8888;

/// Largest frame either side accepts.
pub const MAX_MESSAGE_BYTES: usize = 1_048_576;
