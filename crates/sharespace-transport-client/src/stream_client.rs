//! TLS TCP message client (showcase → rendering host).
//!
//! # Lifecycle
//!
//! ```text
//! 1. StreamClient::connect(host, port)
//! 2. client.send_hello(session_id, device_name)
//!       └─ returns HelloAck { accepted, reason }
//! 3. let (writer, responses) = client.start_recv_loop()
//!       ├─ writer: StreamWriter for ui_interaction / command / keepalive / stop
//!       └─ responses: channel of response strings from the host
//! 4. writer.emit(&msg)                  ← any number of times
//! 5. writer.send_keepalive(timestamp_ms) ← every keepalive_secs
//! 6. writer.send_stop(session_id)
//! ```
//!
//! Every frame is a 4-byte big-endian length followed by a JSON object.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sharespace_core::{OutboundMessage, TransportError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::MAX_MESSAGE_BYTES;

pub type TlsClientStream = tokio_rustls::client::TlsStream<TcpStream>;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MessageType {
    Hello,
    HelloAck,
    UiInteraction,
    Command,
    Keepalive,
    Response,
    Stop,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct WireMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<MessageType>,
    #[serde(rename = "sessionID", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "deviceName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(rename = "timestampMs", skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl WireMessage {
    fn of(msg_type: MessageType) -> Self {
        Self { msg_type: Some(msg_type), ..Default::default() }
    }

    pub(crate) fn hello(session_id: &str, device_name: &str) -> Self {
        Self {
            session_id: Some(session_id.to_owned()),
            device_name: Some(device_name.to_owned()),
            ..Self::of(MessageType::Hello)
        }
    }

    pub(crate) fn outbound(msg: &OutboundMessage) -> Self {
        let msg_type = match msg {
            OutboundMessage::UiInteraction(_) => MessageType::UiInteraction,
            OutboundMessage::Command(_) | OutboundMessage::ConsoleCommand(_) => MessageType::Command,
        };
        Self { descriptor: Some(msg.descriptor()), ..Self::of(msg_type) }
    }

    pub(crate) fn keepalive(timestamp_ms: u64) -> Self {
        Self { timestamp_ms: Some(timestamp_ms), ..Self::of(MessageType::Keepalive) }
    }

    pub(crate) fn stop(session_id: &str) -> Self {
        Self { session_id: Some(session_id.to_owned()), ..Self::of(MessageType::Stop) }
    }
}

// ── Length-prefixed framing ───────────────────────────────────────────────────

pub(crate) async fn write_msg(
    stream: &mut (impl AsyncWrite + Unpin),
    msg: &WireMessage,
) -> anyhow::Result<()> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_BYTES {
        return Err(TransportError::MessageTooLarge { len: json.len() }.into());
    }
    let len = json.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&json).await?;
    stream.flush().await?;
    debug!("Sent {:?} ({} bytes)", msg.msg_type, json.len());
    Ok(())
}

pub(crate) async fn read_msg(stream: &mut (impl AsyncRead + Unpin)) -> anyhow::Result<WireMessage> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.context("reading message length")?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(TransportError::MessageTooLarge { len }.into());
    }
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.context("reading message body")?;
    let msg: WireMessage = serde_json::from_slice(&body).context("parsing host message")?;
    debug!("Received {:?} ({} bytes)", msg.msg_type, len);
    Ok(msg)
}

// ── TOFU certificate verifier (accepts any self-signed cert) ─────────────────

#[derive(Debug)]
struct TofuCertVerifier;

impl rustls::client::danger::ServerCertVerifier for TofuCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        // Render hosts run with self-signed certificates.
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &rustls::pki_types::CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

// ── Public result types ───────────────────────────────────────────────────────

/// Result of the `hello` / `hello_ack` handshake.
#[derive(Debug, Clone)]
pub struct HelloAck {
    pub accepted: bool,
    pub reason: Option<String>,
    pub session_id: Option<String>,
}

// ── StreamClient ──────────────────────────────────────────────────────────────

/// Connection to the rendering host's message endpoint.
///
/// Use [`StreamClient::connect`] for the TLS connection, then
/// [`send_hello`](StreamClient::send_hello). Once accepted, call
/// [`start_recv_loop`](StreamClient::start_recv_loop) to obtain a
/// [`StreamWriter`] and the host-response channel.
pub struct StreamClient<S = TlsClientStream> {
    stream: S,
}

impl StreamClient<TlsClientStream> {
    /// Open a TLS connection to `host:port`.
    pub async fn connect(host: &str, port: u16) -> anyhow::Result<Self> {
        // Install ring crypto provider (ignored if already installed)
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client_config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(TofuCertVerifier))
            .with_no_client_auth();

        let connector = tokio_rustls::TlsConnector::from(Arc::new(client_config));

        let tcp = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("TCP connect to {}:{}", host, port))?;
        tcp.set_nodelay(true)?;

        let server_name: rustls::pki_types::ServerName =
            if let Ok(ip) = host.parse::<std::net::IpAddr>() {
                rustls::pki_types::ServerName::IpAddress(ip.into())
            } else {
                rustls::pki_types::ServerName::try_from(host.to_owned())
                    .map_err(|_| anyhow::anyhow!("Invalid hostname: {}", host))?
            };

        let tls = connector
            .connect(server_name, tcp)
            .await
            .with_context(|| format!("TLS handshake with {}:{}", host, port))?;

        info!("Connected to rendering host {}:{}", host, port);
        Ok(Self { stream: tls })
    }
}

impl<S> StreamClient<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap an already established stream.
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    /// Send `hello` and wait for `hello_ack`.
    pub async fn send_hello(&mut self, session_id: &str, device_name: &str) -> anyhow::Result<HelloAck> {
        write_msg(&mut self.stream, &WireMessage::hello(session_id, device_name)).await?;
        info!("Sent hello (session={})", session_id);

        loop {
            let reply = read_msg(&mut self.stream).await?;
            match reply.msg_type {
                Some(MessageType::HelloAck) => {
                    let accepted = reply.accepted.unwrap_or(false);
                    if accepted {
                        info!("hello_ack: session accepted (id={:?})", reply.session_id);
                    } else {
                        warn!("hello_ack: session rejected: {:?}", reply.reason);
                    }
                    return Ok(HelloAck { accepted, reason: reply.reason, session_id: reply.session_id });
                }
                other => {
                    debug!("Ignoring {:?} while waiting for hello_ack", other);
                }
            }
        }
    }

    /// Consume this client, spawning a background receive task.
    ///
    /// Returns:
    /// - [`StreamWriter`] for outbound messages
    /// - `Receiver<String>` of `response` payloads sent by the host
    pub fn start_recv_loop(self) -> (StreamWriter<S>, mpsc::Receiver<String>) {
        let (response_tx, response_rx) = mpsc::channel::<String>(64);
        let (read_half, write_half) = tokio::io::split(self.stream);

        tokio::spawn(recv_loop(read_half, response_tx));

        (StreamWriter { writer: write_half }, response_rx)
    }
}

// ── Background receive loop ───────────────────────────────────────────────────

async fn recv_loop<S: AsyncRead>(mut reader: ReadHalf<S>, response_tx: mpsc::Sender<String>) {
    loop {
        match read_msg(&mut reader).await {
            Ok(msg) => match msg.msg_type {
                Some(MessageType::Response) => {
                    let text = msg.response.unwrap_or_default();
                    if response_tx.send(text).await.is_err() {
                        debug!("Response channel closed; stopping recv loop");
                        return;
                    }
                }
                Some(MessageType::Stop) => {
                    info!("Host ended the session");
                    return;
                }
                other => {
                    debug!("Recv loop: ignoring {:?}", other);
                }
            },
            Err(e) => {
                warn!("Host receive error: {:#}", e);
                return;
            }
        }
    }
}

// ── StreamWriter ──────────────────────────────────────────────────────────────

/// Write-only handle returned by [`StreamClient::start_recv_loop`].
///
/// Not `Clone` — only one writer at a time.
pub struct StreamWriter<S = TlsClientStream> {
    writer: WriteHalf<S>,
}

impl<S: AsyncWrite> StreamWriter<S> {
    /// Deliver one showcase message to the host.
    pub async fn emit(&mut self, msg: &OutboundMessage) -> anyhow::Result<()> {
        write_msg(&mut self.writer, &WireMessage::outbound(msg)).await
    }

    pub async fn send_keepalive(&mut self, timestamp_ms: u64) -> anyhow::Result<()> {
        write_msg(&mut self.writer, &WireMessage::keepalive(timestamp_ms)).await
    }

    /// Gracefully end the session.
    pub async fn send_stop(&mut self, session_id: &str) -> anyhow::Result<()> {
        write_msg(&mut self.writer, &WireMessage::stop(session_id)).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
