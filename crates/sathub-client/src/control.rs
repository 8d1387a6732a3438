//! Station control channel.
//!
//! A WebSocket to `/api/stations/{id}/ws` over which the server pushes
//! settings changes and restart requests. Decoded requests are delivered to
//! the main loop as [`ControlMessage`]s.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use sathub_config::ServerSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(5);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(90);

const TYPE_PING: &str = "ping";
const TYPE_PONG: &str = "pong";
const TYPE_SETTINGS_UPDATE: &str = "settings_update";
const TYPE_RESTART_COMMAND: &str = "restart_command";

/// A request from the server for the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// New timing values
    SettingsChanged(ServerSettings),
    /// Exit so the service manager restarts the process
    RestartRequested,
}

/// Wire format of a control frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsMessage {
    /// Message type, e.g. `settings_update`
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Send time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WsMessage {
    fn pong() -> Self {
        Self {
            kind: TYPE_PONG.to_string(),
            payload: Value::Null,
            timestamp: Some(Utc::now()),
        }
    }
}

/// What to do with an incoming text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    /// Send this frame back
    Reply(WsMessage),
    /// Hand this to the main loop
    Deliver(ControlMessage),
    /// Nothing to do
    Ignore,
}

/// Decode one text frame.
pub fn handle_frame(text: &str) -> Result<FrameAction> {
    let message: WsMessage = serde_json::from_str(text).context("Malformed control frame")?;
    debug!("Received control message: {}", message.kind);

    match message.kind.as_str() {
        TYPE_PING => Ok(FrameAction::Reply(WsMessage::pong())),
        TYPE_PONG => Ok(FrameAction::Ignore),
        TYPE_SETTINGS_UPDATE => {
            let settings: ServerSettings = serde_json::from_value(message.payload)
                .context("Failed to parse settings update")?;
            info!(
                health_check_interval = ?settings.health_check_interval,
                process_delay = ?settings.process_delay,
                "Received settings update from server"
            );
            Ok(FrameAction::Deliver(ControlMessage::SettingsChanged(settings)))
        }
        TYPE_RESTART_COMMAND => {
            warn!("Received restart command from server");
            Ok(FrameAction::Deliver(ControlMessage::RestartRequested))
        }
        other => {
            warn!("Unknown control message type: {}", other);
            Ok(FrameAction::Ignore)
        }
    }
}

/// Build the control channel URL from the API base URL.
pub fn websocket_url(api_url: &str, station_id: &str) -> Result<Url> {
    let mut url = Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;

    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => bail!("Unsupported API URL scheme: {}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("Cannot use {} scheme for {}", scheme, api_url))?;

    let path = format!(
        "{}/api/stations/{}/ws",
        url.path().trim_end_matches('/'),
        station_id
    );
    url.set_path(&path);
    Ok(url)
}

type ControlStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reconnecting control channel client.
pub struct ControlChannel {
    url: Url,
    token: String,
    insecure: bool,
    sender: mpsc::Sender<ControlMessage>,
}

impl ControlChannel {
    /// Create a client for the station's control channel.
    pub fn new(
        api_url: &str,
        station_id: &str,
        token: impl Into<String>,
        insecure: bool,
        sender: mpsc::Sender<ControlMessage>,
    ) -> Result<Self> {
        Ok(Self {
            url: websocket_url(api_url, station_id)?,
            token: token.into(),
            insecure,
            sender,
        })
    }

    /// Run the channel on a background task until the receiver is dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut delay = INITIAL_RECONNECT_DELAY;

        while !self.sender.is_closed() {
            match self.connect().await {
                Ok(stream) => {
                    info!("Control channel connected");
                    delay = INITIAL_RECONNECT_DELAY;
                    match self.session(stream).await {
                        Ok(()) => info!("Control channel closed"),
                        Err(e) => warn!("Control channel dropped: {:#}", e),
                    }
                    if self.sender.is_closed() {
                        break;
                    }
                    tokio::time::sleep(INITIAL_RECONNECT_DELAY).await;
                }
                Err(e) => {
                    warn!(
                        "Failed to connect control channel, retrying in {}s: {:#}",
                        delay.as_secs(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }

        debug!("Control channel stopped");
    }

    async fn connect(&self) -> Result<ControlStream> {
        let mut request = self.url.as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Station {}", self.token))
            .context("Invalid station token")?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let connector = if self.insecure {
            Some(Connector::Rustls(Arc::new(insecure_tls_config()?)))
        } else {
            None
        };

        info!("Connecting to control channel at {}", self.url);
        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
                .await
                .context("WebSocket handshake failed")?;
        Ok(stream)
    }

    /// Serve one connection until it closes, goes silent, or the main loop
    /// goes away.
    async fn session(&self, stream: ControlStream) -> Result<()> {
        let (mut write, mut read) = stream.split();
        let mut ping = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
        let mut deadline = Instant::now() + READ_TIMEOUT;

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    write
                        .send(Message::Ping(Default::default()))
                        .await
                        .context("Failed to send ping")?;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    bail!("No traffic for {}s", READ_TIMEOUT.as_secs());
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        return Ok(());
                    };
                    deadline = Instant::now() + READ_TIMEOUT;

                    match frame.context("Failed to read frame")? {
                        Message::Text(text) => match handle_frame(text.as_str()) {
                            Ok(FrameAction::Reply(reply)) => {
                                let json = serde_json::to_string(&reply)?;
                                write.send(Message::Text(json.into())).await?;
                            }
                            Ok(FrameAction::Deliver(message)) => {
                                if self.sender.send(message).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Ok(FrameAction::Ignore) => {}
                            Err(e) => warn!("{:#}", e),
                        },
                        Message::Close(frame) => {
                            debug!("Server closed control channel: {:?}", frame);
                            return Ok(());
                        }
                        // pings are answered by tungstenite
                        _ => {}
                    }
                }
            }
        }
    }
}

fn insecure_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(insecure::AcceptAnyCertificate::new(provider)))
        .with_no_client_auth();
    Ok(config)
}

mod insecure {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};
    use std::sync::Arc;

    /// Accepts any server certificate but still checks handshake signatures.
    #[derive(Debug)]
    pub struct AcceptAnyCertificate(Arc<CryptoProvider>);

    impl AcceptAnyCertificate {
        pub fn new(provider: Arc<CryptoProvider>) -> Self {
            Self(provider)
        }
    }

    impl ServerCertVerifier for AcceptAnyCertificate {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}
