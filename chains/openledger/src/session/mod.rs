//! Persistent orchestrator session for one account.
//!
//! ```text
//! Disconnected -> Connecting -> Registered -> Heartbeating -> Closing -> Disconnected
//!                     |                                                      |
//!                     +-- dial failure: short retries, then a long pause     +-- backoff, reconnect
//! ```
//!
//! The read loop and the heartbeat ticker share the connection through a
//! writer task: the socket is split, the read half stays in the loop and all
//! outbound frames go through one bounded channel into the write half.

pub mod protocol;

use crate::account::Account;
use crate::config::OpenLedgerConfig;
use crate::error::{BotError, BotResult};
use crate::tasks::{ErrorSink, Stage};
use crate::token::{TokenCell, ACCEPT_LANGUAGE_VALUE};
use core_logic::{ReconnectBackoff, TunnelDialer, BOT_TARGET};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::{EnvelopeFactory, InboundMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const OUTBOUND_BUFFER: usize = 16;
const WRITER_CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Registered,
    Heartbeating,
    Closing,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Endpoint without the `authToken` query
    pub ws_url: String,
    pub extension_id: String,
    pub user_agent: String,
    pub heartbeat_every: Duration,
    pub handshake_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub dial_retries: u32,
    pub dial_retry_step: Duration,
    pub dial_failure_pause: Duration,
    pub register_failure_pause: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &OpenLedgerConfig) -> Self {
        let session = &config.session;
        Self {
            ws_url: config.ws_url.clone(),
            extension_id: config.extension_id.clone(),
            user_agent: config.user_agent.clone(),
            heartbeat_every: config.intervals.heartbeat(),
            handshake_timeout: Duration::from_secs(session.handshake_timeout_secs),
            initial_backoff: Duration::from_secs(session.initial_backoff_secs),
            max_backoff: Duration::from_secs(session.max_backoff_secs),
            dial_retries: session.dial_retries,
            dial_retry_step: Duration::from_secs(session.dial_retry_step_secs),
            dial_failure_pause: Duration::from_secs(session.dial_failure_pause_secs),
            register_failure_pause: Duration::from_secs(session.register_failure_pause_secs),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub connections: u64,
    pub jobs: u64,
}

/// How one connected session ended.
enum SessionEnd {
    Cancelled,
    Closed,
    Failed(BotError),
}

pub struct SessionManager {
    account: Account,
    proxy_label: String,
    dialer: TunnelDialer,
    tokens: TokenCell,
    settings: SessionSettings,
    errors: ErrorSink,
    envelopes: EnvelopeFactory,
    state: SessionState,
    stats: SessionStats,
}

impl SessionManager {
    pub fn new(
        account: Account,
        proxy_label: String,
        dialer: TunnelDialer,
        tokens: TokenCell,
        settings: SessionSettings,
        errors: ErrorSink,
    ) -> Self {
        let envelopes = EnvelopeFactory::new(&account, &settings.extension_id);
        Self {
            account,
            proxy_label,
            dialer,
            tokens,
            settings,
            errors,
            envelopes,
            state: SessionState::Disconnected,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Keeps a session alive until `cancel` fires.
    ///
    /// The reconnect delay doubles up to the cap and is not reset after a
    /// long-lived connection.
    pub async fn run(mut self, cancel: CancellationToken) -> SessionStats {
        let mut backoff = ReconnectBackoff::new(self.settings.initial_backoff, self.settings.max_backoff);
        let mut dial_failures: u32 = 0;

        while !cancel.is_cancelled() {
            self.set_state(SessionState::Connecting);

            let mut ws = match self.connect().await {
                Ok(ws) => {
                    dial_failures = 0;
                    ws
                }
                Err(e) => {
                    self.set_state(SessionState::Disconnected);
                    self.errors.report(Stage::Session, e).await;
                    let pause = if dial_failures < self.settings.dial_retries {
                        dial_failures += 1;
                        self.settings.dial_retry_step * dial_failures
                    } else {
                        dial_failures = 0;
                        self.settings.dial_failure_pause
                    };
                    if !pause_or_cancel(&cancel, pause).await {
                        break;
                    }
                    continue;
                }
            };

            self.stats.connections += 1;
            self.log_status("WebSocket Is Connected");

            if let Err(e) = self.register(&mut ws).await {
                let _ = ws.close(None).await;
                self.set_state(SessionState::Disconnected);
                self.errors.report(Stage::Session, e).await;
                if !pause_or_cancel(&cancel, self.settings.register_failure_pause).await {
                    break;
                }
                continue;
            }
            self.set_state(SessionState::Registered);

            if let SessionEnd::Failed(e) = self.drive(ws, &cancel).await {
                self.errors.report(Stage::Session, e).await;
            }
            self.set_state(SessionState::Disconnected);
            self.log_status("WebSocket Connection Closed");

            if cancel.is_cancelled() {
                break;
            }
            let delay = backoff.next_delay();
            debug!("Reconnecting WebSocket in {:?}", delay);
            if !pause_or_cancel(&cancel, delay).await {
                break;
            }
        }

        self.set_state(SessionState::Disconnected);
        self.stats
    }

    async fn connect(&self) -> BotResult<WsStream> {
        let token = self.tokens.get().await;
        let mut url = Url::parse(&self.settings.ws_url).map_err(|e| {
            BotError::Protocol(format!("invalid WebSocket URL {}: {}", self.settings.ws_url, e))
        })?;
        url.query_pairs_mut().append_pair("authToken", &token);

        let host = url
            .host_str()
            .ok_or_else(|| BotError::Protocol("WebSocket URL has no host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| BotError::Protocol("WebSocket URL has no port".to_string()))?;

        let stream = self.dialer.connect(&host, port).await?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| BotError::Protocol(format!("invalid upgrade request: {}", e)))?;
        let headers = request.headers_mut();
        headers.insert(header::ORIGIN, header_value(&self.settings.extension_id)?);
        headers.insert(header::USER_AGENT, header_value(&self.settings.user_agent)?);
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
        );

        let (ws, _response) = timeout(
            self.settings.handshake_timeout,
            client_async_tls_with_config(request, stream, None, None),
        )
        .await
        .map_err(|_| {
            BotError::Transport(format!(
                "WebSocket handshake timed out after {}s",
                self.settings.handshake_timeout.as_secs()
            ))
        })?
        .map_err(|e| BotError::transport("failed to connect websocket", e))?;

        Ok(ws)
    }

    async fn register(&self, ws: &mut WsStream) -> BotResult<()> {
        let frame = serde_json::to_string(&self.envelopes.register())?;
        ws.send(Message::Text(frame))
            .await
            .map_err(|e| BotError::transport("register message failed", e))
    }

    /// Runs one registered connection to its end and tears it down.
    async fn drive(&mut self, ws: WsStream, cancel: &CancellationToken) -> SessionEnd {
        let (sink, mut stream) = ws.split();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let mut writer = tokio::spawn(write_frames(sink, out_rx));

        let stop_heartbeat = cancel.child_token();
        let heartbeat = tokio::spawn(heartbeat_loop(
            out_tx.clone(),
            self.envelopes.clone(),
            self.settings.heartbeat_every,
            stop_heartbeat.clone(),
            self.errors.clone(),
            self.account.masked().to_string(),
        ));
        self.set_state(SessionState::Heartbeating);

        let end = self.read_loop(&mut stream, &out_tx, cancel).await;

        self.set_state(SessionState::Closing);
        stop_heartbeat.cancel();
        let _ = heartbeat.await;
        drop(out_tx);
        if timeout(WRITER_CLOSE_GRACE, &mut writer).await.is_err() {
            writer.abort();
        }
        end
    }

    async fn read_loop(
        &mut self,
        stream: &mut SplitStream<WsStream>,
        out: &mpsc::Sender<Message>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                frame = stream.next() => frame,
            };

            let text = match frame {
                None => return SessionEnd::Closed,
                Some(Err(e)) => {
                    return SessionEnd::Failed(BotError::Protocol(format!(
                        "websocket read error: {}",
                        e
                    )))
                }
                Some(Ok(Message::Close(frame))) => return classify_close(frame),
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                Some(Ok(_)) => continue,
            };

            if let Err(e) = self.handle_text(&text, out).await {
                return SessionEnd::Failed(e);
            }
        }
    }

    async fn handle_text(&mut self, text: &str, out: &mpsc::Sender<Message>) -> BotResult<()> {
        let masked = self.account.masked();
        let message = match text.parse::<InboundMessage>() {
            Ok(message) => message,
            Err(e) => {
                warn!(target: BOT_TARGET, "Account {} - Failed to parse message: {}", masked, e);
                return Ok(());
            }
        };

        match message {
            InboundMessage::RegisterAck => {
                info!(target: BOT_TARGET, "Account {} - WebSocket registered successfully", masked);
            }
            InboundMessage::HeartbeatAck { acknowledged } => {
                if acknowledged {
                    info!(target: BOT_TARGET, "Account {} - Heartbeat acknowledged", masked);
                }
            }
            InboundMessage::Job { reference } => {
                let reply = serde_json::to_string(&self.envelopes.job_assigned(reference))?;
                out.send(Message::Text(reply)).await.map_err(|_| {
                    BotError::Transport("failed to send job response: writer closed".to_string())
                })?;
                self.stats.jobs += 1;
                info!(target: BOT_TARGET, "Account {} - Job assigned", masked);
            }
            InboundMessage::Response | InboundMessage::Untyped => {}
            InboundMessage::Unknown(kind) => {
                warn!(target: BOT_TARGET, "Account {} - Unknown message type: {}", masked, kind);
            }
        }
        Ok(())
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn log_status(&self, status: &str) {
        info!(
            target: BOT_TARGET,
            "Account: {} - Proxy: {} - Worker ID: {} - Status: {}",
            self.account.masked(),
            self.proxy_label,
            self.account.identity().masked(),
            status
        );
    }
}

fn header_value(value: &str) -> BotResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| BotError::Protocol(format!("invalid header value '{}': {}", value, e)))
}

/// Normal and going-away closes end the session quietly; anything else is
/// reported.
fn classify_close(frame: Option<CloseFrame<'static>>) -> SessionEnd {
    match frame {
        None => SessionEnd::Closed,
        Some(frame) if matches!(frame.code, CloseCode::Normal | CloseCode::Away) => {
            SessionEnd::Closed
        }
        Some(frame) => SessionEnd::Failed(BotError::Protocol(format!(
            "websocket closed with code {}: {}",
            u16::from(frame.code),
            frame.reason
        ))),
    }
}

async fn pause_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

async fn write_frames(mut sink: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send(frame).await {
            debug!("WebSocket write failed: {}", e);
            return;
        }
    }
    let _ = sink.close().await;
}

async fn heartbeat_loop(
    out: mpsc::Sender<Message>,
    envelopes: EnvelopeFactory,
    every: Duration,
    stop: CancellationToken,
    errors: ErrorSink,
    masked: String,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let frame = match serde_json::to_string(&envelopes.heartbeat()) {
            Ok(frame) => frame,
            Err(e) => {
                errors.report(Stage::Session, e.into()).await;
                return;
            }
        };
        if out.send(Message::Text(frame)).await.is_err() {
            if !stop.is_cancelled() {
                errors
                    .report(
                        Stage::Session,
                        BotError::Transport("heartbeat message failed: writer closed".to_string()),
                    )
                    .await;
            }
            return;
        }
        debug!(target: BOT_TARGET, "Account {} - Heartbeat sent", masked);
    }
}
