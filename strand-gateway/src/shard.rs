use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use strand_model::{
    gateway::{
        payload::{Heartbeat, Hello, Identify, IdentifyInfo, IdentifyProperties, Ready},
        GatewayEnvelope,
    },
    CloseCode, OpCode,
};
use tokio::{
    net::TcpStream,
    sync::watch,
    time::{interval_at, sleep, timeout, Instant, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode as WsCloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::{
    codec::{self, Decoded, Inflater},
    config::Config,
    queue::IdentifyQueue,
    session::{Latency, Session},
    EventRouter, ShardError,
};

const GATEWAY_VERSION: u8 = 10;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShardState {
    Disconnected,
    Connecting,
    Identifying,
    Resuming,
    Ready,
    /// Configuration-level failure; the shard will not come back.
    FatallyClosed,
}

/// What a remote close means for the reconnect that follows.
#[derive(Debug)]
pub(crate) enum CloseIntent {
    Resume,
    Identify,
    Fatal(CloseCode),
}

pub(crate) fn close_intent(code: Option<u16>) -> CloseIntent {
    match code.and_then(CloseCode::from_u16) {
        Some(code) if code.is_fatal() => CloseIntent::Fatal(code),
        Some(code) if code.session_survives() => CloseIntent::Resume,
        Some(_) => CloseIntent::Identify,
        // plain transport closes (normal, going away, no code) are network
        // blips; the session stays resumable
        None => CloseIntent::Resume,
    }
}

pub(crate) fn reconnect_backoff(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exponential = base.saturating_mul(2_u32.saturating_pow(attempt.min(16)));
    let capped = exponential.min(cap);
    let jitter = capped.mul_f64(rand::thread_rng().gen_range(0.0..0.25));

    capped + jitter
}

/// How one connection ended.
enum Outcome {
    /// Remote asked for a reconnect; retry immediately.
    Reconnect { keep_session: bool },
    /// Connection failed or died; retry with backoff.
    Retry { keep_session: bool },
    Fatal(CloseCode),
}

enum Flow {
    Continue,
    Exit(Outcome),
}

/// One persistent connection covering a slice of the event stream.
///
/// Owns the socket and drives identify/resume/heartbeat; decoded dispatch
/// frames go to the shared router. Connectivity loss is retried with capped
/// exponential backoff indefinitely; only configuration-level close codes
/// end the shard.
pub struct Shard {
    id: u32,
    total: u32,
    gateway_url: Box<str>,
    config: Arc<Config>,
    router: Arc<EventRouter>,
    queue: Arc<IdentifyQueue>,
    states: Arc<DashMap<u32, ShardState>>,
    shutdown: watch::Receiver<bool>,
    session: Option<Session>,
    latency: Latency,
}

impl Shard {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u32,
        total: u32,
        gateway_url: Box<str>,
        config: Arc<Config>,
        router: Arc<EventRouter>,
        queue: Arc<IdentifyQueue>,
        states: Arc<DashMap<u32, ShardState>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            total,
            gateway_url,
            config,
            router,
            queue,
            states,
            shutdown,
            session: None,
            latency: Latency::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Drive the shard until shutdown or a fatal error.
    pub async fn run(mut self) -> Result<(), ShardError> {
        let mut shutdown = self.shutdown.clone();
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                self.set_state(ShardState::Disconnected);

                return Ok(());
            }

            self.set_state(ShardState::Connecting);
            self.router.handler().shard_connecting(self.id).await;

            let outcome = tokio::select! {
                outcome = self.connect_and_drive() => outcome,
                _ = shutdown.changed() => {
                    self.set_state(ShardState::Disconnected);
                    self.router.handler().shard_disconnected(self.id).await;

                    return Ok(());
                }
            };

            self.set_state(ShardState::Disconnected);
            self.router.handler().shard_disconnected(self.id).await;

            match outcome {
                Outcome::Fatal(code) => {
                    self.set_state(ShardState::FatallyClosed);
                    error!(shard = self.id, %code, "Shard closed fatally");

                    return Err(ShardError::FatallyClosed { code });
                }
                Outcome::Reconnect { keep_session } => {
                    if !keep_session {
                        self.invalidate_session().await;
                    }

                    attempt = 0;
                }
                Outcome::Retry { keep_session } => {
                    if !keep_session {
                        self.invalidate_session().await;
                    }

                    let backoff = reconnect_backoff(
                        self.config.backoff_base,
                        self.config.backoff_cap,
                        attempt,
                    );
                    attempt = attempt.saturating_add(1);

                    info!(shard = self.id, attempt, ?backoff, "Reconnecting after backoff");

                    tokio::select! {
                        _ = sleep(backoff) => {}
                        _ = shutdown.changed() => {
                            self.set_state(ShardState::Disconnected);

                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// One full connection: transport, hello, identify/resume, drive loop.
    async fn connect_and_drive(&mut self) -> Outcome {
        let url = self.connect_url();
        debug!(shard = self.id, url = %url, "Connecting");

        let connecting = timeout(self.config.handshake_timeout, connect_async(url.as_str()));

        let mut socket = match connecting.await {
            Ok(Ok((socket, _))) => socket,
            Ok(Err(err)) => {
                warn!(shard = self.id, %err, "Failed to connect");

                return Outcome::Retry { keep_session: true };
            }
            Err(_) => {
                warn!(shard = self.id, "Connect did not complete in time");

                return Outcome::Retry { keep_session: true };
            }
        };

        let mut inflater = self.config.compression.then(Inflater::new);

        let hello = match timeout(
            self.config.handshake_timeout,
            await_hello(&mut socket, &mut inflater),
        )
        .await
        {
            Ok(Some(hello)) => hello,
            Ok(None) => {
                warn!(shard = self.id, "Connection ended before hello");

                return Outcome::Retry { keep_session: true };
            }
            Err(_) => {
                warn!(shard = self.id, "No hello within the handshake window");

                return Outcome::Retry { keep_session: true };
            }
        };

        let heartbeat_interval = Duration::from_millis(hello.heartbeat_interval);

        // the first beat is jittered so shards do not align their timers
        let first_beat = heartbeat_interval.mul_f64(rand::thread_rng().gen::<f64>());
        let mut heartbeat = interval_at(Instant::now() + first_beat, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.latency = Latency::new();

        if let Some(ref session) = self.session {
            // a held session resumes without consuming an identify slot
            self.set_state(ShardState::Resuming);
            debug!(shard = self.id, seq = session.seq, "Resuming session");

            let payload = codec::encode(&session.resume_payload(&self.config.token));

            if socket.send(payload).await.is_err() {
                return Outcome::Retry { keep_session: true };
            }
        } else {
            self.queue.acquire().await;
            self.set_state(ShardState::Identifying);
            info!(shard = self.id, "Identifying");

            let payload = codec::encode(&self.identify());

            if socket.send(payload).await.is_err() {
                return Outcome::Retry { keep_session: true };
            }
        }

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if !self.latency.acked() {
                        warn!(shard = self.id, "Heartbeat was never acknowledged, closing");

                        let frame = CloseFrame {
                            code: WsCloseCode::Library(4000),
                            reason: "heartbeat ack missed".into(),
                        };
                        let _ = socket.send(Message::Close(Some(frame))).await;

                        return Outcome::Retry { keep_session: true };
                    }

                    let seq = self.session.as_ref().map(|session| session.seq);

                    if socket.send(codec::encode(&Heartbeat::new(seq))).await.is_err() {
                        return Outcome::Retry { keep_session: true };
                    }

                    self.latency.record_sent();
                }
                frame = socket.next() => {
                    let Some(frame) = frame else {
                        debug!(shard = self.id, "Stream ended");

                        return Outcome::Retry { keep_session: true };
                    };

                    let message = match frame {
                        Ok(message) => message,
                        Err(err) => {
                            warn!(shard = self.id, %err, "Stream errored");

                            return Outcome::Retry { keep_session: true };
                        }
                    };

                    match codec::decode(message, inflater.as_mut()) {
                        Ok(Decoded::Payload(text)) => match self.process(&text, &mut socket).await {
                            Flow::Continue => {}
                            Flow::Exit(outcome) => return outcome,
                        },
                        Ok(Decoded::Close(code)) => {
                            debug!(shard = self.id, ?code, "Remote closed the connection");

                            match close_intent(code) {
                                CloseIntent::Fatal(code) => return Outcome::Fatal(code),
                                CloseIntent::Resume => {
                                    return Outcome::Retry { keep_session: true }
                                }
                                CloseIntent::Identify => {
                                    return Outcome::Retry { keep_session: false }
                                }
                            }
                        }
                        Ok(Decoded::Nothing) => {}
                        Err(err) => {
                            // isolated to this frame; the connection stays up
                            warn!(shard = self.id, %err, "Dropping undecodable frame");
                        }
                    }
                }
            }
        }
    }

    /// Handle one decoded payload.
    async fn process(&mut self, text: &str, socket: &mut Socket) -> Flow {
        let envelope: GatewayEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(shard = self.id, %err, "Dropping malformed frame");

                return Flow::Continue;
            }
        };

        match envelope.op {
            OpCode::Dispatch => {
                // sequence advances before routing, unconditionally; a
                // failed event must not cost resumability
                if let (Some(seq), Some(session)) = (envelope.s, self.session.as_mut()) {
                    session.seq = seq;
                }

                let Some(tag) = envelope.t.as_deref() else {
                    return Flow::Continue;
                };

                match tag {
                    "READY" => self.process_ready(&envelope).await,
                    "RESUMED" => {
                        self.set_state(ShardState::Ready);
                        info!(shard = self.id, "Shard resumed");

                        self.router.route(self.id, tag, envelope.d.as_deref()).await;
                        self.router.handler().shard_resumed(self.id).await;
                    }
                    _ => self.router.route(self.id, tag, envelope.d.as_deref()).await,
                }

                Flow::Continue
            }
            OpCode::Heartbeat => {
                // the remote may request an immediate beat
                let seq = self.session.as_ref().map(|session| session.seq);

                if socket.send(codec::encode(&Heartbeat::new(seq))).await.is_err() {
                    return Flow::Exit(Outcome::Retry { keep_session: true });
                }

                Flow::Continue
            }
            OpCode::HeartbeatAck => {
                self.latency.record_ack();

                if let Some(rtt) = self.latency.recent() {
                    trace!(shard = self.id, ?rtt, "Heartbeat acknowledged");
                }

                Flow::Continue
            }
            OpCode::Reconnect => {
                debug!(shard = self.id, "Remote requested a reconnect");

                Flow::Exit(Outcome::Reconnect { keep_session: true })
            }
            OpCode::InvalidSession => {
                let resumable = envelope
                    .d
                    .as_deref()
                    .and_then(|d| serde_json::from_str(d.get()).ok())
                    .unwrap_or(false);

                warn!(shard = self.id, resumable, "Session invalidated by remote");

                Flow::Exit(Outcome::Retry {
                    keep_session: resumable,
                })
            }
            // hello is consumed during the handshake; repeats are noise
            OpCode::Hello => Flow::Continue,
            other => {
                debug!(shard = self.id, op = other.as_u8(), "Unexpected op, ignoring");

                Flow::Continue
            }
        }
    }

    async fn process_ready(&mut self, envelope: &GatewayEnvelope) {
        let ready = envelope
            .d
            .as_deref()
            .map(|d| serde_json::from_str::<Ready>(d.get()));

        match ready {
            Some(Ok(ready)) => {
                let mut session = Session::new(
                    ready.session_id.clone(),
                    ready.resume_gateway_url.clone(),
                );
                session.seq = envelope.s.unwrap_or_default();
                self.session = Some(session);

                self.set_state(ShardState::Ready);
                info!(
                    shard = self.id,
                    guilds = ready.guilds.len(),
                    "Shard ready to go"
                );

                self.router
                    .route(self.id, "READY", envelope.d.as_deref())
                    .await;
                self.router.handler().shard_ready(self.id).await;
            }
            _ => warn!(shard = self.id, "Ready payload failed to deserialize"),
        }
    }

    /// Drop the session and wipe this shard's slice of the cache.
    async fn invalidate_session(&mut self) {
        if self.session.take().is_some() {
            self.router.cache().clear_shard(self.id, self.total);
            self.router.handler().session_invalidated(self.id).await;
        }
    }

    fn identify(&self) -> Identify {
        Identify::new(IdentifyInfo {
            token: self.config.token.to_string(),
            shard: [self.id, self.total],
            intents: self.config.intents,
            properties: IdentifyProperties::default(),
            presence: self.config.presence.clone(),
            compress: false,
            large_threshold: self.config.large_threshold,
        })
    }

    fn connect_url(&self) -> String {
        let base = self
            .session
            .as_ref()
            .map(|session| &*session.resume_gateway_url)
            .unwrap_or(&*self.gateway_url);

        let mut url = format!("{base}/?v={GATEWAY_VERSION}&encoding=json");

        if self.config.compression {
            url.push_str("&compress=zlib-stream");
        }

        url
    }

    fn set_state(&self, state: ShardState) {
        self.states.insert(self.id, state);
    }
}

async fn await_hello(socket: &mut Socket, inflater: &mut Option<Inflater>) -> Option<Hello> {
    loop {
        let message = match socket.next().await? {
            Ok(message) => message,
            Err(_) => return None,
        };

        match codec::decode(message, inflater.as_mut()) {
            Ok(Decoded::Payload(text)) => {
                let Ok(envelope) = serde_json::from_str::<GatewayEnvelope>(&text) else {
                    continue;
                };

                if envelope.op != OpCode::Hello {
                    // anything before hello is a violation; drop it
                    continue;
                }

                return envelope
                    .d
                    .as_deref()
                    .and_then(|d| serde_json::from_str(d.get()).ok());
            }
            Ok(Decoded::Close(_)) | Err(_) => return None,
            Ok(Decoded::Nothing) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{close_intent, reconnect_backoff, CloseIntent};

    #[test]
    fn disallowed_intents_close_is_fatal() {
        assert!(matches!(close_intent(Some(4014)), CloseIntent::Fatal(_)));
    }

    #[test]
    fn network_blip_resumes() {
        assert!(matches!(close_intent(Some(4000)), CloseIntent::Resume));
        assert!(matches!(close_intent(None), CloseIntent::Resume));
    }

    #[test]
    fn dead_session_reidentifies() {
        assert!(matches!(close_intent(Some(4009)), CloseIntent::Identify));
    }

    #[test]
    fn unknown_close_codes_resume() {
        // protocol evolution: codes we do not know keep the session
        assert!(matches!(close_intent(Some(4999)), CloseIntent::Resume));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(64);

        for attempt in 0..20 {
            let backoff = reconnect_backoff(base, cap, attempt);
            let expected = base.saturating_mul(2_u32.saturating_pow(attempt.min(16))).min(cap);

            assert!(backoff >= expected, "attempt {attempt}");
            // jitter adds at most a quarter on top
            assert!(backoff <= expected.mul_f64(1.25), "attempt {attempt}");
        }
    }
}
