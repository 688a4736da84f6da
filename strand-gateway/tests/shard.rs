//! End-to-end shard behavior against a scripted loopback gateway.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use strand_cache::InMemoryCache;
use strand_gateway::{Cluster, Config, EventHandler, ShardError, ShardScheme, ShardState};
use strand_http::Client;
use strand_model::{entity::Guild, Id, Intents};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    WebSocketStream,
};

const HELLO: &str = r#"{"op":10,"d":{"heartbeat_interval":45000}}"#;

struct Notifier {
    events: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl EventHandler for Notifier {
    async fn guild_create(&self, _shard_id: u32, guild: Guild) {
        let _ = self.events.send(format!("guild_create:{}", guild.name));
    }

    async fn shard_ready(&self, shard_id: u32) {
        let _ = self.events.send(format!("ready:{shard_id}"));
    }

    async fn shard_resumed(&self, shard_id: u32) {
        let _ = self.events.send(format!("resumed:{shard_id}"));
    }

    async fn shard_fatal(&self, shard_id: u32, error: &ShardError) {
        let code = error.close_code().as_u16();
        let _ = self.events.send(format!("fatal:{shard_id}:{code}"));
    }
}

async fn next_json(socket: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let message = socket
            .next()
            .await
            .expect("client hung up early")
            .expect("stream error");

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("client sent invalid json");
        }
    }
}

/// First connection: hello, expect an identify, deliver ready plus one
/// guild, then kick the client with a resumable close.
async fn serve_first(stream: TcpStream, port: u16) {
    let mut socket = accept_async(stream).await.expect("handshake failed");

    socket.send(Message::Text(HELLO.to_owned())).await.unwrap();

    let identify = next_json(&mut socket).await;
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["shard"], serde_json::json!([0, 1]));
    assert_eq!(identify["d"]["token"], "token");

    let ready = format!(
        r#"{{"op":0,"s":1,"t":"READY","d":{{"v":10,"user":{{"id":"1","username":"bot"}},"session_id":"abc","resume_gateway_url":"ws://127.0.0.1:{port}","guilds":[]}}}}"#
    );
    socket.send(Message::Text(ready)).await.unwrap();

    let guild_create = r#"{"op":0,"s":2,"t":"GUILD_CREATE","d":{"id":"419430400","name":"home","owner_id":"1"}}"#;
    socket
        .send(Message::Text(guild_create.to_owned()))
        .await
        .unwrap();

    socket
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4000),
            reason: "scripted".into(),
        })))
        .await
        .unwrap();

    // drain until the client is gone
    while let Some(Ok(_)) = socket.next().await {}
}

/// Second connection: hello, expect a resume referencing the session and
/// the last delivered sequence, then confirm it.
async fn serve_second(stream: TcpStream) {
    let mut socket = accept_async(stream).await.expect("handshake failed");

    socket.send(Message::Text(HELLO.to_owned())).await.unwrap();

    let resume = next_json(&mut socket).await;
    assert_eq!(resume["op"], 6, "expected a resume, not an identify");
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 2);

    let resumed = r#"{"op":0,"s":3,"t":"RESUMED","d":null}"#;
    socket.send(Message::Text(resumed.to_owned())).await.unwrap();

    // stay up until shutdown drops the client side
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => {
                let payload: Value = serde_json::from_str(&text).unwrap();

                // answer heartbeats so the connection stays healthy
                if payload["op"] == 1 {
                    let ack = r#"{"op":11}"#;
                    let _ = socket.send(Message::Text(ack.to_owned())).await;
                }
            }
            Some(Ok(_)) => {}
            Some(Err(_)) | None => return,
        }
    }
}

/// Hello, expect an identify, then reject it with a fatal close.
async fn serve_fatal(stream: TcpStream) {
    let mut socket = accept_async(stream).await.expect("handshake failed");

    socket.send(Message::Text(HELLO.to_owned())).await.unwrap();

    let identify = next_json(&mut socket).await;
    assert_eq!(identify["op"], 2);

    socket
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4014),
            reason: "disallowed intents".into(),
        })))
        .await
        .unwrap();

    while let Some(Ok(_)) = socket.next().await {}
}

#[tokio::test]
async fn shard_identifies_then_resumes_across_a_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (first, _) = listener.accept().await.unwrap();
        serve_first(first, port).await;

        let (second, _) = listener.accept().await.unwrap();
        serve_second(second).await;
    });

    let (events_tx, mut events) = mpsc::unbounded_channel();

    let config = Config::builder("token", Intents::GUILDS)
        .scheme(ShardScheme::Range {
            from: 0,
            to: 0,
            total: 1,
        })
        .gateway_url(format!("ws://127.0.0.1:{port}"))
        .backoff(Duration::from_millis(10), Duration::from_millis(50))
        .identify_window(Duration::from_millis(10))
        .handshake_timeout(Duration::from_secs(5))
        .build();

    let http = Client::new("token");
    let cache = Arc::new(InMemoryCache::new());
    let handler = Arc::new(Notifier { events: events_tx });

    let mut cluster = Cluster::new(config, &http, Arc::clone(&cache), handler)
        .await
        .unwrap();

    cluster.up();

    let wait = Duration::from_secs(10);
    let mut seen = Vec::new();

    while seen.len() < 3 {
        let event = timeout(wait, events.recv())
            .await
            .expect("timed out waiting for lifecycle events")
            .expect("handler dropped");

        seen.push(event);
    }

    assert_eq!(seen, ["ready:0", "guild_create:home", "resumed:0"]);

    // the dispatched guild landed in the cache
    assert_eq!(cache.guild(Id::new(419430400)).unwrap().name, "home");
    assert_eq!(cluster.shard_state(0), Some(ShardState::Ready));

    cluster.down().await;
    assert_eq!(cluster.shard_state(0), Some(ShardState::Disconnected));

    server.await.unwrap();
}

#[tokio::test]
async fn rejected_identify_stops_the_shard_for_good() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (events_tx, mut events) = mpsc::unbounded_channel();

    let config = Config::builder("token", Intents::GUILDS)
        .scheme(ShardScheme::Range {
            from: 0,
            to: 0,
            total: 1,
        })
        .gateway_url(format!("ws://127.0.0.1:{port}"))
        .backoff(Duration::from_millis(10), Duration::from_millis(50))
        .identify_window(Duration::from_millis(10))
        .handshake_timeout(Duration::from_secs(5))
        .build();

    let http = Client::new("token");
    let cache = Arc::new(InMemoryCache::new());
    let handler = Arc::new(Notifier { events: events_tx });

    let mut cluster = Cluster::new(config, &http, cache, handler).await.unwrap();
    cluster.up();

    let (first, _) = listener.accept().await.unwrap();
    serve_fatal(first).await;

    let event = timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for the fatal callback")
        .expect("handler dropped");

    assert_eq!(event, "fatal:0:4014");
    assert_eq!(cluster.shard_state(0), Some(ShardState::FatallyClosed));

    // the shard must not come back for another attempt
    assert!(timeout(Duration::from_millis(300), listener.accept())
        .await
        .is_err());

    cluster.down().await;
}
