//! Dispatcher behavior against a loopback server: retry-after honoring,
//! terminal 4xx, and optimistic cache write-through.

use std::{
    convert::Infallible,
    net::TcpListener,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use eyre::Result;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use strand_cache::InMemoryCache;
use strand_http::{Client, HttpError};
use strand_model::{id::Id, rest::CreateMessageFields};

const MESSAGE_JSON: &str =
    r#"{"id":"5","channel_id":"1","author":{"id":"9","username":"robot","bot":true},"content":"hi"}"#;

enum Script {
    RatelimitOnce,
    Forbidden,
    Ok,
}

async fn handle(
    _req: Request<Body>,
    hits: Arc<AtomicUsize>,
    script: Arc<Script>,
) -> Result<Response<Body>, Infallible> {
    let hit = hits.fetch_add(1, Ordering::SeqCst);

    let response = match (&*script, hit) {
        (Script::RatelimitOnce, 0) => Response::builder()
            .status(StatusCode::TOO_MANY_REQUESTS)
            .header("x-ratelimit-remaining", "0")
            .header("retry-after", "1")
            .body(Body::from(r#"{"retry_after":0.8,"global":false}"#))
            .unwrap(),
        (Script::Forbidden, _) => Response::builder()
            .status(StatusCode::FORBIDDEN)
            .body(Body::from(r#"{"code":50013,"message":"Missing Permissions"}"#))
            .unwrap(),
        _ => Response::builder()
            .status(StatusCode::OK)
            .header("x-ratelimit-remaining", "4")
            .header("x-ratelimit-limit", "5")
            .header("x-ratelimit-reset-after", "60")
            .header("x-ratelimit-bucket", "abcd1234")
            .body(Body::from(MESSAGE_JSON))
            .unwrap(),
    };

    Ok(response)
}

fn spawn_server(script: Script) -> Result<(String, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;

    let hits = Arc::new(AtomicUsize::new(0));
    let script = Arc::new(script);

    let make = {
        let hits = Arc::clone(&hits);

        make_service_fn(move |_| {
            let hits = Arc::clone(&hits);
            let script = Arc::clone(&script);

            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle(req, Arc::clone(&hits), Arc::clone(&script))
                }))
            }
        })
    };

    tokio::spawn(Server::from_tcp(listener)?.serve(make));

    Ok((format!("http://{addr}"), hits))
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_is_honored_exactly() -> Result<()> {
    let (base_url, hits) = spawn_server(Script::RatelimitOnce)?;
    let client = Client::builder("token").base_url(base_url).build();

    let start = Instant::now();

    let message = client
        .create_message(
            Id::new(1),
            &CreateMessageFields {
                content: "hi".to_owned(),
            },
        )
        .await?;

    assert_eq!(message.id.get(), 5);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // the call may not be retransmitted before the advertised delay
    assert!(start.elapsed() >= Duration::from_millis(780));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn non_429_client_errors_are_terminal() -> Result<()> {
    let (base_url, hits) = spawn_server(Script::Forbidden)?;
    let client = Client::builder("token").base_url(base_url).build();

    let err = client
        .create_message(
            Id::new(1),
            &CreateMessageFields {
                content: "hi".to_owned(),
            },
        )
        .await
        .unwrap_err();

    match err {
        HttpError::Response { status, error } => {
            assert_eq!(status, 403);
            assert_eq!(error.code, 50013);
        }
        other => panic!("expected terminal response error, got {other}"),
    }

    // no retry happened
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_mutations_write_through_the_cache() -> Result<()> {
    let (base_url, _) = spawn_server(Script::Ok)?;
    let cache = Arc::new(InMemoryCache::new());

    let client = Client::builder("token")
        .base_url(base_url)
        .cache(Arc::clone(&cache))
        .build();

    client
        .create_message(
            Id::new(1),
            &CreateMessageFields {
                content: "hi".to_owned(),
            },
        )
        .await?;

    let cached = cache.message(Id::new(5)).expect("message not cached");
    assert_eq!(cached.content, "hi");
    assert!(cache.user(Id::new(9)).is_some());

    Ok(())
}
