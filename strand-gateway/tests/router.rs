use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::value::RawValue;
use strand_cache::InMemoryCache;
use strand_gateway::{EventHandler, EventRouter};
use strand_model::entity::Channel;

/// Records what it saw in its callbacks, including the cache state at the
/// moment each one ran.
struct Recorder {
    cache: Arc<InMemoryCache>,
    log: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(cache: Arc<InMemoryCache>) -> Self {
        Self {
            cache,
            log: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl EventHandler for Recorder {
    async fn channel_create(&self, _shard_id: u32, channel: Channel) {
        let cached = self.cache.channel(channel.id).is_some();
        let name = channel.name.as_deref().unwrap_or("?");

        self.push(format!("create:{name}:cached={cached}"));
    }

    async fn channel_delete(
        &self,
        _shard_id: u32,
        channel: Channel,
        prior: Option<Arc<Channel>>,
    ) {
        let cached = self.cache.channel(channel.id).is_some();
        let prior_name = prior
            .as_deref()
            .and_then(|prior| prior.name.as_deref())
            .unwrap_or("?")
            .to_owned();

        self.push(format!("delete:{prior_name}:cached={cached}"));
    }
}

fn raw(json: &str) -> Box<RawValue> {
    RawValue::from_string(json.to_owned()).unwrap()
}

fn fixture() -> (Arc<InMemoryCache>, Arc<Recorder>, EventRouter) {
    let cache = Arc::new(InMemoryCache::new());
    let recorder = Arc::new(Recorder::new(Arc::clone(&cache)));
    let handler = Arc::clone(&recorder) as Arc<dyn EventHandler>;
    let router = EventRouter::new(Arc::clone(&cache), handler);

    (cache, recorder, router)
}

const CHANNEL_JSON: &str = r#"{"id":"7","type":0,"guild_id":"419430400","name":"general"}"#;

#[tokio::test]
async fn callback_observes_post_mutation_cache() {
    let (_cache, recorder, router) = fixture();

    let d = raw(CHANNEL_JSON);
    router.route(0, "CHANNEL_CREATE", Some(&d)).await;

    let log = recorder.log.lock().unwrap();
    assert_eq!(log.as_slice(), ["create:general:cached=true"]);
}

#[tokio::test]
async fn delete_callback_gets_the_evicted_snapshot() {
    let (cache, recorder, router) = fixture();

    let d = raw(CHANNEL_JSON);
    router.route(0, "CHANNEL_CREATE", Some(&d)).await;
    router.route(0, "CHANNEL_DELETE", Some(&d)).await;

    // the entry is gone from the cache, the callback still saw it
    assert!(cache
        .channel(strand_model::Id::new(7))
        .is_none());

    let log = recorder.log.lock().unwrap();
    assert_eq!(log[1], "delete:general:cached=false");
}

#[tokio::test]
async fn unknown_tags_are_dropped_silently() {
    let (_cache, recorder, router) = fixture();

    let d = raw(r#"{"anything":true}"#);
    router.route(0, "SOUP_UPDATE", Some(&d)).await;

    assert!(recorder.log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bad_payload_only_costs_that_event() {
    let (_cache, recorder, router) = fixture();

    let bad = raw(r#"{"id":false}"#);
    router.route(0, "CHANNEL_CREATE", Some(&bad)).await;

    let good = raw(CHANNEL_JSON);
    router.route(0, "CHANNEL_CREATE", Some(&good)).await;

    let log = recorder.log.lock().unwrap();
    assert_eq!(log.as_slice(), ["create:general:cached=true"]);
}
