use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    StatusCode,
};
use hyper::{client::HttpConnector, Body, Client as HyperClient, Request};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use rand::Rng;
use serde::de::DeserializeOwned;
use strand_cache::InMemoryCache;
use strand_model::{
    entity::{Channel, CurrentUser, Guild, Member, Message, Role},
    gateway::event::{MessageDelete, RoleCreate, RoleDelete},
    id::{
        marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker},
        Id,
    },
    rest::{
        ApiError, BotGatewayInfo, CreateChannelFields, CreateMessageFields, CreateRoleFields,
        GatewayInfo, ModifyChannelFields, ModifyGuildFields,
    },
    Event,
};
use tokio::time::{sleep, timeout};

use crate::{ratelimit::Ratelimiter, HttpError, Route};

type InnerClient = HyperClient<HttpsConnector<HttpConnector>, Body>;

static MY_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), " (", env!("CARGO_PKG_VERSION"), ")");

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Attempts beyond the first for 5xx and connection failures.
const MAX_TRANSIENT_RETRIES: u32 = 3;
/// Attempts beyond the first while the remote answers 429.
const MAX_RATELIMIT_RETRIES: u32 = 3;

/// Body shape of a 429 response.
#[derive(serde::Deserialize)]
struct RatelimitedBody {
    #[serde(default)]
    retry_after: Option<f64>,
    #[serde(default)]
    global: bool,
}

/// Rate-limit-governed REST client.
///
/// Every call is admitted through the bucket table first; responses feed
/// their quota headers back unconditionally. Successful mutation calls
/// write the returned entity into the shared cache immediately instead of
/// racing the corresponding gateway event.
pub struct Client {
    http: InnerClient,
    auth: Box<str>,
    base_url: Box<str>,
    timeout: Duration,
    ratelimiter: Ratelimiter,
    cache: Option<Arc<InMemoryCache>>,
}

impl Client {
    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    pub fn new(token: impl Into<String>) -> Self {
        ClientBuilder::new(token).build()
    }

    pub fn ratelimiter(&self) -> &Ratelimiter {
        &self.ratelimiter
    }

    pub async fn gateway(&self) -> Result<GatewayInfo, HttpError> {
        self.fire(&Route::GetGateway, None).await
    }

    /// Session-start metadata: gateway address plus the recommended shard
    /// count for this application.
    pub async fn gateway_bot(&self) -> Result<BotGatewayInfo, HttpError> {
        self.fire(&Route::GetGatewayBot, None).await
    }

    pub async fn current_user(&self) -> Result<CurrentUser, HttpError> {
        self.fire(&Route::GetCurrentUser, None).await
    }

    pub async fn channel(&self, channel_id: Id<ChannelMarker>) -> Result<Channel, HttpError> {
        self.fire(&Route::GetChannel { channel_id }, None).await
    }

    pub async fn guild(&self, guild_id: Id<GuildMarker>) -> Result<Guild, HttpError> {
        self.fire(&Route::GetGuild { guild_id }, None).await
    }

    pub async fn member(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Member, HttpError> {
        self.fire(&Route::GetMember { guild_id, user_id }, None).await
    }

    pub async fn guild_channels(
        &self,
        guild_id: Id<GuildMarker>,
    ) -> Result<Vec<Channel>, HttpError> {
        self.fire(&Route::GetGuildChannels { guild_id }, None).await
    }

    pub async fn modify_channel(
        &self,
        channel_id: Id<ChannelMarker>,
        fields: &ModifyChannelFields,
    ) -> Result<Channel, HttpError> {
        let body = serde_json::to_vec(fields).map_err(HttpError::SerializingBody)?;

        let channel: Channel = self
            .fire(&Route::ModifyChannel { channel_id }, Some(body))
            .await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::ChannelUpdate(Box::new(channel.clone())));
        }

        Ok(channel)
    }

    pub async fn modify_guild(
        &self,
        guild_id: Id<GuildMarker>,
        fields: &ModifyGuildFields,
    ) -> Result<Guild, HttpError> {
        let body = serde_json::to_vec(fields).map_err(HttpError::SerializingBody)?;

        let guild: Guild = self
            .fire(&Route::ModifyGuild { guild_id }, Some(body))
            .await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::GuildUpdate(Box::new(guild.clone())));
        }

        Ok(guild)
    }

    pub async fn create_message(
        &self,
        channel_id: Id<ChannelMarker>,
        fields: &CreateMessageFields,
    ) -> Result<Message, HttpError> {
        let body = serde_json::to_vec(fields).map_err(HttpError::SerializingBody)?;

        let message: Message = self
            .fire(&Route::CreateMessage { channel_id }, Some(body))
            .await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::MessageCreate(Box::new(message.clone())));
        }

        Ok(message)
    }

    pub async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), HttpError> {
        let route = Route::DeleteMessage {
            channel_id,
            message_id,
        };

        self.fire_empty(&route, None).await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::MessageDelete(MessageDelete {
                id: message_id,
                channel_id,
                guild_id: None,
            }));
        }

        Ok(())
    }

    pub async fn create_channel(
        &self,
        guild_id: Id<GuildMarker>,
        fields: &CreateChannelFields,
    ) -> Result<Channel, HttpError> {
        let body = serde_json::to_vec(fields).map_err(HttpError::SerializingBody)?;

        let mut channel: Channel = self
            .fire(&Route::CreateChannel { guild_id }, Some(body))
            .await?;

        if channel.guild_id.is_none() {
            channel.guild_id = Some(guild_id);
        }

        if let Some(ref cache) = self.cache {
            cache.update(&Event::ChannelCreate(Box::new(channel.clone())));
        }

        Ok(channel)
    }

    pub async fn delete_channel(
        &self,
        channel_id: Id<ChannelMarker>,
    ) -> Result<Channel, HttpError> {
        let channel: Channel = self
            .fire(&Route::DeleteChannel { channel_id }, None)
            .await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::ChannelDelete(Box::new(channel.clone())));
        }

        Ok(channel)
    }

    pub async fn create_role(
        &self,
        guild_id: Id<GuildMarker>,
        fields: &CreateRoleFields,
    ) -> Result<Role, HttpError> {
        let body = serde_json::to_vec(fields).map_err(HttpError::SerializingBody)?;

        let role: Role = self.fire(&Route::CreateRole { guild_id }, Some(body)).await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::RoleCreate(RoleCreate {
                guild_id,
                role: role.clone(),
            }));
        }

        Ok(role)
    }

    pub async fn delete_role(
        &self,
        guild_id: Id<GuildMarker>,
        role_id: Id<RoleMarker>,
    ) -> Result<(), HttpError> {
        self.fire_empty(&Route::DeleteRole { guild_id, role_id }, None)
            .await?;

        if let Some(ref cache) = self.cache {
            cache.update(&Event::RoleDelete(RoleDelete { guild_id, role_id }));
        }

        Ok(())
    }

    pub async fn remove_member(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<(), HttpError> {
        self.fire_empty(&Route::RemoveMember { guild_id, user_id }, None)
            .await
    }

    async fn fire<T: DeserializeOwned>(
        &self,
        route: &Route,
        body: Option<Vec<u8>>,
    ) -> Result<T, HttpError> {
        let (_, bytes) = self.raw(route, body).await?;

        serde_json::from_slice(&bytes).map_err(HttpError::Parsing)
    }

    async fn fire_empty(&self, route: &Route, body: Option<Vec<u8>>) -> Result<(), HttpError> {
        self.raw(route, body).await.map(|_| ())
    }

    /// Dispatch one call: admission, transmission, quota write-back, retry.
    async fn raw(
        &self,
        route: &Route,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), HttpError> {
        let key = route.bucket_key();
        let mut permit = self.ratelimiter.acquire(&key).await;

        let mut transient_retries = 0;
        let mut ratelimit_retries = 0;
        let mut last_err = None;

        loop {
            let request = self.build_request(route, body.as_deref())?;

            let response = match timeout(self.timeout, self.http.request(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => {
                    last_err = Some(source);

                    if transient_retries >= MAX_TRANSIENT_RETRIES {
                        return Err(HttpError::RetriesExhausted { source: last_err });
                    }

                    let backoff = transient_backoff(transient_retries);
                    transient_retries += 1;
                    debug!(%route, ?backoff, "Request failed to connect, backing off");
                    sleep(backoff).await;

                    continue;
                }
                Err(_) => {
                    if transient_retries >= MAX_TRANSIENT_RETRIES {
                        return Err(HttpError::RetriesExhausted { source: last_err });
                    }

                    let backoff = transient_backoff(transient_retries);
                    transient_retries += 1;
                    debug!(%route, ?backoff, "Request timed out, backing off");
                    sleep(backoff).await;

                    continue;
                }
            };

            let status = response.status();
            let headers = response.headers().clone();

            let bytes = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(HttpError::ChunkingResponse)?;

            // quota state is authoritative from the remote, error or not
            permit.update(&headers);

            if status == StatusCode::TOO_MANY_REQUESTS {
                let parsed: Option<RatelimitedBody> = serde_json::from_slice(&bytes).ok();

                let retry_after = parsed
                    .as_ref()
                    .and_then(|body| body.retry_after)
                    .or_else(|| {
                        headers
                            .get("retry-after")
                            .and_then(|value| value.to_str().ok())
                            .and_then(|value| value.parse().ok())
                    })
                    .map(Duration::from_secs_f64)
                    .unwrap_or(Duration::from_secs(1));

                if parsed.map_or(false, |body| body.global) {
                    self.ratelimiter.lock_global(retry_after);
                }

                if ratelimit_retries >= MAX_RATELIMIT_RETRIES {
                    return Err(HttpError::RateLimited { retry_after });
                }

                ratelimit_retries += 1;
                warn!(%route, ?retry_after, "Ratelimited, honoring retry-after");
                sleep(retry_after).await;

                continue;
            }

            if status.is_server_error() {
                if transient_retries >= MAX_TRANSIENT_RETRIES {
                    return Err(HttpError::RetriesExhausted { source: None });
                }

                let backoff = transient_backoff(transient_retries);
                transient_retries += 1;
                debug!(%route, %status, ?backoff, "Server error, backing off");
                sleep(backoff).await;

                continue;
            }

            if status.is_client_error() {
                let error = serde_json::from_slice(&bytes).unwrap_or_else(|_| ApiError {
                    code: 0,
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                });

                return Err(HttpError::Response {
                    status: status.as_u16(),
                    error,
                });
            }

            return Ok((status, bytes));
        }
    }

    fn build_request(
        &self,
        route: &Route,
        body: Option<&[u8]>,
    ) -> Result<Request<Body>, HttpError> {
        let uri = format!("{}{route}", self.base_url);

        let mut builder = Request::builder()
            .method(route.method())
            .uri(uri)
            .header(AUTHORIZATION, &*self.auth)
            .header(USER_AGENT, MY_USER_AGENT);

        let body = match body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");

                Body::from(bytes.to_vec())
            }
            None => Body::empty(),
        };

        builder.body(body).map_err(HttpError::BuildingRequest)
    }
}

fn transient_backoff(retry: u32) -> Duration {
    let base = Duration::from_millis(500) * 2_u32.pow(retry);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));

    base + jitter
}

pub struct ClientBuilder {
    token: String,
    base_url: String,
    timeout: Duration,
    global_per_second: u32,
    cache: Option<Arc<InMemoryCache>>,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_API_BASE.to_owned(),
            timeout: Duration::from_secs(10),
            global_per_second: 50,
            cache: None,
        }
    }

    /// Override the API base, mostly useful to point at a local stub.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Aggregate request ceiling across all routes, at least 1.
    pub fn global_per_second(mut self, per_second: u32) -> Self {
        self.global_per_second = per_second;
        self
    }

    /// Cache that successful mutation calls write through to.
    pub fn cache(mut self, cache: Arc<InMemoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Client {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let http = HyperClient::builder().build(connector);

        Client {
            http,
            auth: format!("Bot {}", self.token).into_boxed_str(),
            base_url: self.base_url.into_boxed_str(),
            timeout: self.timeout,
            ratelimiter: Ratelimiter::new(self.global_per_second),
            cache: self.cache,
        }
    }
}
