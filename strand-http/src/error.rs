use std::time::Duration;

use strand_model::rest::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build request")]
    BuildingRequest(#[source] http::Error),
    #[error("failed to read response body")]
    ChunkingResponse(#[source] hyper::Error),
    #[error("serializing request body failed")]
    SerializingBody(#[source] serde_json::Error),
    #[error("deserializing response failed")]
    Parsing(#[source] serde_json::Error),
    #[error("ratelimited and out of retries; last retry-after was {retry_after:?}")]
    RateLimited { retry_after: Duration },
    #[error("request kept failing transiently and retries are exhausted")]
    RetriesExhausted {
        #[source]
        source: Option<hyper::Error>,
    },
    #[error("response status {status}: {} (code {})", error.message, error.code)]
    Response { status: u16, error: ApiError },
}
