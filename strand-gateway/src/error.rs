use strand_http::HttpError;
use strand_model::CloseCode;
use thiserror::Error;

/// Terminal shard failures.
///
/// Everything else (connection loss, protocol hiccups, resumable closes) is
/// handled inside the shard's reconnect loop and never surfaces.
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("remote closed the connection with fatal code {code} ({})", .code.as_u16())]
    FatallyClosed { code: CloseCode },
}

impl ShardError {
    pub fn close_code(&self) -> CloseCode {
        let Self::FatallyClosed { code } = self;

        *code
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to inflate binary frame")]
    Compression(#[from] flate2::DecompressError),
    #[error("frame payload is not utf-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("received a binary frame but compression is disabled")]
    UnexpectedBinary,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("session-start metadata call failed")]
    StartMetadata(#[source] HttpError),
    #[error("shard range is empty or exceeds the total count")]
    InvalidShardRange,
}
