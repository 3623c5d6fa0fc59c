use thiserror::Error;

/// Failures talking to the iBroadcast API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("session is not authorized")]
    Unauthorized,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("no username/password configured")]
    MissingCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("library payload is missing or not an object")]
    MissingPayload,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to move cache into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("cache schema version {found} does not match {expected}")]
    Schema { found: u32, expected: u32 },
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The only hard failure of a library load: nothing to show at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no library available: {reason}")]
    NoLibrary { reason: String },
}
