#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("retries exhausted for {url}: {source}")]
    RetriesExhausted {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("invalid page count: {0:?}")]
    PageCount(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
