// src/error.rs

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("retries exhausted for {0}")]
    RetriesExhausted(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
