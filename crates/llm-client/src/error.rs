use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Provider returned {0}")]
    ProviderStatus(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid JSON response: {0}")]
    MalformedJson(String),

    #[error("Missing API key")]
    MissingApiKey,
}

pub type LlmResult<T> = Result<T, LlmError>;
