pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("query returned errors: {message}")]
    Query { message: String },

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response contained no {what}")]
    EmptyResponse { what: &'static str },

    #[error("invalid period date `{input}` (expected YYYY-MM-DD or an RFC 3339 timestamp)")]
    InvalidDate { input: String },

    #[error("invalid tree view config: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn transport(endpoint: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}
