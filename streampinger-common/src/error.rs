// ================================================================
// File: streampinger-common/src/error.rs
// ================================================================

use thiserror::Error;
use twilight_http::response::DeserializeBodyError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Discord rejected a REST call (missing permission, unknown member, rate limit...).
    #[error("Discord HTTP error: {0}")]
    DiscordHttp(#[from] twilight_http::Error),

    #[error("Discord response body error: {0}")]
    DiscordBody(#[from] DeserializeBodyError),
}

impl Error {
    /// True when the error is a Discord REST response with the given status code.
    pub fn is_discord_status(&self, code: u16) -> bool {
        match self {
            Error::DiscordHttp(e) => matches!(
                e.kind(),
                twilight_http::error::ErrorType::Response { status, .. } if status.get() == code
            ),
            _ => false,
        }
    }
}
