use std::time::{Duration, Instant};

use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use twitch_oauth2::{AccessToken, ClientId, ClientSecret};

use crate::Error;

pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

/// Refresh this long before Twitch says the token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct AppTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: AccessToken,
    expires_at: Instant,
}

/// App access token obtained with the client-credentials grant.
///
/// Helix only needs an app token for the public user/stream lookups we do,
/// so no user login or refresh token is involved.
pub struct TwitchAppAuth {
    http: ReqwestClient,
    token_url: String,
    client_id: ClientId,
    client_secret: ClientSecret,
    cached: Mutex<Option<CachedToken>>,
}

impl TwitchAppAuth {
    pub fn new(http: ReqwestClient, client_id: &str, client_secret: &str) -> Self {
        Self::with_token_url(http, client_id, client_secret, TWITCH_TOKEN_URL)
    }

    pub fn with_token_url(http: ReqwestClient, client_id: &str, client_secret: &str, token_url: &str) -> Self {
        Self {
            http,
            token_url: token_url.to_string(),
            client_id: ClientId::new(client_id.to_string()),
            client_secret: ClientSecret::new(client_secret.to_string()),
            cached: Mutex::new(None),
        }
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Returns a valid bearer token, fetching a new one if needed.
    pub async fn bearer_token(&self) -> Result<String, Error> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < cached.expires_at {
                return Ok(cached.token.secret().to_string());
            }
        }

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.secret()),
            ("grant_type", "client_credentials"),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("HTTP error requesting app token: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Auth(format!("Twitch token endpoint error: {e}")))?
            .json::<AppTokenResponse>()
            .await
            .map_err(|e| Error::Auth(format!("Parse error on token JSON: {e}")))?;

        debug!("Obtained Twitch app token valid for {}s", resp.expires_in);
        let secret = resp.access_token.clone();
        *guard = Some(CachedToken {
            token: AccessToken::new(resp.access_token),
            expires_at: Instant::now() + Duration::from_secs(resp.expires_in),
        });
        Ok(secret)
    }

    /// Forgets the cached token, e.g. after Helix answered 401.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
