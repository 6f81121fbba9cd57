// File: streampinger-core/src/platforms/twitch/client.rs

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use streampinger_common::models::{AccountProfile, LiveReport, Platform};

use crate::Error;
use crate::platforms::PlatformClient;
use crate::platforms::twitch::auth::TwitchAppAuth;
use crate::platforms::twitch::requests::stream::fetch_streams;
use crate::platforms::twitch::requests::user::{fetch_user_by_id, fetch_user_by_login};

pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Helix caps `user_id` filters at 100 per request.
const HELIX_MAX_IDS: usize = 100;

/// A small wrapper client for the Helix endpoints the poller needs.
pub struct TwitchHelixClient {
    http: ReqwestClient,
    base_url: String,
    auth: TwitchAppAuth,
}

impl TwitchHelixClient {
    pub fn new(http: ReqwestClient, client_id: &str, client_secret: &str) -> Self {
        let auth = TwitchAppAuth::new(http.clone(), client_id, client_secret);
        Self::with_auth(http, auth, HELIX_BASE_URL)
    }

    /// Used by tests to point at a local server.
    pub fn with_auth(http: ReqwestClient, auth: TwitchAppAuth, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// GET `{base}/{path}` with app credentials and decode the JSON body.
    pub(crate) async fn helix_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let token = self.auth.bearer_token().await?;
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .header("Client-Id", self.auth.client_id())
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| Error::Platform(format!("Helix {path} network error: {e}")))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Helix rejected app token on {}; dropping it", path);
            self.auth.invalidate().await;
            return Err(Error::Auth(format!("Helix {path}: HTTP 401")));
        }
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::Platform(format!("Helix {path}: HTTP {status} => {body_text}")));
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Platform(format!("Helix {path} parse error: {e}")))
    }
}

#[async_trait]
impl PlatformClient for TwitchHelixClient {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    fn max_batch(&self) -> usize {
        HELIX_MAX_IDS
    }

    async fn resolve(&self, identifier: &str) -> Result<Option<AccountProfile>, Error> {
        let user = fetch_user_by_login(self, identifier).await?;
        Ok(user.map(|u| AccountProfile {
            id: u.id,
            display_name: u.display_name,
            avatar_url: u.profile_image_url,
        }))
    }

    async fn poll_batch(&self, account_ids: &[String]) -> Result<HashMap<String, LiveReport>, Error> {
        let mut reports = HashMap::new();
        for chunk in account_ids.chunks(HELIX_MAX_IDS) {
            for stream in fetch_streams(self, chunk).await? {
                if stream.type_field != "live" {
                    continue;
                }
                reports.insert(
                    stream.user_id.clone(),
                    LiveReport {
                        is_live: true,
                        url: format!("https://twitch.tv/{}", stream.user_login),
                        category: stream.game_name,
                        title: stream.title,
                    },
                );
            }
        }
        debug!("Twitch poll: {}/{} live", reports.len(), account_ids.len());
        Ok(reports)
    }

    async fn refresh_profile(&self, account_id: &str) -> Result<Option<AccountProfile>, Error> {
        let user = fetch_user_by_id(self, account_id).await?;
        Ok(user.map(|u| AccountProfile {
            id: u.id,
            display_name: u.display_name,
            avatar_url: u.profile_image_url,
        }))
    }
}
