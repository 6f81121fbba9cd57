// File: src/platforms/picarto/mod.rs
//
// Picarto's public v1 API needs no credentials; one request per channel.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use streampinger_common::models::{AccountProfile, LiveReport, Platform};

use crate::Error;
use crate::platforms::PlatformClient;

pub const PICARTO_API_URL: &str = "https://api.picarto.tv/api/v1";

const USER_AGENT: &str = "streampinger (+https://picarto.tv)";
const DEFAULT_CATEGORY: &str = "No category detected";
const DEFAULT_TITLE: &str = "Some title";

/// `GET /channel/name/{name}` body; only the fields we read.
#[derive(Debug, Deserialize)]
pub struct PicartoChannel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub title: Option<String>,
    /// Older channels report a string, newer ones an array.
    #[serde(default)]
    pub category: Value,
}

impl PicartoChannel {
    pub fn first_category(&self) -> Option<String> {
        match &self.category {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str()).map(str::to_string),
            _ => None,
        }
    }

    pub fn to_report(&self, channel_name: &str) -> LiveReport {
        if !self.online {
            return LiveReport::offline();
        }
        LiveReport {
            is_live: true,
            url: format!("https://picarto.tv/{}", channel_name),
            category: self.first_category().unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            title: self
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        }
    }

    pub fn to_profile(&self, channel_name: &str) -> AccountProfile {
        AccountProfile {
            id: channel_name.to_string(),
            display_name: self.name.clone().unwrap_or_else(|| channel_name.to_string()),
            avatar_url: self.avatar.clone().unwrap_or_default(),
        }
    }
}

pub struct PicartoClient {
    http: ReqwestClient,
    base_url: String,
}

impl PicartoClient {
    pub fn new(http: ReqwestClient) -> Self {
        Self::with_base_url(http, PICARTO_API_URL)
    }

    pub fn with_base_url(http: ReqwestClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `Ok(None)` when Picarto answers 404 for the channel.
    pub async fn fetch_channel(&self, channel_name: &str) -> Result<Option<PicartoChannel>, Error> {
        let url = format!(
            "{}/channel/name/{}",
            self.base_url,
            urlencoding::encode(channel_name)
        );
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Platform(format!("Picarto network error: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::Platform(format!("Picarto: HTTP {status} => {body_text}")));
        }

        let body = resp.text().await?;
        let channel = serde_json::from_str(&body)?;
        Ok(Some(channel))
    }
}

#[async_trait]
impl PlatformClient for PicartoClient {
    fn platform(&self) -> Platform {
        Platform::Picarto
    }

    async fn resolve(&self, identifier: &str) -> Result<Option<AccountProfile>, Error> {
        Ok(self
            .fetch_channel(identifier)
            .await?
            .map(|channel| channel.to_profile(identifier)))
    }

    async fn poll_batch(&self, account_ids: &[String]) -> Result<HashMap<String, LiveReport>, Error> {
        let mut reports = HashMap::new();
        for name in account_ids {
            let channel = self
                .fetch_channel(name)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Picarto channel '{name}' disappeared")))?;
            debug!("Picarto '{}': online={}", name, channel.online);
            reports.insert(name.clone(), channel.to_report(name));
        }
        Ok(reports)
    }

    async fn refresh_profile(&self, account_id: &str) -> Result<Option<AccountProfile>, Error> {
        self.resolve(account_id).await
    }
}
