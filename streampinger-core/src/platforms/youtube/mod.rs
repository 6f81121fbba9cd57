// File: src/platforms/youtube/mod.rs
//
// YouTube Data API v3 with a plain API key. Searches are quota-expensive,
// which is why this poller runs on a much longer interval than the others.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use streampinger_common::models::{AccountProfile, LiveReport, Platform};

use crate::Error;
use crate::platforms::PlatformClient;

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

const DEFAULT_CATEGORY: &str = "Some game";

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub id: String,
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub topic_details: Option<TopicDetails>,
}

#[derive(Debug, Deserialize)]
pub struct VideoSnippet {
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetails {
    #[serde(default)]
    pub topic_categories: Vec<String>,
}

impl Channel {
    pub fn to_profile(&self) -> AccountProfile {
        let thumbs = &self.snippet.thumbnails;
        let avatar_url = thumbs
            .medium
            .as_ref()
            .or(thumbs.default.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default();
        AccountProfile {
            id: self.id.clone(),
            display_name: self.snippet.title.clone(),
            avatar_url,
        }
    }
}

impl Video {
    pub fn to_report(&self) -> LiveReport {
        let category = self
            .topic_details
            .as_ref()
            .and_then(|t| t.topic_categories.first().cloned())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        LiveReport {
            is_live: true,
            url: format!("https://youtu.be/{}", self.id),
            category,
            title: self.snippet.title.clone(),
        }
    }
}

pub struct YouTubeClient {
    http: ReqwestClient,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: ReqwestClient, api_key: &str) -> Self {
        Self::with_base_url(http, api_key, YOUTUBE_API_URL)
    }

    pub fn with_base_url(http: ReqwestClient, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn api_get<T: DeserializeOwned>(&self, resource: &str, query: &[(&str, &str)]) -> Result<T, Error> {
        let url = format!("{}/{}", self.base_url, resource);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::Platform(format!("YouTube {resource} network error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::Platform(format!("YouTube {resource}: HTTP {status} => {body_text}")));
        }
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Platform(format!("YouTube {resource} parse error: {e}")))
    }

    async fn fetch_channel(&self, filter: (&str, &str)) -> Result<Option<Channel>, Error> {
        let resp: ListResponse<Channel> = self
            .api_get("channels", &[("part", "id,snippet"), filter, ("maxResults", "1")])
            .await?;
        Ok(resp.items.into_iter().next())
    }

    /// The channel's current live video, if any.
    pub async fn fetch_live_video(&self, channel_id: &str) -> Result<Option<Video>, Error> {
        let search: ListResponse<SearchResult> = self
            .api_get(
                "search",
                &[
                    ("part", "id"),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("channelId", channel_id),
                    ("maxResults", "1"),
                ],
            )
            .await?;

        let Some(video_id) = search.items.into_iter().find_map(|r| r.id.video_id) else {
            return Ok(None);
        };

        let videos: ListResponse<Video> = self
            .api_get("videos", &[("part", "snippet,topicDetails"), ("id", video_id.as_str())])
            .await?;
        Ok(videos.items.into_iter().next())
    }
}

#[async_trait]
impl PlatformClient for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn resolve(&self, identifier: &str) -> Result<Option<AccountProfile>, Error> {
        let channel = self.fetch_channel(("forHandle", identifier)).await?;
        Ok(channel.map(|c| c.to_profile()))
    }

    async fn poll_batch(&self, account_ids: &[String]) -> Result<HashMap<String, LiveReport>, Error> {
        let mut reports = HashMap::new();
        for channel_id in account_ids {
            if let Some(video) = self.fetch_live_video(channel_id).await? {
                debug!("YouTube channel {} is live with video {}", channel_id, video.id);
                reports.insert(channel_id.clone(), video.to_report());
            }
        }
        Ok(reports)
    }

    async fn refresh_profile(&self, account_id: &str) -> Result<Option<AccountProfile>, Error> {
        let channel = self.fetch_channel(("id", account_id)).await?;
        Ok(channel.map(|c| c.to_profile()))
    }
}
