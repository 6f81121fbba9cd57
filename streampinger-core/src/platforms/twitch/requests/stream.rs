// ========================================================
// File: streampinger-core/src/platforms/twitch/requests/stream.rs
// ========================================================
use serde::Deserialize;

use crate::Error;
use crate::platforms::twitch::client::TwitchHelixClient;

/// Response from "Get Streams" endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamData>,
}

/// Single stream data record. Only live channels appear in the response.
#[derive(Debug, Deserialize)]
pub struct StreamData {
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(rename = "type", default)]
    pub type_field: String, // e.g., "live"
    #[serde(default)]
    pub title: String,
}

/// Calls "Get Streams" for up to 100 user ids.
pub async fn fetch_streams(client: &TwitchHelixClient, user_ids: &[String]) -> Result<Vec<StreamData>, Error> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    let first = user_ids.len().to_string();
    let mut query: Vec<(&str, &str)> = user_ids.iter().map(|id| ("user_id", id.as_str())).collect();
    query.push(("first", first.as_str()));

    let resp: StreamsResponse = client.helix_get("streams", &query).await?;
    Ok(resp.data)
}
