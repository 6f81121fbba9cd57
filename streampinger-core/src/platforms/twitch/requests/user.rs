use serde::Deserialize;

use crate::Error;
use crate::platforms::twitch::client::TwitchHelixClient;

/// Response from "Get Users" endpoint.
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    pub data: Vec<UserData>,
}

/// Single user record.
#[derive(Debug, Deserialize)]
pub struct UserData {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
}

pub async fn fetch_user_by_login(client: &TwitchHelixClient, login: &str) -> Result<Option<UserData>, Error> {
    let resp: UsersResponse = client.helix_get("users", &[("login", login)]).await?;
    Ok(resp.data.into_iter().next())
}

pub async fn fetch_user_by_id(client: &TwitchHelixClient, id: &str) -> Result<Option<UserData>, Error> {
    let resp: UsersResponse = client.helix_get("users", &[("id", id)]).await?;
    Ok(resp.data.into_iter().next())
}
