use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use playsync_model::{
    ContentItem, ItemId, MediaSourceId, ServerConfiguration,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{PlayerError, Result};
use crate::infra::services::{CatalogService, ProgressReport, StopReport};

/// Identity sent with every request in the `Authorization` header.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_name: String,
    pub device_name: String,
    pub device_id: String,
    pub version: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            client_name: "playsync".to_string(),
            device_name: "playsync".to_string(),
            device_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackStartInfo<'a> {
    item_id: &'a str,
    media_source_id: &'a str,
    can_seek: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackProgressInfo<'a> {
    item_id: &'a str,
    media_source_id: &'a str,
    position_ticks: i64,
    is_paused: bool,
    can_seek: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PlaybackStopInfo<'a> {
    item_id: &'a str,
    media_source_id: &'a str,
    position_ticks: i64,
}

/// HTTP client for a Jellyfin-compatible media server.
#[derive(Clone)]
pub struct JellyfinApiClient {
    client: Client,
    base_url: Url,
    access_token: String,
    user_id: Option<String>,
    identity: ClientIdentity,
}

impl fmt::Debug for JellyfinApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JellyfinApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("user_id", &self.user_id)
            .field("has_token", &!self.access_token.is_empty())
            .finish()
    }
}

impl JellyfinApiClient {
    pub fn new(
        base_url: &str,
        access_token: impl Into<String>,
        identity: ClientIdentity,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        info!("[ApiClient] Creating API client with base URL: {base_url}");

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
            user_id: None,
            identity,
        })
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn authorization(&self) -> String {
        let ClientIdentity {
            client_name,
            device_name,
            device_id,
            version,
        } = &self.identity;
        format!(
            "MediaBrowser Client=\"{client_name}\", Device=\"{device_name}\", DeviceId=\"{device_id}\", Version=\"{version}\", Token=\"{}\"",
            self.access_token
        )
    }

    fn build(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, self.authorization())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = self.endpoint(path)?;
        debug!("[ApiClient] POST {url}");
        let response = self.build(self.client.post(url)).json(body).send().await?;
        check_status(response).await.map(drop)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("[ApiClient] GET {url}");
        let response = self.build(self.client.get(url)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch an item with the caller's user data attached.
    pub async fn fetch_item(&self, item_id: &ItemId) -> Result<ContentItem> {
        let user_id = self.user_id.as_deref().ok_or_else(|| {
            PlayerError::Config("fetching items requires a user id".to_string())
        })?;
        self.get(&format!(
            "Users/{}/Items/{}",
            urlencoding::encode(user_id),
            urlencoding::encode(item_id.as_str())
        ))
        .await
    }
}

#[async_trait]
impl CatalogService for JellyfinApiClient {
    async fn report_playback_start(
        &self,
        item_id: &ItemId,
        media_source_id: &MediaSourceId,
    ) -> Result<()> {
        self.post(
            "Sessions/Playing",
            &PlaybackStartInfo {
                item_id: item_id.as_str(),
                media_source_id: media_source_id.as_str(),
                can_seek: true,
            },
        )
        .await
    }

    async fn report_playback_progress(
        &self,
        report: &ProgressReport,
    ) -> Result<()> {
        self.post(
            "Sessions/Playing/Progress",
            &PlaybackProgressInfo {
                item_id: report.item_id.as_str(),
                media_source_id: report.media_source_id.as_str(),
                position_ticks: report.position_ticks(),
                is_paused: report.is_paused,
                can_seek: true,
            },
        )
        .await
    }

    async fn report_playback_stopped(&self, report: &StopReport) -> Result<()> {
        self.post(
            "Sessions/Playing/Stopped",
            &PlaybackStopInfo {
                item_id: report.item_id.as_str(),
                media_source_id: report.media_source_id.as_str(),
                position_ticks: report.position_ticks(),
            },
        )
        .await
    }

    async fn server_configuration(&self) -> Result<ServerConfiguration> {
        self.get("System/Configuration").await
    }

    fn stream_url(
        &self,
        item_id: &ItemId,
        max_bitrate: u64,
        media_source_id: &MediaSourceId,
    ) -> Result<Url> {
        let mut url = self.endpoint(&format!(
            "Videos/{}/stream",
            urlencoding::encode(item_id.as_str())
        ))?;
        url.query_pairs_mut()
            .append_pair("static", "true")
            .append_pair("MediaSourceId", media_source_id.as_str())
            .append_pair("MaxStreamingBitrate", &max_bitrate.to_string())
            .append_pair("api_key", &self.access_token);
        Ok(url)
    }

    fn image_url(&self, item: &ContentItem) -> Option<Url> {
        let path = format!(
            "Items/{}/Images/Primary",
            urlencoding::encode(item.id.as_str())
        );
        match self.endpoint(&path) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("[ApiClient] No artwork url for {}: {err}", item.id);
                None
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(PlayerError::Catalog(format!("{url} returned {status}: {body}")))
}

/// Add a scheme when missing and force a trailing slash so relative joins
/// keep any path prefix the server lives under.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PlayerError::Config("server url is empty".to_string()));
    }
    let with_scheme = if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
    {
        trimmed.to_string()
    } else {
        warn!("[ApiClient] Server url '{trimmed}' has no scheme, assuming http");
        format!("http://{trimmed}")
    };
    Ok(Url::parse(&format!("{with_scheme}/"))?)
}
