//! Upstream Spotify Web API client
//!
//! One method per upstream call the routes need, plus the `/me` probe the
//! access guard uses. Upstream payloads are reshaped into the wire `Track`
//! (`name`, comma-joined `artist`, `uri`) before they leave this module, so
//! handlers never see Spotify's raw JSON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use spotify_auth::{CURRENTLY_PLAYING_PATH, ME_PATH, PAUSE_PATH, PLAY_PATH, TOP_TRACKS_PATH};

/// Track shape returned to clients. Constructed fresh per response; carries
/// no identity beyond the upstream URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub uri: String,
}

/// Errors from resource calls. The guard and handlers map these straight to
/// HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("upstream response decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    uri: String,
}

#[derive(Debug, Deserialize)]
struct TopTracksPayload {
    #[serde(default)]
    items: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingPayload {
    #[serde(default)]
    item: Option<TrackObject>,
}

impl From<TrackObject> for Track {
    fn from(t: TrackObject) -> Self {
        let artist = t
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Track {
            name: t.name,
            artist,
            uri: t.uri,
        }
    }
}

/// Bearer-authenticated client for the resource API.
#[derive(Clone)]
pub struct SpotifyApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SpotifyApi {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Probe call: GET `/me` with the given token, returning only the status.
    /// Transport errors bubble up; the guard treats them like non-401 failures.
    pub async fn probe(&self, token: &str) -> Result<reqwest::StatusCode, reqwest::Error> {
        let response = self
            .client
            .get(self.url(ME_PATH))
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(response.status())
    }

    /// Fetch the current user's top tracks, at most `limit` of them.
    pub async fn top_tracks(&self, token: &str, limit: usize) -> Result<Vec<Track>, UpstreamError> {
        let response = self
            .client
            .get(self.url(TOP_TRACKS_PATH))
            .query(&[("limit", limit)])
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = expect_success(response).await?;

        let payload: TopTracksPayload = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(format!("top tracks payload: {e}")))?;
        Ok(payload.items.into_iter().map(Track::from).collect())
    }

    /// Fetch the currently-playing track.
    ///
    /// Spotify answers 204 with an empty body when nothing is playing, and
    /// 200 with `item: null` between tracks (ads, podcasts with hidden
    /// metadata). All of those are `None`, not errors.
    pub async fn currently_playing(&self, token: &str) -> Result<Option<Track>, UpstreamError> {
        let response = self
            .client
            .get(self.url(CURRENTLY_PLAYING_PATH))
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = expect_success(response).await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let payload: CurrentlyPlayingPayload = serde_json::from_slice(&bytes)
            .map_err(|e| UpstreamError::Decode(format!("currently-playing payload: {e}")))?;
        Ok(payload.item.map(Track::from))
    }

    /// Pause playback on the active device.
    pub async fn pause(&self, token: &str) -> Result<(), UpstreamError> {
        let response = self
            .client
            .put(self.url(PAUSE_PATH))
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Start playback of a single track URI on the active device.
    pub async fn play(&self, token: &str, uri: &str) -> Result<(), UpstreamError> {
        let response = self
            .client
            .put(self.url(PLAY_PATH))
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "uris": [uri] }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}

/// Map non-2xx resource responses to `UpstreamError::Status`, keeping the
/// body for the server-side log.
async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(UpstreamError::Status { status, body })
}
