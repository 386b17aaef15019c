//! Spotify Web API HTTP client (OAuth2 client-credentials or refresh-token grant)

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::models::*;
use crate::tracks::Track;

/// Refresh the token this long before it actually expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Items per playlist page (API maximum)
const PLAYLIST_PAGE_LIMIT: u32 = 100;

/// Items per album track page (API maximum)
const ALBUM_PAGE_LIMIT: u32 = 50;

/// Spotify application credentials
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Set after `auth --login`; tokens then act for that user
    pub refresh_token: Option<String>,
}

impl SpotifyCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: None,
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn from_response(token: &TokenResponse) -> Self {
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        Self {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        }
    }
}

/// HTTP client for the Spotify Web API
pub struct SpotifyClient {
    api_url: String,
    accounts_url: String,
    credentials: SpotifyCredentials,
    http_client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    /// Create a new Spotify client
    pub fn new(api_url: &str, accounts_url: &str, credentials: SpotifyCredentials) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("tunegrab/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            credentials,
            http_client,
            token: Mutex::new(None),
        })
    }

    /// Get a valid access token, requesting a new one if needed
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let token = match &self.credentials.refresh_token {
            Some(refresh_token) => {
                self.request_token(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ])
                .await?
            }
            None => {
                self.request_token(&[("grant_type", "client_credentials")])
                    .await?
            }
        };

        *cached = Some(CachedToken::from_response(&token));
        Ok(token.access_token)
    }

    /// Trade an authorization code from the login redirect for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let token = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await
            .context("Failed to exchange authorization code")?;

        *self.token.lock().await = Some(CachedToken::from_response(&token));
        Ok(token)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = format!("{}/api/token", self.accounts_url);
        debug!("Requesting Spotify access token from {}", url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await
            .context("Failed to reach Spotify accounts service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Spotify token request failed ({}): {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse token response")
    }

    /// GET an API endpoint and decode the JSON body
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_url, endpoint);
        debug!("Fetching {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let bytes = response.bytes().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(&bytes) {
                anyhow::bail!("Spotify error {}: {}", body.error.status, body.error.message);
            }
            anyhow::bail!("Spotify request failed with status {}", status);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", endpoint))
    }

    /// Fetch a single page of playlist items
    pub async fn playlist_tracks(&self, id: &str) -> Result<Vec<Track>> {
        let page: Page<PlaylistItem> = self
            .get_json(&format!("playlists/{}/tracks?limit={}", id, PLAYLIST_PAGE_LIMIT))
            .await?;

        if page.next.is_some() {
            warn!(
                "Playlist has {} items, only the first {} are fetched",
                page.total,
                page.items.len()
            );
        }

        let tracks: Vec<Track> = page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(|track| track.into_track(None))
            .collect();

        debug!("Found {} playlist tracks", tracks.len());
        Ok(tracks)
    }

    /// Fetch an album's tracks, all carrying the album's name and artwork
    pub async fn album_tracks(&self, id: &str) -> Result<Vec<Track>> {
        let album: Album = self.get_json(&format!("albums/{}", id)).await?;
        let page: Page<ApiTrack> = self
            .get_json(&format!("albums/{}/tracks?limit={}", id, ALBUM_PAGE_LIMIT))
            .await?;

        let cover = first_image(&album.images);
        let tracks: Vec<Track> = page
            .items
            .into_iter()
            .map(|track| track.into_track(Some((album.name.as_str(), cover.as_str()))))
            .collect();

        debug!("Found {} album tracks for {}", tracks.len(), album.name);
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{Route, TestServer};

    const TOKEN: &str = r#"{"access_token": "tok", "expires_in": 3600}"#;

    fn client(server: &TestServer, credentials: SpotifyCredentials) -> SpotifyClient {
        SpotifyClient::new(server.base_url(), server.base_url(), credentials).unwrap()
    }

    fn playlist_item(name: &str) -> String {
        format!(
            r#"{{"track": {{"name": "{}", "artists": [{{"name": "Daft Punk"}}], "album": {{"name": "Discovery", "images": [{{"url": "https://i.scdn.co/image/d"}}]}}, "duration_ms": 200000, "preview_url": null}}}}"#,
            name
        )
    }

    #[tokio::test]
    async fn test_playlist_tracks_match_served_items() {
        let items = [
            playlist_item("One More Time"),
            r#"{"track": null}"#.to_string(),
            playlist_item("Aerodynamic"),
            playlist_item("Digital Love"),
        ];
        let page = format!(r#"{{"items": [{}], "total": 4, "next": null}}"#, items.join(","));
        let server = TestServer::start(vec![
            Route::json("/api/token", TOKEN),
            Route::json("/playlists/pl1/tracks", &page),
        ])
        .await;

        let tracks = client(&server, SpotifyCredentials::new("id", "secret"))
            .playlist_tracks("pl1")
            .await
            .unwrap();

        let served = items.iter().filter(|i| !i.starts_with(r#"{"track": null"#)).count();
        assert_eq!(tracks.len(), served);
        assert_eq!(tracks[0].title, "One More Time");
        assert_eq!(tracks[2].title, "Digital Love");
        assert_eq!(tracks[2].cover_art, "https://i.scdn.co/image/d");

        let request = server
            .requests()
            .into_iter()
            .find(|r| r.path() == "/playlists/pl1/tracks")
            .unwrap();
        assert_eq!(request.target, "/playlists/pl1/tracks?limit=100");
        assert!(request.headers.to_lowercase().contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_album_tracks_carry_album_artwork() {
        let server = TestServer::start(vec![
            Route::json("/api/token", TOKEN),
            Route::json(
                "/albums/al1",
                r#"{"name": "Homework", "images": [{"url": "https://i.scdn.co/image/hw"}]}"#,
            ),
            Route::json(
                "/albums/al1/tracks",
                r#"{"items": [
                    {"name": "Revolution 909", "artists": [{"name": "Daft Punk"}], "duration_ms": 326000},
                    {"name": "Da Funk", "artists": [{"name": "Daft Punk"}], "duration_ms": 328000}
                ], "total": 2, "next": null}"#,
            ),
        ])
        .await;

        let tracks = client(&server, SpotifyCredentials::new("id", "secret"))
            .album_tracks("al1")
            .await
            .unwrap();

        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.album == "Homework"));
        assert!(tracks.iter().all(|t| t.cover_art == "https://i.scdn.co/image/hw"));
        assert_eq!(tracks[1].title, "Da Funk");
        // one token serves both requests
        assert_eq!(server.hits("/api/token"), 1);
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let server = TestServer::start(vec![Route::json("/api/token", TOKEN)]).await;
        let client = client(&server, SpotifyCredentials::new("id", "secret"));

        assert_eq!(client.access_token().await.unwrap(), "tok");

        let request = &server.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.body, "grant_type=client_credentials");
        // base64("id:secret")
        assert!(request.headers.contains("aWQ6c2VjcmV0"));
    }

    #[tokio::test]
    async fn test_refresh_token_grant() {
        let server = TestServer::start(vec![Route::json("/api/token", TOKEN)]).await;
        let credentials = SpotifyCredentials {
            refresh_token: Some("rt-1".to_string()),
            ..SpotifyCredentials::new("id", "secret")
        };

        assert_eq!(client(&server, credentials).access_token().await.unwrap(), "tok");
        assert_eq!(
            server.requests()[0].body,
            "grant_type=refresh_token&refresh_token=rt-1"
        );
    }

    #[tokio::test]
    async fn test_exchange_code_returns_refresh_token() {
        let server = TestServer::start(vec![Route::json(
            "/api/token",
            r#"{"access_token": "user-tok", "expires_in": 3600, "refresh_token": "rt-2"}"#,
        )])
        .await;
        let client = client(&server, SpotifyCredentials::new("id", "secret"));

        let token = client
            .exchange_code("abc", "http://127.0.0.1:8000/callback")
            .await
            .unwrap();
        assert_eq!(token.refresh_token.as_deref(), Some("rt-2"));
        assert_eq!(
            server.requests()[0].body,
            "grant_type=authorization_code&code=abc&redirect_uri=http%3A%2F%2F127.0.0.1%3A8000%2Fcallback"
        );

        // the exchanged access token is reused
        assert_eq!(client.access_token().await.unwrap(), "user-tok");
        assert_eq!(server.hits("/api/token"), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_request() {
        let server = TestServer::start(Vec::new()).await;
        let err = client(&server, SpotifyCredentials::new("id", "secret"))
            .access_token()
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("404"));
    }
}
