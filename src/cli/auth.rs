//! Keyring-based storage for Spotify application credentials

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::spotify::{SpotifyClient, SpotifyCredentials, oauth};

const KEYRING_SERVICE: &str = "tunegrab";

/// How long `auth --login` waits for the browser to come back
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Manages credential lookup and storage
pub struct AuthManager;

impl AuthManager {
    /// Credentials for this run: flags/environment first, keyring second
    pub fn resolve(
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Option<SpotifyCredentials> {
        let stored = match Self::load() {
            Ok(creds) => Some(creds),
            Err(e) => {
                debug!("No stored credentials: {:#}", e);
                None
            }
        };

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Some(with_stored_login(
                SpotifyCredentials::new(client_id, client_secret),
                stored,
            )),
            _ => {
                if stored.is_some() {
                    debug!("Using Spotify credentials from keyring");
                }
                stored
            }
        }
    }

    /// Prompt for missing values, verify them, and store them
    pub async fn authenticate(
        client_id: Option<String>,
        client_secret: Option<String>,
        config: &Config,
    ) -> Result<SpotifyCredentials> {
        let creds = Self::prompt(client_id, client_secret)?;

        Self::verify(&creds, config).await?;

        Self::store(&creds)?;
        info!("Credentials stored in keyring");

        Ok(creds)
    }

    /// Log in as a Spotify user through the browser and keep the refresh token
    pub async fn login(
        client_id: Option<String>,
        client_secret: Option<String>,
        config: &Config,
    ) -> Result<SpotifyCredentials> {
        let mut creds = Self::prompt(client_id, client_secret)?;
        let redirect_uri = config.spotify_redirect_uri.as_str();

        let (listener, callback_path) = oauth::bind_redirect(redirect_uri).await?;
        let state = oauth::login_state();
        let url = oauth::authorize_url(
            &config.spotify_accounts_url,
            &creds.client_id,
            redirect_uri,
            &state,
        )?;

        println!("Approve access in your browser. If it does not open, visit:");
        println!("  {}", url);
        if let Err(e) = open::that_detached(url.as_str()) {
            warn!("Could not open a browser: {}", e);
        }

        let code = tokio::time::timeout(
            LOGIN_TIMEOUT,
            oauth::wait_for_code(&listener, &callback_path, &state),
        )
        .await
        .context("Timed out waiting for the Spotify login")??;

        let client = SpotifyClient::new(
            &config.spotify_api_url,
            &config.spotify_accounts_url,
            creds.clone(),
        )?;
        let token = client.exchange_code(&code, redirect_uri).await?;
        creds.refresh_token = Some(
            token
                .refresh_token
                .context("Spotify did not return a refresh token")?,
        );

        Self::store(&creds)?;
        info!("Login stored in keyring");

        Ok(creds)
    }

    /// Load credentials from keyring
    pub fn load() -> Result<SpotifyCredentials> {
        let client_id = Self::get_entry("client_id")?
            .get_password()
            .context("No Spotify client ID in keyring")?;

        let client_secret = Self::get_entry("client_secret")?
            .get_password()
            .context("No Spotify client secret in keyring")?;

        let refresh_token = Self::get_entry("refresh_token")?.get_password().ok();

        Ok(SpotifyCredentials {
            client_id,
            client_secret,
            refresh_token,
        })
    }

    /// Store credentials in keyring
    pub fn store(creds: &SpotifyCredentials) -> Result<()> {
        Self::get_entry("client_id")?
            .set_password(&creds.client_id)
            .context("Failed to store client ID in keyring")?;

        Self::get_entry("client_secret")?
            .set_password(&creds.client_secret)
            .context("Failed to store client secret in keyring")?;

        let refresh_entry = Self::get_entry("refresh_token")?;
        match &creds.refresh_token {
            Some(token) => refresh_entry
                .set_password(token)
                .context("Failed to store refresh token in keyring")?,
            // A login made with other credentials no longer applies
            None => {
                let _ = refresh_entry.delete_credential();
            }
        }

        debug!("Credentials stored in keyring");
        Ok(())
    }

    /// Clear stored credentials
    pub fn clear() -> Result<()> {
        let _ = Self::get_entry("client_id")?.delete_credential();
        let _ = Self::get_entry("client_secret")?.delete_credential();
        let _ = Self::get_entry("refresh_token")?.delete_credential();
        info!("Credentials cleared from keyring");
        Ok(())
    }

    fn prompt(
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<SpotifyCredentials> {
        let client_id = match client_id {
            Some(id) => id,
            None => Input::new()
                .with_prompt("Spotify client ID")
                .interact_text()
                .context("Failed to read client ID")?,
        };

        let client_secret = match client_secret {
            Some(secret) => secret,
            None => Password::new()
                .with_prompt("Spotify client secret")
                .interact()
                .context("Failed to read client secret")?,
        };

        Ok(SpotifyCredentials::new(
            client_id.trim(),
            client_secret.trim(),
        ))
    }

    /// Verify credentials by requesting an access token
    async fn verify(creds: &SpotifyCredentials, config: &Config) -> Result<()> {
        debug!("Verifying credentials against {}", config.spotify_accounts_url);

        let client = SpotifyClient::new(
            &config.spotify_api_url,
            &config.spotify_accounts_url,
            creds.clone(),
        )?;
        client
            .access_token()
            .await
            .context("Failed to verify credentials")?;

        info!("Credentials verified successfully");
        Ok(())
    }

    /// Get a keyring entry for a given key
    fn get_entry(key: &str) -> Result<Entry> {
        let entry_key = format!("spotify:{}", key);
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}

/// Keep a stored user login when the given app credentials are the ones it was made with
fn with_stored_login(
    creds: SpotifyCredentials,
    stored: Option<SpotifyCredentials>,
) -> SpotifyCredentials {
    let refresh_token = stored
        .filter(|s| s.client_id == creds.client_id)
        .and_then(|s| s.refresh_token);
    SpotifyCredentials {
        refresh_token,
        ..creds
    }
}
