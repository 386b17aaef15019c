//! Authorization-code login: browser consent and a one-shot local redirect listener

use anyhow::{Context, Result};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;
use url::Url;

/// Read access to the user's private and collaborative playlists
pub const SCOPES: &str = "playlist-read-private playlist-read-collaborative";

/// Consent page the user is sent to
pub fn authorize_url(
    accounts_url: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
) -> Result<Url> {
    let base = format!("{}/authorize", accounts_url.trim_end_matches('/'));
    let mut url = Url::parse(&base).with_context(|| format!("Invalid accounts URL: {}", base))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("scope", SCOPES)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state);
    Ok(url)
}

/// Unguessable value tying the redirect to this login attempt
pub fn login_state() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    // RandomState is seeded per instance
    let part = |salt: u64| {
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u128(nanos);
        hasher.write_u32(std::process::id());
        hasher.write_u64(salt);
        hasher.finish()
    };
    format!("{:016x}{:016x}", part(0), part(1))
}

/// Bind the listener named by a local `http://host:port/path` redirect URI,
/// returning it with the callback path
pub async fn bind_redirect(redirect_uri: &str) -> Result<(TcpListener, String)> {
    let url = Url::parse(redirect_uri)
        .with_context(|| format!("Invalid redirect URI: {}", redirect_uri))?;
    if url.scheme() != "http" {
        anyhow::bail!("Redirect URI must be a local http:// address: {}", redirect_uri);
    }
    let host = url
        .host_str()
        .with_context(|| format!("Redirect URI has no host: {}", redirect_uri))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to listen on {}:{}", host, port))?;
    debug!("Waiting for the login redirect on {}:{}", host, port);

    Ok((listener, url.path().to_string()))
}

/// Accept connections until the browser hits `callback_path`, then return
/// the authorization code it carries
pub async fn wait_for_code(listener: &TcpListener, callback_path: &str, state: &str) -> Result<String> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept login redirect")?;

        let Some(target) = read_target(&mut stream).await else {
            continue;
        };
        debug!("Login listener got {} from {}", target, peer);

        let url = match Url::parse("http://localhost").and_then(|base| base.join(&target)) {
            Ok(url) if url.path() == callback_path => url,
            _ => {
                respond(&mut stream, "404 Not Found", "Not found.").await;
                continue;
            }
        };

        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        if let Some(error) = param("error") {
            respond(&mut stream, "200 OK", "Login was cancelled.").await;
            anyhow::bail!("Spotify login failed: {}", error);
        }
        if param("state").as_deref() != Some(state) {
            respond(&mut stream, "400 Bad Request", "Login state did not match.").await;
            anyhow::bail!("Login redirect carried an unexpected state");
        }

        let code = param("code").context("Login redirect carried no code")?;
        respond(&mut stream, "200 OK", "Logged in to Spotify.").await;
        return Ok(code);
    }
}

/// Request target from the request line, once the head has arrived
async fn read_target(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut request_line = head.lines().next()?.split_whitespace();
    let _method = request_line.next()?;
    request_line.next().map(str::to_string)
}

async fn respond(stream: &mut TcpStream, status: &str, message: &str) {
    let body = format!(
        "<!DOCTYPE html><html><head><title>tunegrab</title></head>\
         <body><p>{} You can close this window.</p></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
