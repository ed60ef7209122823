//! OAuth 2.0 against Google's endpoints.
//!
//! [`OAuthClient::authorize`] runs the one-time consent step: an
//! authorization-code flow with PKCE (RFC 7636) and a loopback redirect on
//! 127.0.0.1. The scheduled job only ever uses [`OAuthClient::refresh`].

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only access to calendars and events.
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Random bytes behind the code verifier, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long the loopback server waits for the browser redirect.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// A freshly issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Token endpoint response to an authorization-code exchange.
#[derive(Debug, Deserialize)]
struct ExchangedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Talks to Google's OAuth endpoints on behalf of one OAuth client.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Runs the interactive consent flow and returns the granted tokens.
    ///
    /// Binds a loopback server on `port` (0 picks a free one), opens the
    /// browser on Google's consent page and waits for the redirect. The
    /// client credentials are recorded in the returned token so later
    /// refreshes need nothing else.
    pub async fn authorize(&self, scopes: &[String], port: u16) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(port)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.build_auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth consent flow");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = wait_for_callback(listener)?;
        let code = callback.into_code(&pkce.state)?;

        info!("received authorization code, exchanging for tokens");
        let exchanged = self
            .exchange_code(&code, &pkce.verifier, &redirect_uri)
            .await?;

        if exchanged.refresh_token.is_none() {
            warn!("Google returned no refresh token; the access token cannot be renewed");
        }

        let mut token = TokenInfo::new(
            exchanged.access_token,
            exchanged.refresh_token,
            exchanged.expires_in,
            Utc::now(),
        );
        token.scopes = scopes.to_vec();
        token.client_id = Some(self.credentials.client_id.clone());
        token.client_secret = Some(self.credentials.client_secret.clone());
        Ok(token)
    }

    /// Exchanges `refresh_token` for a new access token.
    ///
    /// A revoked or expired refresh token (`invalid_grant`) is an
    /// authentication failure: only a new consent step fixes it.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let (status, body) = self.post_form(&params).await?;
        if !status.is_success() {
            return Err(refresh_error(status, &body));
        }

        let token = parse_refreshed(&body)?;
        info!("refreshed Google access token");
        Ok(token)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<ExchangedTokens> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let (status, body) = self.post_form(&params).await?;
        if !status.is_success() {
            return Err(exchange_error(status, &body));
        }

        let tokens = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })?;
        info!("obtained Google tokens");
        Ok(tokens)
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> ProviderResult<(StatusCode, String)> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read token response: {}", e)))?;
        Ok((status, body))
    }
}

/// PKCE verifier, challenge and CSRF state for one consent attempt.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    /// Base64url SHA-256 of the verifier.
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent page URL.
    ///
    /// Offline access with a forced consent prompt makes Google issue a
    /// refresh token even for an account that consented before.
    pub fn build_auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn bind_loopback(port: u16) -> ProviderResult<(TcpListener, u16)> {
    let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
        ProviderError::configuration(format!("cannot listen on 127.0.0.1:{}: {}", port, e))
    })?;
    let port = listener
        .local_addr()
        .map_err(|e| ProviderError::internal("loopback server has no address").with_source(e))?
        .port();
    debug!("loopback server listening on port {}", port);
    Ok((listener, port))
}

/// Serves requests until one reaches `/callback`, or the timeout expires.
fn wait_for_callback(listener: TcpListener) -> ProviderResult<Callback> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_connection(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authentication(
            "timed out waiting for the browser to complete the consent step",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback server stopped unexpectedly"))
        }
    }
}

fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let result = parse_callback(&request_line)?;
    let page = match &result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization complete</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(page.as_bytes());
    let _ = stream.flush();

    Some(result)
}

/// Query parameters Google sends back to the loopback redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: Option<String>,
}

impl Callback {
    /// Returns the authorization code if the state matches this attempt.
    fn into_code(self, expected_state: &str) -> ProviderResult<String> {
        if self.state.as_deref() != Some(expected_state) {
            return Err(ProviderError::authentication(
                "OAuth state mismatch; restart the consent step",
            ));
        }
        Ok(self.code)
    }
}

/// Parses an HTTP request line such as
/// `GET /callback?code=...&state=... HTTP/1.1`.
///
/// Returns `None` for requests that are not the redirect (a favicon fetch,
/// for one), so the server keeps waiting.
fn parse_callback(request_line: &str) -> Option<ProviderResult<Callback>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != "/callback" {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut denied = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => denied = Some(value),
            _ => {}
        }
    }

    if let Some(reason) = denied {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            reason
        ))));
    }

    Some(match code {
        Some(code) => Ok(Callback { code, state }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

fn parse_refreshed(body: &str) -> ProviderResult<RefreshedToken> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
}

fn refresh_error(status: StatusCode, body: &str) -> ProviderError {
    if status.is_server_error() {
        return ProviderError::server(format!("token endpoint returned {}", status));
    }

    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(err) if err.error == "invalid_grant" => ProviderError::authentication(
            "refresh token was revoked or expired; run `agendamail auth google --force`",
        ),
        Ok(err) if err.error == "invalid_client" => {
            ProviderError::configuration("OAuth client id or secret was rejected")
        }
        Ok(err) => ProviderError::authentication(format!(
            "token refresh failed ({}): {}",
            err.error,
            err.error_description.unwrap_or_default()
        )),
        Err(_) => ProviderError::authentication(format!("token refresh failed ({}): {}", status, body)),
    }
}

fn exchange_error(status: StatusCode, body: &str) -> ProviderError {
    if status.is_server_error() {
        return ProviderError::server(format!("token endpoint returned {}", status));
    }

    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(err) if err.error == "invalid_client" => {
            ProviderError::configuration("OAuth client id or secret was rejected")
        }
        Ok(err) => ProviderError::authentication(format!(
            "authorization code exchange failed ({}): {}",
            err.error,
            err.error_description.unwrap_or_default()
        )),
        Err(_) => ProviderError::authentication(format!(
            "authorization code exchange failed ({}): {}",
            status, body
        )),
    }
}
