//! OAuth token refresh
//!
//! One token endpoint interaction: the `refresh_token` grant. Spotify's
//! refresh grant authenticates the client with HTTP Basic auth
//! (base64 of `client_id:client_secret`) and returns a new short-lived
//! access token. Unlike the authorization-code grant it does not rotate
//! the refresh token, so the response's `refresh_token` field is absent
//! and the long-lived credential stays fixed for process lifetime.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Response from the token endpoint for the refresh grant.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchange a refresh token for a new access token.
///
/// POSTs `grant_type=refresh_token&refresh_token=...` to `token_url` with a
/// Basic authorization header built from the client credentials.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    refresh_token: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse> {
    let basic = BASE64.encode(format!("{client_id}:{client_secret}"));

    let response = client
        .post(token_url)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {basic}"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 400 invalid_grant / 401 mean the refresh token or client creds are bad
        if status.as_u16() == 400 || status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenRefresh(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenRefresh(format!("invalid refresh response: {e}")))
}
