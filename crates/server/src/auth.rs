//! Identity-provider integration: authorization-code flow and sessions.
//!
//! The flow delegates entirely to the external authority. `/api/login`
//! stores a state nonce in the server-side session and redirects to the
//! authorization endpoint; the callback exchanges the code for tokens and
//! keeps the id-token claims in the session. The claims arrive directly from
//! the token endpoint over TLS, so the payload is decoded without a local
//! signature check.

use std::env;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use docstore::{documents, UserProfile};

use crate::error::ApiError;
use crate::state::AppState;

/// Session key holding the signed-in user's claims.
pub const SESSION_USER_KEY: &str = "user";

/// Session key holding the in-flight authorization state nonce.
const SESSION_FLOW_KEY: &str = "auth_flow";

/// Identity-provider configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Application (client) id.
    pub client_id: String,
    /// Client secret for the confidential client.
    pub client_secret: String,
    /// Authority base URL, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    /// Additional scope requested alongside `openid profile`.
    pub scope: String,
    /// Redirect URI registered for the callback.
    pub redirect_uri: String,
    /// Where the authority sends the browser after logout.
    pub post_logout_redirect_uri: String,
}

impl AuthConfig {
    /// Read configuration from the environment.
    ///
    /// Required: `CLIENT_ID`, `CLIENT_SECRET`, `AUTHORITY`. Optional:
    /// `SCOPE` (default "User.Read"), `REDIRECT_URI` (default
    /// `http://localhost:8000/auth/callback`), `POST_LOGOUT_REDIRECT_URI`
    /// (default `http://localhost:8000/`). Returns `None` when any required
    /// variable is absent; login then runs disabled instead of failing
    /// startup.
    pub fn from_env() -> Option<Self> {
        let client_id = env::var("CLIENT_ID").ok()?;
        let client_secret = env::var("CLIENT_SECRET").ok()?;
        let authority = env::var("AUTHORITY").ok()?;

        let scope = env::var("SCOPE").unwrap_or_else(|_| "User.Read".to_string());
        let redirect_uri = env::var("REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8000/auth/callback".to_string());
        let post_logout_redirect_uri = env::var("POST_LOGOUT_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8000/".to_string());

        Some(Self {
            client_id,
            client_secret,
            authority: authority.trim_end_matches('/').to_string(),
            scope,
            redirect_uri,
            post_logout_redirect_uri,
        })
    }

    /// Full scope string for the code flow.
    fn full_scope(&self) -> String {
        format!("openid profile {}", self.scope)
    }
}

/// Claims kept in the server-side session after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Opaque user identifier from the authority; the partition key for
    /// every document the user owns.
    pub oid: String,
    /// Display name, if present in the token.
    #[serde(default)]
    pub name: Option<String>,
    /// Sign-in name, usually an email address.
    #[serde(default)]
    pub preferred_username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthFlow {
    state: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Get the signed-in user from the session, if any.
pub async fn current_user(session: &tower_sessions::Session) -> Result<Option<UserClaims>, ApiError> {
    Ok(session.get::<UserClaims>(SESSION_USER_KEY).await?)
}

/// Get the signed-in user or reject with 401.
pub async fn require_user(session: &tower_sessions::Session) -> Result<UserClaims, ApiError> {
    current_user(session).await?.ok_or(ApiError::Unauthorized)
}

/// `GET /api/login` - start the authorization-code flow.
pub async fn login(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Redirect, ApiError> {
    let Some(config) = state.auth.as_deref() else {
        return Err(ApiError::Unavailable("login is not configured".to_string()));
    };

    let flow_state = Uuid::new_v4().to_string();
    session
        .insert(SESSION_FLOW_KEY, &AuthFlow { state: flow_state.clone() })
        .await?;

    let url = build_authorize_url(config, &flow_state)?;

    Ok(Redirect::to(url.as_str()))
}

/// `GET /auth/callback` - finish the code flow and establish the session.
pub async fn callback(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let Some(config) = state.auth.clone() else {
        return Err(ApiError::Unavailable("login is not configured".to_string()));
    };

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        return Err(ApiError::BadRequest(format!(
            "authorization failed: {} {}",
            error, description
        )));
    }

    let flow: Option<AuthFlow> = session.remove(SESSION_FLOW_KEY).await?;
    let valid_state = matches!((&flow, &params.state), (Some(flow), Some(state)) if &flow.state == state);
    if !valid_state {
        return Err(ApiError::BadRequest("auth flow state mismatch".to_string()));
    }

    let Some(code) = params.code else {
        return Err(ApiError::BadRequest("missing authorization code".to_string()));
    };

    let claims = exchange_code(&state.http, &config, &code).await?;
    info!(oid = %claims.oid, "User signed in");
    session.insert(SESSION_USER_KEY, &claims).await?;

    ensure_profile(&state, &claims).await;

    Ok(Redirect::to("/"))
}

/// `GET /api/logout` - clear the session and sign out at the authority.
pub async fn logout(
    State(state): State<AppState>,
    session: tower_sessions::Session,
) -> Result<Redirect, ApiError> {
    session.flush().await?;

    let Some(config) = state.auth.as_deref() else {
        return Ok(Redirect::to("/"));
    };

    let mut url = Url::parse(&format!("{}/oauth2/v2.0/logout", config.authority))
        .map_err(|e| ApiError::Internal(format!("invalid authority URL: {}", e)))?;
    url.query_pairs_mut().append_pair(
        "post_logout_redirect_uri",
        &config.post_logout_redirect_uri,
    );

    Ok(Redirect::to(url.as_str()))
}

fn build_authorize_url(config: &AuthConfig, flow_state: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!("{}/oauth2/v2.0/authorize", config.authority))
        .map_err(|e| ApiError::Internal(format!("invalid authority URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("response_mode", "query")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.full_scope())
        .append_pair("state", flow_state);
    Ok(url)
}

async fn exchange_code(
    http: &reqwest::Client,
    config: &AuthConfig,
    code: &str,
) -> Result<UserClaims, ApiError> {
    let token_url = format!("{}/oauth2/v2.0/token", config.authority);

    let response = http
        .post(&token_url)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", config.full_scope().as_str()),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Internal(format!("token exchange failed: {}", e)))?;

    let status = response.status();
    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("invalid token response: {}", e)))?;

    if !status.is_success() {
        return Err(ApiError::Internal(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.error_description.unwrap_or_default()
        )));
    }

    let Some(id_token) = body.id_token else {
        return Err(ApiError::Internal("token response without id_token".to_string()));
    };

    decode_id_token_claims(&id_token)
        .map_err(|e| ApiError::Internal(format!("invalid id_token: {}", e)))
}

/// Decode the claims segment of a JWT without verifying the signature.
fn decode_id_token_claims(token: &str) -> Result<UserClaims, String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| "token has no payload segment".to_string())?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| format!("payload is not base64url: {}", e))?;

    serde_json::from_slice(&bytes).map_err(|e| format!("payload is not valid claims: {}", e))
}

/// Create the user's profile document on first login.
///
/// Persistence failures are logged and swallowed; a broken store must not
/// block sign-in.
async fn ensure_profile(state: &AppState, claims: &UserClaims) {
    let profile = UserProfile::initial(
        &claims.oid,
        claims.name.as_deref().unwrap_or(""),
        claims.preferred_username.as_deref().unwrap_or(""),
    );

    match documents::create_profile_if_absent(state.store.pool(), &profile).await {
        Ok(true) => info!(oid = %claims.oid, "Created initial profile"),
        Ok(false) => {}
        Err(err) => warn!(oid = %claims.oid, error = %err, "Failed to ensure profile"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            authority: "https://login.example.com/tenant".to_string(),
            scope: "User.Read".to_string(),
            redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            post_logout_redirect_uri: "http://localhost:8000/".to_string(),
        }
    }

    #[test]
    fn test_build_authorize_url() {
        let url = build_authorize_url(&test_config(), "nonce-1").unwrap();
        assert!(url.as_str().starts_with("https://login.example.com/tenant/oauth2/v2.0/authorize?"));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid profile User.Read".to_string())));
        assert!(pairs.contains(&("state".to_string(), "nonce-1".to_string())));
    }

    #[test]
    fn test_decode_id_token_claims() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            r#"{"oid":"user-1","name":"Jorge","preferred_username":"jorge@example.com","aud":"x"}"#,
        );
        let token = format!("{}.{}.signature", header, payload);

        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.oid, "user-1");
        assert_eq!(claims.name.as_deref(), Some("Jorge"));
        assert_eq!(claims.preferred_username.as_deref(), Some("jorge@example.com"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_id_token_claims("not-a-jwt").is_err());
        assert!(decode_id_token_claims("a.%%%.c").is_err());
    }
}
