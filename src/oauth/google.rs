//! Google Calendar OAuth client.
//!
//! Uses a statically configured client (no dynamic registration) with PKCE,
//! and supports `refresh_token` grants. `access_token` deliberately
//! collapses every failure mode to `None`: callers only need to know
//! "connected or not", while the root cause is preserved in logs and
//! metrics.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::oauth::{GOOGLE_CALENDAR_PROVIDER_SLUG, TokenResponse, truncate_body};
use crate::pkce;
use crate::repositories::provider_token::ProviderTokenRepository;

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

#[derive(Debug, Error)]
pub enum GoogleOAuthError {
    #[error("Google Calendar client is not configured")]
    NotConfigured,
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

pub struct GoogleOAuth {
    config: Arc<AppConfig>,
    http: reqwest::Client,
    tokens: ProviderTokenRepository,
}

impl GoogleOAuth {
    pub fn new(
        config: Arc<AppConfig>,
        http: reqwest::Client,
        tokens: ProviderTokenRepository,
    ) -> Self {
        Self {
            config,
            http,
            tokens,
        }
    }

    /// Whether enough configuration exists to run the flow at all.
    pub fn is_configured(&self) -> bool {
        self.config.google_client_id.is_some()
            && self
                .config
                .redirect_uri(GOOGLE_CALENDAR_PROVIDER_SLUG)
                .is_some()
    }

    /// Compose the authorization URL.
    ///
    /// Returns `None` when the client id or application origin is missing;
    /// that is a configuration condition the caller reports, not an error.
    pub fn build_authorize_url(&self, state: &str, code_verifier: &str) -> Option<Url> {
        let client_id = self.config.google_client_id.as_ref()?;
        let redirect_uri = self.config.redirect_uri(GOOGLE_CALENDAR_PROVIDER_SLUG)?;

        let mut url =
            Url::parse(&format!("{}/o/oauth2/v2/auth", self.config.google_oauth_base)).ok()?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("scope", CALENDAR_SCOPE)
            // offline + consent so Google issues a refresh token on first grant
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state)
            .append_pair("code_challenge", &pkce::code_challenge(code_verifier))
            .append_pair("code_challenge_method", "S256");

        Some(url)
    }

    /// Exchange an authorization code for tokens. Codes are single-use;
    /// failures surface to the caller and are never retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, GoogleOAuthError> {
        let client_id = self
            .config
            .google_client_id
            .as_ref()
            .ok_or(GoogleOAuthError::NotConfigured)?;
        let redirect_uri = self
            .config
            .redirect_uri(GOOGLE_CALENDAR_PROVIDER_SLUG)
            .ok_or(GoogleOAuthError::NotConfigured)?;

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", client_id.clone()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier.to_string()),
        ];
        if let Some(secret) = &self.config.google_client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .post(format!("{}/token", self.config.google_token_base))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(GoogleOAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .json()
            .await
            .map_err(|e| GoogleOAuthError::TokenExchange {
                status: status.as_u16(),
                body: format!("invalid token response: {}", e),
            })?)
    }

    /// Resolve a usable access token for the user, refreshing if necessary.
    ///
    /// Every failure mode (unconfigured, no token, no refresh token,
    /// refresh rejected, network error) returns `None`; callers treat that
    /// uniformly as "not connected".
    pub async fn access_token(&self, user_id: Uuid) -> Option<String> {
        let token = match self.tokens.get(user_id, GOOGLE_CALENDAR_PROVIDER_SLUG).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(user_id = %user_id, "no Google Calendar token stored");
                return None;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load Google Calendar token");
                return None;
            }
        };

        if !token.is_expired(Utc::now()) {
            return Some(token.access_token);
        }

        let Some(refresh_token) = token.refresh_token else {
            warn!(
                user_id = %user_id,
                "Google Calendar token expired with no refresh token; reconnect required"
            );
            return None;
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                // Google may omit the refresh token on refresh responses;
                // keep the one we already hold in that case.
                let next_refresh = refreshed
                    .refresh_token
                    .as_deref()
                    .unwrap_or(refresh_token.as_str());

                if let Err(e) = self
                    .tokens
                    .save(
                        user_id,
                        GOOGLE_CALENDAR_PROVIDER_SLUG,
                        &refreshed.access_token,
                        Some(next_refresh),
                        refreshed.expires_in,
                    )
                    .await
                {
                    warn!(user_id = %user_id, error = %e, "failed to persist refreshed Google token");
                    return None;
                }

                counter!("google_token_refresh_success_total").increment(1);
                Some(refreshed.access_token)
            }
            Err(e) => {
                counter!("google_token_refresh_failure_total").increment(1);
                warn!(user_id = %user_id, error = %e, "Google token refresh failed");
                None
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, GoogleOAuthError> {
        let client_id = self
            .config
            .google_client_id
            .as_ref()
            .ok_or(GoogleOAuthError::NotConfigured)?;

        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", client_id.clone()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if let Some(secret) = &self.config.google_client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .post(format!("{}/token", self.config.google_token_base))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(GoogleOAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .json()
            .await
            .map_err(|e| GoogleOAuthError::TokenExchange {
                status: status.as_u16(),
                body: format!("invalid refresh response: {}", e),
            })?)
    }

    /// Delete the user's stored token.
    pub async fn reset(&self, user_id: Uuid) -> Result<bool, GoogleOAuthError> {
        Ok(self
            .tokens
            .delete(user_id, GOOGLE_CALENDAR_PROVIDER_SLUG)
            .await?)
    }
}

impl From<GoogleOAuthError> for crate::error::ApiError {
    fn from(error: GoogleOAuthError) -> Self {
        use crate::error::{ApiError, not_configured, provider_error};
        use axum::http::StatusCode;

        match error {
            GoogleOAuthError::NotConfigured => not_configured(
                "Google Calendar is not configured: set PROJECTOS_GOOGLE_CLIENT_ID and PROJECTOS_APP_ORIGIN",
            ),
            GoogleOAuthError::TokenExchange { status, body } => {
                provider_error(GOOGLE_CALENDAR_PROVIDER_SLUG, status, Some(body))
            }
            GoogleOAuthError::Network(e) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                format!("Google request failed: {}", e),
            ),
            GoogleOAuthError::Internal(e) => e.into(),
        }
    }
}
