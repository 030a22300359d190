//! Granola OAuth client.
//!
//! Discovers the authorization-server metadata from a well-known URL,
//! performs dynamic client registration (RFC 7591) as a public PKCE client,
//! builds authorize URLs, and exchanges authorization codes for tokens. The
//! registration is a single row shared by every user of the deployment and
//! is invalidated whenever the computed redirect URI stops matching the one
//! it was registered with.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::client_registration::Model as ClientRegistration;
use crate::oauth::{GRANOLA_PROVIDER_SLUG, TokenResponse, truncate_body};
use crate::pkce;
use crate::repositories::client_registration::ClientRegistrationRepository;
use crate::repositories::provider_token::ProviderTokenRepository;

const DEFAULT_SCOPE: &str = "openid profile email offline_access";
const CLIENT_NAME: &str = "Project OS";

#[derive(Debug, Error)]
pub enum GranolaOAuthError {
    #[error("authorization server discovery failed: {reason}")]
    Discovery { reason: String },
    #[error("dynamic client registration failed with status {status}: {body}")]
    Registration { status: u16, body: String },
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },
    #[error("no client registration found; restart the connect flow")]
    MissingRegistration,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

/// Authorization-server metadata from the well-known discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: String,
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
}

impl AuthorizationServerMetadata {
    /// Space-joined scope parameter, falling back to a fixed default when
    /// the server does not advertise its scopes.
    pub fn scope_param(&self) -> String {
        match &self.scopes_supported {
            Some(scopes) if !scopes.is_empty() => scopes.join(" "),
            _ => DEFAULT_SCOPE.to_string(),
        }
    }
}

/// TTL cache for the discovery document.
///
/// The metadata is effectively static for the life of a deployment; the TTL
/// exists so a long-running process eventually notices endpoint moves
/// without a restart.
pub struct DiscoveryCache {
    entry: RwLock<Option<(Instant, AuthorizationServerMetadata)>>,
    ttl: Duration,
}

impl DiscoveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    async fn get(&self) -> Option<AuthorizationServerMetadata> {
        let guard = self.entry.read().await;
        match guard.as_ref() {
            Some((fetched_at, metadata)) if fetched_at.elapsed() < self.ttl => {
                Some(metadata.clone())
            }
            _ => None,
        }
    }

    async fn put(&self, metadata: AuthorizationServerMetadata) {
        *self.entry.write().await = Some((Instant::now(), metadata));
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

pub struct GranolaOAuth {
    config: Arc<AppConfig>,
    http: reqwest::Client,
    registrations: ClientRegistrationRepository,
    tokens: ProviderTokenRepository,
    discovery: DiscoveryCache,
}

impl GranolaOAuth {
    pub fn new(
        config: Arc<AppConfig>,
        http: reqwest::Client,
        registrations: ClientRegistrationRepository,
        tokens: ProviderTokenRepository,
        discovery: DiscoveryCache,
    ) -> Self {
        Self {
            config,
            http,
            registrations,
            tokens,
            discovery,
        }
    }

    /// Fetch the authorization-server metadata, serving from cache when fresh.
    pub async fn metadata(&self) -> Result<AuthorizationServerMetadata, GranolaOAuthError> {
        if let Some(metadata) = self.discovery.get().await {
            return Ok(metadata);
        }

        let response = self
            .http
            .get(&self.config.granola_discovery_url)
            .send()
            .await
            .map_err(|e| GranolaOAuthError::Discovery {
                reason: format!("discovery endpoint unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(GranolaOAuthError::Discovery {
                reason: format!("discovery endpoint returned status {}", response.status()),
            });
        }

        let metadata: AuthorizationServerMetadata =
            response
                .json()
                .await
                .map_err(|e| GranolaOAuthError::Discovery {
                    reason: format!("invalid discovery document: {}", e),
                })?;

        self.discovery.put(metadata.clone()).await;
        Ok(metadata)
    }

    /// Return the stored client registration if its redirect URI matches
    /// byte-for-byte; otherwise clear it and register a fresh client.
    pub async fn get_or_register_client(
        &self,
        redirect_uri: &str,
    ) -> Result<ClientRegistration, GranolaOAuthError> {
        if let Some(existing) = self.registrations.get(GRANOLA_PROVIDER_SLUG).await? {
            if existing.redirect_uri == redirect_uri {
                return Ok(existing);
            }
            info!(
                stored = %existing.redirect_uri,
                computed = %redirect_uri,
                "redirect URI changed, discarding stale client registration"
            );
            self.registrations.clear(GRANOLA_PROVIDER_SLUG).await?;
        }

        let metadata = self.metadata().await?;
        let registered = self.register_client(&metadata, redirect_uri).await?;

        self.registrations
            .upsert(
                GRANOLA_PROVIDER_SLUG,
                &registered.client_id,
                registered.client_secret.as_deref(),
                redirect_uri,
            )
            .await?;
        counter!("granola_client_registrations_total").increment(1);

        self.registrations
            .get(GRANOLA_PROVIDER_SLUG)
            .await?
            .ok_or_else(|| GranolaOAuthError::Internal(anyhow::anyhow!("registration not persisted")))
    }

    async fn register_client(
        &self,
        metadata: &AuthorizationServerMetadata,
        redirect_uri: &str,
    ) -> Result<RegistrationResponse, GranolaOAuthError> {
        let body = json!({
            "redirect_uris": [redirect_uri],
            "client_name": CLIENT_NAME,
            "scope": metadata.scope_param(),
            "grant_types": ["authorization_code", "refresh_token"],
            "response_types": ["code"],
            "token_endpoint_auth_method": "none",
            "code_challenge_method": "S256",
            "application_type": "web",
        });

        let response = self
            .http
            .post(&metadata.registration_endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(GranolaOAuthError::Registration {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await.map_err(|e| {
            GranolaOAuthError::Registration {
                status: status.as_u16(),
                body: format!("invalid registration response: {}", e),
            }
        })?)
    }

    /// Compose the authorization URL for the registered client.
    pub async fn build_authorize_url(
        &self,
        redirect_uri: &str,
        state: &str,
        code_verifier: &str,
    ) -> Result<Url, GranolaOAuthError> {
        let metadata = self.metadata().await?;
        let registration = self.get_or_register_client(redirect_uri).await?;

        let mut url = Url::parse(&metadata.authorization_endpoint).map_err(|e| {
            GranolaOAuthError::Discovery {
                reason: format!("invalid authorization endpoint: {}", e),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &registration.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &metadata.scope_param())
            .append_pair("state", state)
            .append_pair("code_challenge", &pkce::code_challenge(code_verifier))
            .append_pair("code_challenge_method", "S256");

        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Authorization codes are single-use; failures are surfaced, never
    /// retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, GranolaOAuthError> {
        let metadata = self.metadata().await?;
        let registration = self
            .registrations
            .get(GRANOLA_PROVIDER_SLUG)
            .await?
            .ok_or(GranolaOAuthError::MissingRegistration)?;

        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", registration.client_id.clone()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("code_verifier", code_verifier.to_string()),
        ];
        if let Some(secret) = &registration.client_secret {
            form.push(("client_secret", secret.clone()));
        }

        let response = self
            .http
            .post(&metadata.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default());
            return Err(GranolaOAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .json()
            .await
            .map_err(|e| GranolaOAuthError::TokenExchange {
                status: status.as_u16(),
                body: format!("invalid token response: {}", e),
            })?)
    }

    /// Resolve an access token for MCP calls.
    ///
    /// The stored OAuth token is used while fresh; an expired token without
    /// refresh support means "not connected", at which point the statically
    /// configured bearer token (if any) is the fallback.
    pub async fn access_token(&self, user_id: Uuid) -> Option<String> {
        match self.tokens.get(user_id, GRANOLA_PROVIDER_SLUG).await {
            Ok(Some(token)) => {
                if !token.is_expired(chrono::Utc::now()) {
                    return Some(token.access_token);
                }
                warn!(
                    user_id = %user_id,
                    "stored Granola token is expired and the provider issues no refresh tokens yet"
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load stored Granola token");
            }
        }

        self.config.granola_mcp_token.clone()
    }

    /// Clear the global client registration and this user's token row.
    pub async fn reset(&self, user_id: Uuid) -> Result<(), GranolaOAuthError> {
        self.registrations.clear(GRANOLA_PROVIDER_SLUG).await?;
        self.discovery.invalidate().await;
        self.tokens.delete(user_id, GRANOLA_PROVIDER_SLUG).await?;
        info!(user_id = %user_id, "Granola connection reset");
        Ok(())
    }
}

impl From<GranolaOAuthError> for crate::error::ApiError {
    fn from(error: GranolaOAuthError) -> Self {
        use crate::error::{ApiError, provider_error};
        use axum::http::StatusCode;

        match error {
            GranolaOAuthError::Discovery { reason } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                format!("Granola discovery failed: {}", reason),
            ),
            GranolaOAuthError::Registration { status, body }
            | GranolaOAuthError::TokenExchange { status, body } => {
                provider_error(GRANOLA_PROVIDER_SLUG, status, Some(body))
            }
            GranolaOAuthError::MissingRegistration => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "No client registration found; restart the connect flow",
            ),
            GranolaOAuthError::Network(e) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                format!("Granola request failed: {}", e),
            ),
            GranolaOAuthError::Db(e) => e.into(),
            GranolaOAuthError::Internal(e) => e.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_param_defaults_when_unadvertised() {
        let metadata = AuthorizationServerMetadata {
            authorization_endpoint: "https://auth.example/authorize".to_string(),
            token_endpoint: "https://auth.example/token".to_string(),
            registration_endpoint: "https://auth.example/register".to_string(),
            scopes_supported: None,
        };
        assert_eq!(metadata.scope_param(), "openid profile email offline_access");

        let empty = AuthorizationServerMetadata {
            scopes_supported: Some(vec![]),
            ..metadata.clone()
        };
        assert_eq!(empty.scope_param(), "openid profile email offline_access");
    }

    #[test]
    fn test_scope_param_joins_advertised_scopes() {
        let metadata = AuthorizationServerMetadata {
            authorization_endpoint: "https://auth.example/authorize".to_string(),
            token_endpoint: "https://auth.example/token".to_string(),
            registration_endpoint: "https://auth.example/register".to_string(),
            scopes_supported: Some(vec!["openid".to_string(), "meetings".to_string()]),
        };
        assert_eq!(metadata.scope_param(), "openid meetings");
    }

    #[tokio::test]
    async fn test_discovery_cache_expires() {
        let cache = DiscoveryCache::new(Duration::from_millis(20));
        let metadata = AuthorizationServerMetadata {
            authorization_endpoint: "https://auth.example/authorize".to_string(),
            token_endpoint: "https://auth.example/token".to_string(),
            registration_endpoint: "https://auth.example/register".to_string(),
            scopes_supported: None,
        };

        cache.put(metadata).await;
        assert!(cache.get().await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get().await.is_none());
    }
}
