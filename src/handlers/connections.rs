//! Connection status and reset handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::handlers::connect::ProviderPath;
use crate::oauth::Provider;
use crate::server::AppState;

/// Connection status for one provider, without any token material.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionInfo {
    /// Provider slug
    pub provider: String,
    /// "connected", "expired", or "disconnected"
    pub status: String,
    /// Access-token expiry, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionInfo>,
}

/// List the user's provider connections.
#[utoipa::path(
    get,
    path = "/connections",
    params(UserHeader),
    responses(
        (status = 200, description = "Connection status per provider", body = ConnectionsResponse),
        (status = 401, description = "Missing user identity", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn list_connections(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ConnectionsResponse>, ApiError> {
    let repo = state.token_repo();
    let now = Utc::now();
    let mut connections = Vec::new();

    for provider in Provider::all() {
        let row = repo.exists(user_id, provider.slug()).await?;
        let info = match row {
            None => ConnectionInfo {
                provider: provider.slug().to_string(),
                status: "disconnected".to_string(),
                expires_at: None,
            },
            Some(row) => {
                let expired = row.expires_at.is_some_and(|at| at <= now);
                // An expired token with a refresh token still counts as
                // connected; it refreshes transparently on next use.
                let status = if expired && row.refresh_token_ciphertext.is_none() {
                    "expired"
                } else {
                    "connected"
                };
                ConnectionInfo {
                    provider: provider.slug().to_string(),
                    status: status.to_string(),
                    expires_at: row.expires_at.map(|at| at.to_rfc3339()),
                }
            }
        };
        connections.push(info);
    }

    Ok(Json(ConnectionsResponse { connections }))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetResponse {
    pub provider: String,
    pub reset: bool,
}

/// Disconnect a provider, deleting the user's stored tokens.
///
/// For Granola this also clears the deployment-wide client registration so
/// the next connect performs a fresh dynamic registration.
#[utoipa::path(
    delete,
    path = "/connections/{provider}",
    params(
        ("provider" = String, Path, description = "Provider identifier"),
        UserHeader
    ),
    responses(
        (status = 200, description = "Connection reset", body = ResetResponse),
        (status = 401, description = "Missing user identity", body = ApiError),
        (status = 404, description = "Provider not found", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn reset_connection(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(provider_path): Path<ProviderPath>,
) -> Result<Json<ResetResponse>, ApiError> {
    let provider: Provider = provider_path.provider.parse().map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("provider '{}' not found", provider_path.provider),
        )
    })?;

    match provider {
        Provider::Granola => state.granola.reset(user_id).await?,
        Provider::GoogleCalendar => {
            state.google.reset(user_id).await?;
        }
    }

    info!(user_id = %user_id, provider = %provider, "connection reset");
    Ok(Json(ResetResponse {
        provider: provider.slug().to_string(),
        reset: true,
    }))
}
