//! Connect-flow initiation handlers.
//!
//! `POST /connect/{provider}` creates the pending authorization record and
//! returns the provider authorize URL for the browser to navigate to.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{CurrentUser, UserHeader};
use crate::error::{ApiError, not_configured};
use crate::oauth::Provider;
use crate::pkce;
use crate::server::AppState;

/// Request path parameter for provider name
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProviderPath {
    /// Provider identifier ("granola" or "google-calendar")
    pub provider: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConnectQuery {
    /// Where to send the browser after the callback completes
    pub return_path: Option<String>,
}

/// OAuth authorization URL response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeUrlResponse {
    /// Complete authorization URL for user redirection
    pub authorize_url: String,
}

/// Start an OAuth connect flow for a provider.
#[utoipa::path(
    post,
    path = "/connect/{provider}",
    params(
        ("provider" = String, Path, description = "Provider identifier"),
        ConnectQuery,
        UserHeader
    ),
    responses(
        (status = 200, description = "Authorization URL generated", body = AuthorizeUrlResponse),
        (status = 401, description = "Missing user identity", body = ApiError),
        (status = 404, description = "Provider not found", body = ApiError),
        (status = 503, description = "Provider not configured", body = ApiError),
        (status = 502, description = "Provider discovery or registration failed", body = ApiError)
    ),
    tag = "connections"
)]
pub async fn start_connect(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(provider_path): Path<ProviderPath>,
    Query(query): Query<ConnectQuery>,
) -> Result<Json<AuthorizeUrlResponse>, ApiError> {
    let provider: Provider = provider_path.provider.parse().map_err(|_| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("provider '{}' not found", provider_path.provider),
        )
    })?;

    let redirect_uri = state.config.redirect_uri(provider.slug()).ok_or_else(|| {
        not_configured("application origin is not configured: set PROJECTOS_APP_ORIGIN")
    })?;

    let state_token = pkce::generate_state();
    let code_verifier = pkce::generate_code_verifier();

    let pending = state
        .pending_repo()
        .create(
            user_id,
            provider.slug(),
            &state_token,
            &code_verifier,
            query.return_path,
            state.config.pending_ttl_minutes,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to persist pending authorization");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Failed to create pending authorization",
            )
        })?;

    let authorize_url: Result<Url, ApiError> = match provider {
        Provider::Granola => state
            .granola
            .build_authorize_url(&redirect_uri, &state_token, &code_verifier)
            .await
            .map_err(ApiError::from),
        Provider::GoogleCalendar => state
            .google
            .build_authorize_url(&state_token, &code_verifier)
            .ok_or_else(|| {
                not_configured(
                    "Google Calendar is not configured: set PROJECTOS_GOOGLE_CLIENT_ID and PROJECTOS_APP_ORIGIN",
                )
            }),
    };

    let authorize_url = match authorize_url {
        Ok(url) => url,
        Err(err) => {
            // The pending record is useless without an authorize URL
            let _ = state.pending_repo().delete_by_id(pending.id).await;
            return Err(err);
        }
    };

    info!(
        user_id = %user_id,
        provider = %provider,
        pending_id = %pending.id,
        "connect flow initiated"
    );

    Ok(Json(AuthorizeUrlResponse {
        authorize_url: authorize_url.to_string(),
    }))
}
