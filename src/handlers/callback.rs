//! OAuth callback handlers.
//!
//! Browser-facing: whatever happens, the response is a redirect back to the
//! app with the outcome in a query parameter. Raw error pages are never
//! rendered from this route.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::handlers::connect::ProviderPath;
use crate::models::pending_authorization::Model as PendingAuthorization;
use crate::oauth::Provider;
use crate::server::AppState;

/// Query parameters delivered by the provider redirect.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Handle the provider redirect for an OAuth connect flow.
#[utoipa::path(
    get,
    path = "/callback/{provider}",
    params(
        ("provider" = String, Path, description = "Provider identifier"),
        CallbackQuery
    ),
    responses(
        (status = 303, description = "Redirect back to the application with the outcome in the query string")
    ),
    tag = "connections"
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider_path): Path<ProviderPath>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let default_return = state.config.default_return_url();

    let Ok(provider) = provider_path.provider.parse::<Provider>() else {
        return redirect_error(
            &default_return,
            &format!("Unknown provider '{}'", provider_path.provider),
        );
    };

    // Provider-reported denial (user declined consent, etc.)
    if let Some(error) = &query.error {
        let message = query
            .error_description
            .clone()
            .unwrap_or_else(|| error.clone());
        warn!(provider = %provider, error = %error, "provider returned an error on callback");
        return redirect_error(&default_return, &message);
    }

    let (Some(code), Some(state_token)) = (&query.code, &query.state) else {
        return redirect_error(&default_return, "Missing code or state parameter");
    };

    let pending = match state
        .pending_repo()
        .consume(provider.slug(), state_token)
        .await
    {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            // Replayed, expired, or forged callback; the exchange must not run
            warn!(provider = %provider, "callback with unknown or expired state");
            return redirect_error(
                &default_return,
                "Invalid or expired state. Please retry connecting.",
            );
        }
        Err(err) => {
            warn!(provider = %provider, error = ?err, "failed to look up pending authorization");
            return redirect_error(&default_return, "Failed to validate the connect flow");
        }
    };

    let return_url = resolve_return_url(&state, &pending, &default_return);

    let exchanged = match provider {
        Provider::Granola => {
            let Some(redirect_uri) = state.config.redirect_uri(provider.slug()) else {
                return redirect_error(&return_url, "Application origin is not configured");
            };
            state
                .granola
                .exchange_code(code, &pending.code_verifier, &redirect_uri)
                .await
                .map_err(|e| e.to_string())
        }
        Provider::GoogleCalendar => state
            .google
            .exchange_code(code, &pending.code_verifier)
            .await
            .map_err(|e| e.to_string()),
    };

    let tokens = match exchanged {
        Ok(tokens) => tokens,
        Err(message) => {
            warn!(provider = %provider, error = %message, "code exchange failed");
            return redirect_error(&return_url, &message);
        }
    };

    if let Err(err) = state
        .token_repo()
        .save(
            pending.user_id,
            provider.slug(),
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
            tokens.expires_in,
        )
        .await
    {
        warn!(provider = %provider, error = %err, "failed to persist tokens");
        return redirect_error(&return_url, "Failed to store connection tokens");
    }

    info!(
        user_id = %pending.user_id,
        provider = %provider,
        "provider connected"
    );
    redirect_success(&return_url, provider.slug())
}

/// Prefer the return path captured at connect time; relative paths are
/// resolved against the configured application origin.
fn resolve_return_url(
    state: &AppState,
    pending: &PendingAuthorization,
    default_return: &str,
) -> String {
    match &pending.return_path {
        Some(path) if path.starts_with('/') => match &state.config.app_origin {
            Some(origin) => format!("{}{}", origin.trim_end_matches('/'), path),
            None => path.clone(),
        },
        Some(path) => path.clone(),
        None => default_return.to_string(),
    }
}

fn redirect_success(base: &str, provider_slug: &str) -> Redirect {
    Redirect::to(&with_query_param(base, "connected", provider_slug))
}

fn redirect_error(base: &str, message: &str) -> Redirect {
    Redirect::to(&with_query_param(base, "connect_error", message))
}

fn with_query_param(base: &str, key: &str, value: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, key, encoded)
}
