//! Request identity extraction.
//!
//! Session authentication lives upstream; the gateway injects the
//! authenticated user id as an `X-User-Id` header. This module only turns
//! that boundary into a typed extractor, not an authentication system.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{ApiError, unauthorized, validation_error};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated user on whose behalf a request runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

/// OpenAPI parameter description for the user header.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Header)]
pub struct UserHeader {
    /// Authenticated user id injected by the session gateway
    #[serde(rename = "X-User-Id")]
    pub x_user_id: Uuid,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| unauthorized(Some("Missing X-User-Id header")))?
            .to_str()
            .map_err(|_| {
                validation_error(
                    "Invalid user header",
                    serde_json::json!({ USER_ID_HEADER: "Header must be valid UTF-8" }),
                )
            })?;

        let user_id = header_value.parse::<Uuid>().map_err(|_| {
            validation_error(
                "Invalid user header",
                serde_json::json!({ USER_ID_HEADER: "Header must be a UUID" }),
            )
        })?;

        Ok(CurrentUser(user_id))
    }
}
