//! Meeting listing and transcript import handlers.
//!
//! These are the consumers of the MCP client: list the user's meetings from
//! the remote catalog and import a transcript with extracted action items.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::{ApiError, not_configured};
use crate::mcp::{McpClient, McpDocument};
use crate::server::AppState;
use crate::transcript::{self, TranscriptImport};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMeetingsQuery {
    /// Preferred MCP tool name, overriding the selection heuristic
    pub tool: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingsResponse {
    pub meetings: Vec<McpDocument>,
}

/// Path parameter for transcript import.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DocumentPath {
    pub document_id: String,
}

async fn mcp_client(state: &AppState, user_id: Uuid) -> Result<McpClient, ApiError> {
    let url = state.config.granola_mcp_url.clone().ok_or_else(|| {
        not_configured("Granola MCP endpoint is not configured: set PROJECTOS_GRANOLA_MCP_URL")
    })?;

    let token = state.granola.access_token(user_id).await;
    Ok(McpClient::new(state.http.clone(), url, token))
}

/// List meeting documents from the remote MCP catalog.
#[utoipa::path(
    get,
    path = "/meetings",
    params(ListMeetingsQuery, UserHeader),
    responses(
        (status = 200, description = "Meeting documents", body = MeetingsResponse),
        (status = 401, description = "Missing user identity", body = ApiError),
        (status = 502, description = "MCP endpoint failure", body = ApiError),
        (status = 503, description = "MCP endpoint not configured", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn list_meetings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListMeetingsQuery>,
) -> Result<Json<MeetingsResponse>, ApiError> {
    let client = mcp_client(&state, user_id).await?;
    let meetings = client.list_documents(query.tool.as_deref()).await?;

    Ok(Json(MeetingsResponse { meetings }))
}

/// Import a meeting transcript and extract action items.
#[utoipa::path(
    post,
    path = "/meetings/{document_id}/import",
    params(
        ("document_id" = String, Path, description = "Remote document identifier"),
        UserHeader
    ),
    responses(
        (status = 200, description = "Imported transcript", body = TranscriptImport),
        (status = 401, description = "Missing user identity", body = ApiError),
        (status = 502, description = "MCP endpoint failure", body = ApiError),
        (status = 503, description = "MCP endpoint not configured", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn import_meeting(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(path): Path<DocumentPath>,
) -> Result<Json<TranscriptImport>, ApiError> {
    let client = mcp_client(&state, user_id).await?;
    let imported = transcript::import_transcript(&client, &path.document_id).await?;

    info!(
        user_id = %user_id,
        document_id = %path.document_id,
        action_items = imported.action_items.len(),
        "transcript imported"
    );
    Ok(Json(imported))
}
