//! HTTP endpoint handlers.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod callback;
pub mod connect;
pub mod connections;
pub mod meetings;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}
