//! SeaORM entity models for the integrations service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod client_registration;
pub mod pending_authorization;
pub mod provider_token;

pub use client_registration::Entity as ClientRegistration;
pub use pending_authorization::Entity as PendingAuthorization;
pub use provider_token::Entity as ProviderToken;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "projectos-integrations".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
