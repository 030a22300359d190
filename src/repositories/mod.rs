//! Database repositories.

pub mod client_registration;
pub mod pending_authorization;
pub mod provider_token;
