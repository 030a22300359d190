//! OAuth client registration entity.
//!
//! Stores the result of dynamic client registration against a provider's
//! registration endpoint. One global row per provider, shared by all users
//! of the deployment; invalidated whenever the computed redirect URI stops
//! matching the stored one.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_client_registrations")]
pub struct Model {
    /// Provider slug, one registration per provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub provider: String,

    pub client_id: String,

    /// Absent for public PKCE clients registered with
    /// `token_endpoint_auth_method: none`
    pub client_secret: Option<String>,

    /// Redirect URI the client was registered with; reuse requires a
    /// byte-for-byte match
    pub redirect_uri: String,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
