//! Provider token entity.
//!
//! At most one row per `(user_id, provider)`, holding the encrypted access
//! and refresh tokens obtained from the provider's token endpoint. A row
//! with no `expires_at` is treated as never-expiring.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// Provider slug ("granola", "google-calendar")
    pub provider: String,

    /// AES-256-GCM ciphertext of the access token
    pub access_token_ciphertext: Vec<u8>,

    /// AES-256-GCM ciphertext of the refresh token, when the provider issued one
    pub refresh_token_ciphertext: Option<Vec<u8>>,

    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
