//! Pending authorization entity.
//!
//! One row per initiated OAuth connect flow, keyed by the opaque `state`
//! token. Rows are single-use: the callback handler consumes (reads and
//! deletes) the row matching its `state`, and abandoned rows are removed by
//! the expiry sweeper.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_authorizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,

    /// User who initiated the connect flow
    pub user_id: Uuid,

    /// Provider slug ("granola", "google-calendar")
    pub provider: String,

    /// Opaque CSRF-binding token, the lookup key for the callback
    pub state: String,

    /// PKCE code verifier held server-side until the code exchange
    pub code_verifier: String,

    /// Where to send the browser after a successful callback
    pub return_path: Option<String>,

    pub expires_at: chrono::DateTime<chrono::Utc>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
