//! Client-registration repository.
//!
//! One global row per provider holding the dynamic client registration
//! result. Two racing first-time registrations both upsert; last writer
//! wins, which is acceptable for a one-time bootstrap.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;

use crate::models::client_registration::{self, ActiveModel, Entity, Model};

pub struct ClientRegistrationRepository {
    db: Arc<DatabaseConnection>,
}

impl ClientRegistrationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, provider: &str) -> Result<Option<Model>, sea_orm::DbErr> {
        Entity::find_by_id(provider.to_string()).one(&*self.db).await
    }

    /// Store (or replace) the registration for a provider.
    pub async fn upsert(
        &self,
        provider: &str,
        client_id: &str,
        client_secret: Option<&str>,
        redirect_uri: &str,
    ) -> Result<(), sea_orm::DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            provider: Set(provider.to_string()),
            client_id: Set(client_id.to_string()),
            client_secret: Set(client_secret.map(str::to_string)),
            redirect_uri: Set(redirect_uri.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::column(client_registration::Column::Provider)
                    .update_columns([
                        client_registration::Column::ClientId,
                        client_registration::Column::ClientSecret,
                        client_registration::Column::RedirectUri,
                        client_registration::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(())
    }

    /// Remove the stored registration, forcing a fresh DCR on next connect.
    pub async fn clear(&self, provider: &str) -> Result<bool, sea_orm::DbErr> {
        let result = Entity::delete_by_id(provider.to_string())
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
