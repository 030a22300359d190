//! Pending-authorization repository.
//!
//! Persists the short-lived `state -> {code_verifier, user_id, return_path}`
//! mapping created when a connect flow starts. Consumption is one-shot: the
//! row is deleted as it is read, and a second consume of the same state
//! returns nothing. Expired rows are invisible to `consume` and reaped by
//! the sweeper.

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::pending_authorization::{self, Entity, Model};

pub struct PendingAuthorizationRepository {
    db: Arc<DatabaseConnection>,
}

impl PendingAuthorizationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new pending authorization with the given TTL.
    pub async fn create(
        &self,
        user_id: Uuid,
        provider: &str,
        state: &str,
        code_verifier: &str,
        return_path: Option<String>,
        ttl_minutes: i64,
    ) -> Result<Model, sea_orm::DbErr> {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            user_id,
            provider: provider.to_string(),
            state: state.to_string(),
            code_verifier: code_verifier.to_string(),
            return_path,
            expires_at: now + Duration::minutes(ttl_minutes),
            created_at: now,
        };

        // exec_without_returning sidesteps SeaORM's UUID last-insert-id
        // handling on SQLite; the id is known up front anyway
        Entity::insert(model.clone().into_active_model())
            .exec_without_returning(&*self.db)
            .await?;

        Ok(model)
    }

    /// Atomically read and delete the unexpired record matching `state`.
    ///
    /// Returns `None` for unknown, expired, or already-consumed states.
    /// Under concurrent calls, the delete's rows_affected guard ensures at
    /// most one caller observes the record.
    pub async fn consume(
        &self,
        provider: &str,
        state: &str,
    ) -> Result<Option<Model>, sea_orm::DbErr> {
        let found = Entity::find()
            .filter(pending_authorization::Column::Provider.eq(provider))
            .filter(pending_authorization::Column::State.eq(state))
            .filter(pending_authorization::Column::ExpiresAt.gt(Utc::now()))
            .one(&*self.db)
            .await?;

        let Some(model) = found else {
            return Ok(None);
        };

        let deleted = Entity::delete_by_id(model.id).exec(&*self.db).await?;
        if deleted.rows_affected == 0 {
            // Another consumer won the race for this state
            return Ok(None);
        }

        Ok(Some(model))
    }

    /// Delete a specific record, e.g. when a connect flow fails after the
    /// record was created.
    pub async fn delete_by_id(&self, id: Uuid) -> Result<bool, sea_orm::DbErr> {
        let result = Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Delete expired records, returning how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u64, sea_orm::DbErr> {
        let result = Entity::delete_many()
            .filter(pending_authorization::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
