//! Provider-token repository.
//!
//! Upserts and reads the per-`(user, provider)` token row, encrypting token
//! material on the way in and decrypting on the way out.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{CryptoKey, decrypt_bytes, encrypt_bytes, token_aad};
use crate::models::provider_token::{self, ActiveModel, Entity, Model};

/// Decrypted view of a stored token row.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// A token with no expiry never counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct ProviderTokenRepository {
    db: Arc<DatabaseConnection>,
    crypto_key: CryptoKey,
}

impl ProviderTokenRepository {
    pub fn new(db: Arc<DatabaseConnection>, crypto_key: CryptoKey) -> Self {
        Self { db, crypto_key }
    }

    /// Upsert the token row for `(user_id, provider)`.
    ///
    /// `expires_in` is the provider-reported lifetime in seconds; absent
    /// means the token is treated as never-expiring.
    pub async fn save(
        &self,
        user_id: Uuid,
        provider: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: Option<i64>,
    ) -> Result<()> {
        let now = Utc::now();
        let aad = token_aad(user_id, provider);

        let access_ciphertext = encrypt_bytes(&self.crypto_key, &aad, access_token.as_bytes())
            .map_err(|e| anyhow!("token encryption failed: {}", e))?;
        let refresh_ciphertext = refresh_token
            .map(|token| encrypt_bytes(&self.crypto_key, &aad, token.as_bytes()))
            .transpose()
            .map_err(|e| anyhow!("token encryption failed: {}", e))?;

        let active = ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            provider: Set(provider.to_string()),
            access_token_ciphertext: Set(access_ciphertext),
            refresh_token_ciphertext: Set(refresh_ciphertext),
            expires_at: Set(expires_in.map(|secs| now + Duration::seconds(secs))),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    provider_token::Column::UserId,
                    provider_token::Column::Provider,
                ])
                .update_columns([
                    provider_token::Column::AccessTokenCiphertext,
                    provider_token::Column::RefreshTokenCiphertext,
                    provider_token::Column::ExpiresAt,
                    provider_token::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(())
    }

    /// Fetch and decrypt the token row for `(user_id, provider)`.
    pub async fn get(&self, user_id: Uuid, provider: &str) -> Result<Option<StoredToken>> {
        let Some(model) = self.find_row(user_id, provider).await? else {
            return Ok(None);
        };

        let aad = token_aad(user_id, provider);
        let access_token = decrypt_bytes(&self.crypto_key, &aad, &model.access_token_ciphertext)
            .map_err(|e| {
                tracing::error!(
                    user_id = %user_id,
                    provider = %provider,
                    "access token decryption failed"
                );
                anyhow!("token decryption failed: {}", e)
            })?;
        let refresh_token = model
            .refresh_token_ciphertext
            .as_deref()
            .map(|ciphertext| decrypt_bytes(&self.crypto_key, &aad, ciphertext))
            .transpose()
            .map_err(|e| anyhow!("token decryption failed: {}", e))?;

        Ok(Some(StoredToken {
            access_token: String::from_utf8(access_token)?,
            refresh_token: refresh_token.map(String::from_utf8).transpose()?,
            expires_at: model.expires_at,
        }))
    }

    /// Whether any token row exists for `(user_id, provider)`.
    pub async fn exists(&self, user_id: Uuid, provider: &str) -> Result<Option<Model>> {
        self.find_row(user_id, provider).await
    }

    /// Delete the token row; returns whether a row was removed.
    pub async fn delete(&self, user_id: Uuid, provider: &str) -> Result<bool> {
        let result = Entity::delete_many()
            .filter(provider_token::Column::UserId.eq(user_id))
            .filter(provider_token::Column::Provider.eq(provider))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn find_row(&self, user_id: Uuid, provider: &str) -> Result<Option<Model>> {
        Ok(Entity::find()
            .filter(provider_token::Column::UserId.eq(user_id))
            .filter(provider_token::Column::Provider.eq(provider))
            .one(&*self.db)
            .await?)
    }
}
