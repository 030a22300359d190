use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db_backend = manager.get_database_backend();

        if db_backend == sea_orm::DatabaseBackend::Sqlite {
            manager
                .create_table(
                    Table::create()
                        .table(ProviderToken::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProviderToken::Id)
                                .text()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProviderToken::UserId).text().not_null())
                        .col(ColumnDef::new(ProviderToken::Provider).string().not_null())
                        .col(
                            ColumnDef::new(ProviderToken::AccessTokenCiphertext)
                                .blob()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::RefreshTokenCiphertext)
                                .blob()
                                .null(),
                        )
                        .col(ColumnDef::new(ProviderToken::ExpiresAt).timestamp().null())
                        .col(
                            ColumnDef::new(ProviderToken::CreatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::UpdatedAt)
                                .timestamp()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        } else {
            manager
                .create_table(
                    Table::create()
                        .table(ProviderToken::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProviderToken::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProviderToken::UserId).uuid().not_null())
                        .col(ColumnDef::new(ProviderToken::Provider).string().not_null())
                        .col(
                            ColumnDef::new(ProviderToken::AccessTokenCiphertext)
                                .binary()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::RefreshTokenCiphertext)
                                .binary()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::ExpiresAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(ProviderToken::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        // At most one token row per (user, provider); upserts rely on this index
        manager
            .create_index(
                Index::create()
                    .name("idx_provider_tokens_user_provider")
                    .table(ProviderToken::Table)
                    .col(ProviderToken::UserId)
                    .col(ProviderToken::Provider)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderToken::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProviderToken {
    #[sea_orm(iden = "provider_tokens")]
    Table,
    Id,
    UserId,
    Provider,
    AccessTokenCiphertext,
    RefreshTokenCiphertext,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
