use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db_backend = manager.get_database_backend();

        if db_backend == sea_orm::DatabaseBackend::Sqlite {
            // SQLite stores UUIDs as TEXT and has no timestamptz type
            manager
                .create_table(
                    Table::create()
                        .table(PendingAuthorization::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PendingAuthorization::Id)
                                .text()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PendingAuthorization::UserId).text().not_null())
                        .col(
                            ColumnDef::new(PendingAuthorization::Provider)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingAuthorization::State).string().not_null())
                        .col(
                            ColumnDef::new(PendingAuthorization::CodeVerifier)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::ReturnPath)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::ExpiresAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::CreatedAt)
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
                        .table(PendingAuthorization::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PendingAuthorization::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PendingAuthorization::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(PendingAuthorization::Provider)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PendingAuthorization::State).string().not_null())
                        .col(
                            ColumnDef::new(PendingAuthorization::CodeVerifier)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::ReturnPath)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PendingAuthorization::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        // States are globally unique lookup keys; one-shot consume depends on it
        manager
            .create_index(
                Index::create()
                    .name("idx_pending_authorizations_state")
                    .table(PendingAuthorization::Table)
                    .col(PendingAuthorization::State)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingAuthorization::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PendingAuthorization {
    #[sea_orm(iden = "pending_authorizations")]
    Table,
    Id,
    UserId,
    Provider,
    State,
    CodeVerifier,
    ReturnPath,
    ExpiresAt,
    CreatedAt,
}
