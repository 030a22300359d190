use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One registration per provider, shared across all users of the deployment.
        // All columns are strings/timestamps so the definition is backend-neutral.
        manager
            .create_table(
                Table::create()
                    .table(ClientRegistration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientRegistration::Provider)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClientRegistration::ClientId).string().not_null())
                    .col(
                        ColumnDef::new(ClientRegistration::ClientSecret)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClientRegistration::RedirectUri)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientRegistration::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ClientRegistration::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientRegistration::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClientRegistration {
    #[sea_orm(iden = "oauth_client_registrations")]
    Table,
    Provider,
    ClientId,
    ClientSecret,
    RedirectUri,
    CreatedAt,
    UpdatedAt,
}
