//! Migration to create the user_model_configs table.
//!
//! Owned credential records binding a model provider to an API key. The key
//! is stored as AES-256-GCM ciphertext.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserModelConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserModelConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserModelConfigs::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserModelConfigs::ModelProviderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserModelConfigs::Name).text().not_null())
                    .col(
                        ColumnDef::new(UserModelConfigs::ApiKeyCiphertext)
                            .binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserModelConfigs::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserModelConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserModelConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_model_configs_owner_id")
                            .from(UserModelConfigs::Table, UserModelConfigs::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_model_configs_provider_id")
                            .from(UserModelConfigs::Table, UserModelConfigs::ModelProviderId)
                            .to(ModelProviders::Table, ModelProviders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_model_configs_owner_id")
                    .table(UserModelConfigs::Table)
                    .col(UserModelConfigs::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_user_model_configs_owner_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UserModelConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserModelConfigs {
    Table,
    Id,
    OwnerId,
    ModelProviderId,
    Name,
    ApiKeyCiphertext,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ModelProviders {
    Table,
    Id,
}
