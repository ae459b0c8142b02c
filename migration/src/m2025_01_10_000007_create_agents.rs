//! Migration to create the agents table.
//!
//! Agent profiles are owned rows; deleting the referenced model config nulls
//! the reference instead of cascading.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Agents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Agents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Agents::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Agents::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Agents::Name).text().not_null())
                    .col(ColumnDef::new(Agents::AvatarUrl).text().null())
                    .col(ColumnDef::new(Agents::SystemPrompt).text().null())
                    .col(ColumnDef::new(Agents::Bio).text().null())
                    .col(ColumnDef::new(Agents::Lore).text().null())
                    .col(ColumnDef::new(Agents::ModelConfigId).uuid().null())
                    .col(
                        ColumnDef::new(Agents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Agents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agents_owner_id")
                            .from(Agents::Table, Agents::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agents_model_config_id")
                            .from(Agents::Table, Agents::ModelConfigId)
                            .to(UserModelConfigs::Table, UserModelConfigs::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_agents_owner_id")
                    .table(Agents::Table)
                    .col(Agents::OwnerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_agents_owner_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Agents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Agents {
    Table,
    Id,
    OwnerId,
    IsPublic,
    Name,
    AvatarUrl,
    SystemPrompt,
    Bio,
    Lore,
    ModelConfigId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum UserModelConfigs {
    Table,
    Id,
}
