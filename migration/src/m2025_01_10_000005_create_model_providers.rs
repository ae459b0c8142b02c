//! Migration to create the model_providers table.
//!
//! Read-only catalog of upstream LLM vendors, populated by seeding.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModelProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModelProviders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModelProviders::Slug).text().not_null())
                    .col(ColumnDef::new(ModelProviders::Name).text().not_null())
                    .col(
                        ColumnDef::new(ModelProviders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ModelProviders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_model_providers_slug")
                    .table(ModelProviders::Table)
                    .col(ModelProviders::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_model_providers_slug").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ModelProviders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ModelProviders {
    Table,
    Id,
    Slug,
    Name,
    CreatedAt,
    UpdatedAt,
}
