//! Migration to create the oauth_states table.
//!
//! Rows are single-use and expire 15 minutes after creation. `user_id` is
//! set when the flow links an additional identity to a signed-in user.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuthStates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthStates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthStates::State).text().not_null())
                    .col(ColumnDef::new(OAuthStates::ProviderSlug).text().not_null())
                    .col(ColumnDef::new(OAuthStates::UserId).uuid().null())
                    .col(ColumnDef::new(OAuthStates::Next).text().null())
                    .col(
                        ColumnDef::new(OAuthStates::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthStates::CreatedAt)
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
                    .name("idx_oauth_states_state")
                    .table(OAuthStates::Table)
                    .col(OAuthStates::State)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_oauth_states_state").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(OAuthStates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OAuthStates {
    // DeriveIden would snake-case this to `o_auth_states`; the entity maps
    // `oauth_states`.
    #[sea_orm(iden = "oauth_states")]
    Table,
    Id,
    State,
    ProviderSlug,
    UserId,
    Next,
    ExpiresAt,
    CreatedAt,
}
