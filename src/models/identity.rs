//! Identity entity model
//!
//! Links a user to one external identity-provider account. A user keeps at
//! least one identity; the handlers refuse to unlink the last.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Identity entity representing a linked identity-provider account
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    /// Unique identifier for the identity (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Identity provider slug (e.g., "github")
    pub provider_slug: String,

    /// Account identifier at the provider (unique per provider)
    pub external_id: String,

    /// Timestamp when the identity was linked
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the identity was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
