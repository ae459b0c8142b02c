//! Agent entity model
//!
//! This module contains the SeaORM entity model for the agents table, which
//! stores user-owned AI chat-persona profiles.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Agent entity representing an AI chat persona owned by a user
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "agents")]
pub struct Model {
    /// Unique identifier for the agent (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Whether the agent is visible to other users
    pub is_public: bool,

    /// Display name (required)
    pub name: String,

    /// Public URL of the stored avatar blob (optional)
    pub avatar_url: Option<String>,

    /// System prompt text (optional)
    pub system_prompt: Option<String>,

    /// Short biography text (optional)
    pub bio: Option<String>,

    /// Background lore text (optional)
    pub lore: Option<String>,

    /// Referenced model configuration; nulled when the config is deleted
    pub model_config_id: Option<Uuid>,

    /// Timestamp when the agent was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the agent was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::model_config::Entity",
        from = "Column::ModelConfigId",
        to = "super::model_config::Column::Id"
    )]
    ModelConfig,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::model_config::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModelConfig.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
