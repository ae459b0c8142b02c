//! Model configuration entity model
//!
//! Owned records binding a model provider to a secret API key. The key is
//! stored as AES-256-GCM ciphertext and never leaves the service in
//! plaintext.

use super::model_provider::Entity as ModelProvider;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Model configuration entity binding a provider to an encrypted API key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_model_configs")]
pub struct Model {
    /// Unique identifier for the configuration (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Referenced model provider
    pub model_provider_id: Uuid,

    /// Display name for the configuration
    pub name: String,

    /// Encrypted API key ciphertext
    pub api_key_ciphertext: Vec<u8>,

    /// Whether this is the owner's default configuration
    pub is_default: bool,

    /// Timestamp when the configuration was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the configuration was last updated
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
        belongs_to = "ModelProvider",
        from = "Column::ModelProviderId",
        to = "super::model_provider::Column::Id"
    )]
    ModelProvider,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<ModelProvider> for Entity {
    fn to() -> RelationDef {
        Relation::ModelProvider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
