//! OAuth state entity model
//!
//! Single-use rows binding an in-flight authorization flow to its state
//! token. `user_id` is set when the flow links an identity to a signed-in
//! user rather than performing a fresh sign-in.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// OAuth state entity for CSRF protection of authorization flows
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    /// Unique identifier for the state row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque state token echoed back by the provider
    pub state: String,

    /// Identity provider slug this flow targets
    pub provider_slug: String,

    /// Signed-in user when the flow links an additional identity
    pub user_id: Option<Uuid>,

    /// Post-callback redirect target (defaults to /dashboard)
    pub next: Option<String>,

    /// Expiration timestamp (15 minutes after creation)
    pub expires_at: DateTimeWithTimeZone,

    /// Timestamp when the state was created
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
