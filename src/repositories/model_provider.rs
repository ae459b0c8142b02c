//! Model provider repository
//!
//! Read-mostly catalog of supported model providers. Rows are created by
//! seeding at startup and never mutated through the API.

use anyhow::{Result, anyhow};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::model_provider::{self, Entity as ModelProvider};

/// Repository for model provider database operations
#[derive(Debug, Clone)]
pub struct ModelProviderRepository {
    db: Arc<DatabaseConnection>,
}

impl ModelProviderRepository {
    /// Creates a new ModelProviderRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a provider row
    pub async fn create(&self, provider: model_provider::ActiveModel) -> Result<model_provider::Model> {
        let id = provider
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("provider id must be set"))?;

        provider.insert(&*self.db).await?;

        let fetched = ModelProvider::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("provider not persisted"))
    }

    /// Finds a provider by its ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<model_provider::Model>> {
        Ok(ModelProvider::find_by_id(id).one(&*self.db).await?)
    }

    /// Finds a provider by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<model_provider::Model>> {
        Ok(ModelProvider::find()
            .filter(model_provider::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    /// Lists all providers ordered by name
    pub async fn list(&self) -> Result<Vec<model_provider::Model>> {
        Ok(ModelProvider::find()
            .order_by_asc(model_provider::Column::Name)
            .all(&*self.db)
            .await?)
    }
}
