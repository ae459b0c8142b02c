//! Model provider seeding
//!
//! Populates the read-only model provider catalog. Existing rows are left
//! untouched so the seed is safe to run at every startup.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::model_provider;
use crate::repositories::ModelProviderRepository;

/// Seeds the model_providers table with the supported provider catalog
pub async fn seed_model_providers(db: &DatabaseConnection) -> Result<()> {
    let repo = ModelProviderRepository::new(Arc::new(db.clone()));

    let catalog = [
        ("openai", "OpenAI"),
        ("anthropic", "Anthropic"),
        ("google", "Google"),
        ("groq", "Groq"),
        ("mistral", "Mistral"),
        ("openrouter", "OpenRouter"),
    ];

    for (slug, name) in catalog {
        match repo.find_by_slug(slug).await? {
            Some(_) => {
                log::info!("Provider '{}' already exists, skipping", slug);
            }
            None => {
                log::info!("Creating model provider: {}", slug);

                let now = Utc::now();
                let provider = model_provider::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    slug: Set(slug.to_string()),
                    name: Set(name.to_string()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };

                repo.create(provider).await?;
            }
        }
    }

    log::info!("Model provider seeding completed");
    Ok(())
}
