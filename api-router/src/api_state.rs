use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::config::AppConfig,
};
use intake_pipeline::IntakeController;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub storage: StorageManager,
    pub openai_client: Arc<Client<OpenAIConfig>>,
}

impl ApiState {
    pub async fn new(
        config: &AppConfig,
        storage: StorageManager,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let surreal_db_client = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );

        surreal_db_client.ensure_initialized().await?;

        Ok(Self::with_resources(
            surreal_db_client,
            config.clone(),
            storage,
            openai_client_for(config),
        ))
    }

    pub fn with_resources(
        db: Arc<SurrealDbClient>,
        config: AppConfig,
        storage: StorageManager,
        openai_client: Arc<Client<OpenAIConfig>>,
    ) -> Self {
        Self {
            db,
            config,
            storage,
            openai_client,
        }
    }

    /// Controller for one intake request. Each request gets its own so concurrent
    /// patients never see each other's in-flight guard.
    pub fn intake_controller(&self) -> IntakeController {
        IntakeController::new(
            Arc::new(self.storage.clone()),
            Arc::<SurrealDbClient>::clone(&self.db),
            &self.config,
        )
    }
}

pub fn openai_client_for(config: &AppConfig) -> Arc<Client<OpenAIConfig>> {
    Arc::new(Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ))
}
