use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            patient_document::sha256_hex,
            record_serde::deserialize_flexible_id,
            system_prompts::{DEFAULT_TRIAGE_PROMPT_VERSION, TRIAGE_SYSTEM_PROMPT},
        },
    },
    utils::config::AppConfig,
};

/// Prompt and upstream parameters used by the chat proxy. A single row keyed `current`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TriageSettings {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub prompt_version: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl TriageSettings {
    /// Settings derived from configuration, reading the prompt override file when one is set.
    ///
    /// A prompt file without an explicit version is versioned by its digest so that edits
    /// to the file trigger a re-seed.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let (system_prompt, derived_version) = match &config.triage_prompt_path {
            Some(path) => {
                let prompt = tokio::fs::read_to_string(path).await?;
                let digest = sha256_hex(prompt.as_bytes());
                let version = format!("file-{}", digest.get(..12).unwrap_or(&digest));
                (prompt, version)
            }
            None => (
                TRIAGE_SYSTEM_PROMPT.to_string(),
                DEFAULT_TRIAGE_PROMPT_VERSION.to_string(),
            ),
        };

        Ok(Self {
            id: "current".to_string(),
            prompt_version: config
                .triage_prompt_version
                .clone()
                .unwrap_or(derived_version),
            system_prompt,
            model: config.chat_model.clone(),
            temperature: config.chat_temperature,
            max_tokens: config.chat_max_tokens,
        })
    }

    /// Creates the row when missing and replaces it when the seed carries another version.
    pub async fn sync(db: &SurrealDbClient, seed: Self) -> Result<Self, AppError> {
        let existing: Option<Self> = db.select(("triage_settings", "current")).await?;

        match existing {
            None => {
                let created: Option<Self> = db
                    .create(("triage_settings", "current"))
                    .content(seed)
                    .await?;
                created.ok_or(AppError::Validation(
                    "Failed to initialize triage settings".into(),
                ))
            }
            Some(current) if current.prompt_version != seed.prompt_version => {
                info!(
                    from = %current.prompt_version,
                    to = %seed.prompt_version,
                    "Re-seeding triage prompt"
                );
                Self::update(db, seed).await
            }
            Some(current) => Ok(current),
        }
    }

    pub async fn get_current(db: &SurrealDbClient) -> Result<Self, AppError> {
        let settings: Option<Self> = db
            .client
            .query("SELECT * FROM type::thing('triage_settings', 'current')")
            .await?
            .take(0)?;

        settings.ok_or(AppError::NotFound("Triage settings not found".into()))
    }

    pub async fn update(db: &SurrealDbClient, changes: Self) -> Result<Self, AppError> {
        let updated: Option<Self> = db
            .client
            .query("UPDATE type::thing('triage_settings', 'current') MERGE $changes RETURN AFTER")
            .bind(("changes", changes))
            .await?
            .take(0)?;

        updated.ok_or(AppError::Validation(
            "Something went wrong updating the triage settings".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;

    async fn memory_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    #[tokio::test]
    async fn seeds_builtin_prompt_on_first_sync() {
        let db = memory_db().await;
        let seed = TriageSettings::from_config(&AppConfig::default())
            .await
            .expect("seed");

        let stored = TriageSettings::sync(&db, seed).await.expect("sync");

        assert_eq!(stored.prompt_version, DEFAULT_TRIAGE_PROMPT_VERSION);
        assert_eq!(stored.system_prompt, TRIAGE_SYSTEM_PROMPT);
        assert_eq!(stored.model, "gpt-4o-mini");
        assert_eq!(stored.max_tokens, 1000);

        let current = TriageSettings::get_current(&db).await.expect("current");
        assert_eq!(current, stored);
    }

    #[tokio::test]
    async fn keeps_stored_row_while_version_is_unchanged() {
        let db = memory_db().await;
        let seed = TriageSettings::from_config(&AppConfig::default())
            .await
            .expect("seed");
        TriageSettings::sync(&db, seed.clone()).await.expect("sync");

        let mut tweaked = TriageSettings::get_current(&db).await.expect("current");
        tweaked.model = "gpt-4o".to_string();
        TriageSettings::update(&db, tweaked).await.expect("update");

        let after = TriageSettings::sync(&db, seed).await.expect("resync");
        assert_eq!(after.model, "gpt-4o");
    }

    #[tokio::test]
    async fn reseeds_when_prompt_file_changes_version() {
        let db = memory_db().await;
        TriageSettings::sync(
            &db,
            TriageSettings::from_config(&AppConfig::default())
                .await
                .expect("seed"),
        )
        .await
        .expect("sync");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "You are a concise triage assistant.").expect("write prompt");
        let config = AppConfig {
            triage_prompt_path: Some(file.path().to_string_lossy().into_owned()),
            ..Default::default()
        };
        let seed = TriageSettings::from_config(&config).await.expect("seed");
        assert!(seed.prompt_version.starts_with("file-"));

        let stored = TriageSettings::sync(&db, seed).await.expect("resync");
        assert_eq!(stored.system_prompt, "You are a concise triage assistant.");
    }
}
