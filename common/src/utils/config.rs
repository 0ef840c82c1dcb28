use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

/// How a batch of document uploads reacts to an individual failure.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Every file settles on its own; one failure never affects its siblings.
    #[default]
    Independent,
    /// The first failure aborts the submit. Uploads still in flight are abandoned
    /// and keep their `pending` status.
    AllOrNothing,
}

/// Whether a section's subtype selector is cleared after each add action.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtypeSelection {
    #[default]
    ResetAfterAdd,
    Persist,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_surrealdb_address")]
    pub surrealdb_address: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_username: String,
    #[serde(default = "default_surrealdb_credential")]
    pub surrealdb_password: String,
    #[serde(default = "default_surrealdb_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surrealdb_database")]
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_upload_max_file_bytes")]
    pub upload_max_file_bytes: usize,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
    #[serde(default = "default_true")]
    pub upload_filter_unsupported: bool,
    #[serde(default)]
    pub batch_policy: BatchPolicy,
    #[serde(default)]
    pub subtype_selection: SubtypeSelection,
    #[serde(default = "default_intake_min_age")]
    pub intake_min_age: u8,
    #[serde(default = "default_attachment_max_bytes")]
    pub attachment_max_bytes: usize,
    #[serde(default)]
    pub triage_prompt_path: Option<String>,
    #[serde(default)]
    pub triage_prompt_version: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
}

/// Per-file ceiling shared by document uploads and chat attachments (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_surrealdb_address() -> String {
    "mem://".to_string()
}

fn default_surrealdb_credential() -> String {
    "root".to_string()
}

fn default_surrealdb_namespace() -> String {
    "intake".to_string()
}

fn default_surrealdb_database() -> String {
    "intake".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

const fn default_http_port() -> u16 {
    3000
}

const fn default_upload_max_file_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

// Room for a full form with several maximum-size documents.
const fn default_upload_max_body_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES * 8
}

const fn default_true() -> bool {
    true
}

const fn default_intake_min_age() -> u8 {
    1
}

const fn default_attachment_max_bytes() -> usize {
    DEFAULT_MAX_FILE_BYTES
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_chat_temperature() -> f32 {
    0.7
}

const fn default_chat_max_tokens() -> u32 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            surrealdb_address: default_surrealdb_address(),
            surrealdb_username: default_surrealdb_credential(),
            surrealdb_password: default_surrealdb_credential(),
            surrealdb_namespace: default_surrealdb_namespace(),
            surrealdb_database: default_surrealdb_database(),
            data_dir: default_data_dir(),
            http_port: default_http_port(),
            storage: default_storage_kind(),
            upload_max_file_bytes: default_upload_max_file_bytes(),
            upload_max_body_bytes: default_upload_max_body_bytes(),
            upload_filter_unsupported: true,
            batch_policy: BatchPolicy::default(),
            subtype_selection: SubtypeSelection::default(),
            intake_min_age: default_intake_min_age(),
            attachment_max_bytes: default_attachment_max_bytes(),
            triage_prompt_path: None,
            triage_prompt_version: None,
            chat_model: default_chat_model(),
            chat_temperature: default_chat_temperature(),
            chat_max_tokens: default_chat_max_tokens(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
