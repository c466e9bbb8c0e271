use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the flashcard collections are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Name of the collection inside `data_dir`
    pub collection: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Languages used in the extraction and generation prompts
    pub languages: LanguageConfig,
    /// Maximum accepted upload size in MB
    pub max_image_mb: u64,
    /// Maximum number of live study sessions kept in memory
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Vision-capable model used for extraction and generation
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

/// The language being studied and the language translations are written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub source: String,
    pub target: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            collection: "flashcards".to_string(),
            llm: LlmConfig::default(),
            languages: LanguageConfig::default(),
            max_image_mb: 10,
            max_sessions: 256,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "French".to_string(),
            target: "Spanish".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("FLASHCARDS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("FLASHCARDS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(name) = std::env::var("FLASHCARDS_COLLECTION") {
            if !name.trim().is_empty() {
                config.collection = name.trim().to_string();
            }
        }
        if let Ok(lang) = std::env::var("FLASHCARDS_SOURCE_LANG") {
            config.languages.source = lang;
        }
        if let Ok(lang) = std::env::var("FLASHCARDS_TARGET_LANG") {
            config.languages.target = lang;
        }
        if let Ok(val) = std::env::var("FLASHCARDS_MAX_IMAGE_MB") {
            if let Ok(v) = val.parse() {
                config.max_image_mb = v;
            }
        }
        if let Ok(val) = std::env::var("FLASHCARDS_MAX_SESSIONS") {
            if let Ok(v) = val.parse() {
                config.max_sessions = v;
            }
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        let api_key = std::env::var("LLM_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"));
        if let Ok(key) = api_key {
            config.llm.api_key = Some(key);
        }

        config
    }

    /// Directory holding the configured collection.
    pub fn collection_dir(&self) -> PathBuf {
        self.data_dir.join(&self.collection)
    }

    pub fn max_image_bytes(&self) -> usize {
        (self.max_image_mb as usize).saturating_mul(1024 * 1024)
    }
}
